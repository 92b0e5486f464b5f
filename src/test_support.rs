//! Shared helpers for unit tests: temp project scaffolding and environment
//! guards.

use crate::config::ProjectConfig;
use crate::discovery::{self, ProjectRoot};
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

/// A well-formed configuration used across tests: a fully privileged
/// coordinator and a meeting agent scoped to `Meetings/`.
pub(crate) const VALID_CONFIG: &str = r#"{
    "project": { "name": "demo", "type": "general" },
    "agents": {
        "coordinator": {
            "type": "akashic_coordinator",
            "model": "openai/gpt-4o",
            "permissions": ["read", "write", "create", "delete"]
        },
        "meeting_agent": {
            "type": "meeting_minutes",
            "model": "openai/gpt-4o-mini",
            "permissions": ["read", "write"],
            "target_directories": ["Meetings"]
        }
    },
    "mcp_tools": {
        "mcp_filesystem": {
            "enabled": true,
            "operations": ["read_file", "write_file"]
        }
    },
    "workflow": {
        "default_agent": "coordinator",
        "delegation_strategy": "llm_driven"
    }
}"#;

/// Scaffold a temp project with the given `config.json` content and return
/// the discovered root plus the parsed configuration.
pub(crate) fn project_with_config(json: &str) -> (TempDir, ProjectRoot, ProjectConfig) {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join(".arclient")).unwrap();
    std::fs::write(temp.path().join(".arclient").join("config.json"), json).unwrap();

    let root = discovery::discover_from(temp.path(), None).unwrap();
    let config = ProjectConfig::from_json(json).unwrap();
    (temp, root, config)
}

/// Write a prompt template under the project's `.arclient` directory.
pub(crate) fn write_prompt(root: &ProjectRoot, relative: &str, content: &str) {
    let path = root.arclient_dir().join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Sets an environment variable for the duration of a test and restores the
/// previous value on drop.
pub(crate) struct EnvGuard {
    key: &'static str,
    previous: Option<String>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    pub(crate) fn set(key: &'static str, value: &str) -> Self {
        // The process environment is global and not thread-safe. Hold a lock
        // so tests don't race even if a #[serial] annotation is missed.
        let lock = ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let previous = std::env::var(key).ok();
        unsafe { std::env::set_var(key, value) };
        Self {
            key,
            previous,
            _lock: lock,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match &self.previous {
            Some(value) => unsafe { std::env::set_var(self.key, value) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}
