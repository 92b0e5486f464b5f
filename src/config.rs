//! Configuration model for `.arclient/config.json`.
//!
//! This module defines the typed model for the per-project configuration
//! document. Parsing is forward compatible (unknown fields are ignored) and
//! optional fields carry sensible defaults, so a minimal document stays
//! valid.
//!
//! # File Format
//!
//! ```json
//! {
//!   "project": { "name": "knowledge-base", "type": "general" },
//!   "agents": {
//!     "coordinator": {
//!       "type": "akashic_coordinator",
//!       "model": "openai/gpt-4o",
//!       "prompt_template": "prompts/coordinator.md",
//!       "tools": ["mcp_filesystem"],
//!       "permissions": ["read", "write", "create", "delete"]
//!     },
//!     "meeting_agent": {
//!       "type": "meeting_minutes",
//!       "target_directories": ["Meetings"]
//!     }
//!   },
//!   "mcp_tools": {
//!     "mcp_filesystem": {
//!       "enabled": true,
//!       "operations": ["read_file", "write_file"]
//!     }
//!   },
//!   "workflow": {
//!     "default_agent": "coordinator",
//!     "delegation_strategy": "llm_driven"
//!   }
//! }
//! ```
//!
//! Structural and semantic constraints are checked separately by
//! [`crate::validate::validate`], which reports errors and warnings instead of
//! failing the parse. Loading only fails on unreadable or malformed JSON.

use crate::discovery::ProjectRoot;
use crate::error::{AracError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model identifier used when an agent does not declare one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

/// Agent id the workflow routes to when none is configured.
pub const DEFAULT_AGENT_ID: &str = "coordinator";

/// Permission tokens recognized in an agent's `permissions` list.
pub const RECOGNIZED_PERMISSIONS: &[&str] = &["read", "write", "create", "delete"];

/// A filesystem capability class an agent may hold.
///
/// Permissions gate which tool operations end up in an agent's bound set;
/// they are not scoped by target directories (only tool invocations are).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Create,
    Delete,
}

impl Permission {
    /// Parse a permission token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "create" => Some(Self::Create),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    /// The configuration token for this permission.
    pub fn as_token(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }
}

/// How the coordinator routes work to sub-agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DelegationStrategy {
    /// The coordinator model decides delegation at runtime and is handed
    /// references to every enabled sibling agent (default).
    #[default]
    LlmDriven,
    /// Routing is statically declared outside this subsystem; no sub-agent
    /// references are wired.
    Static,
}

/// Project metadata from the `project` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectMeta {
    /// Human-readable project name.
    #[serde(default)]
    pub name: String,

    /// Project kind tag (free-form, default "general").
    #[serde(rename = "type", default = "default_project_kind")]
    pub kind: String,

    /// Declared root path, if the document pins one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
}

fn default_project_kind() -> String {
    "general".to_string()
}

/// Declarative description of a single agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Type tag used for default-prompt selection and downstream
    /// `custom_config` interpretation. Never a class hierarchy.
    #[serde(rename = "type")]
    pub agent_type: String,

    /// Whether this agent participates in assembly.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Provider-qualified model identifier (e.g. `openai/gpt-4o`).
    #[serde(default = "default_model")]
    pub model: String,

    /// Prompt template path relative to the `.arclient` directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,

    /// Tool ids this agent binds, referencing entries in `mcp_tools`.
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,

    /// Permission tokens. Kept as strings so unrecognized tokens surface as
    /// validation errors rather than parse failures.
    #[serde(default = "default_permissions")]
    pub permissions: Vec<String>,

    /// Directory globs this agent's tool invocations are scoped to.
    /// Empty means unrestricted within the tool root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_directories: Vec<String>,

    /// Output token cap passed through to the model binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Context window cap passed through to the model binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_context_tokens: Option<u32>,

    /// Free-form configuration passed through verbatim to the constructed
    /// agent; opaque to the factory.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_config: BTreeMap<String, serde_json::Value>,
}

impl AgentSpec {
    /// Permissions parsed into the typed set, skipping tokens validation
    /// already flagged as unrecognized.
    pub fn parsed_permissions(&self) -> Vec<Permission> {
        let mut perms: Vec<Permission> = self
            .permissions
            .iter()
            .filter_map(|t| Permission::from_token(t))
            .collect();
        perms.sort();
        perms.dedup();
        perms
    }
}

/// Declarative description of one MCP tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSpec {
    /// Whether agents may bind this tool.
    pub enabled: bool,

    /// Operation names this tool exposes, in declaration order.
    /// Empty means every operation the host exposes.
    pub operations: Vec<String>,

    /// Sandboxing root override, relative to the project root.
    /// Absent means the project root itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,

    /// Launch command line for an external tool-server process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Extra arguments appended to the parsed launch command.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Default for ToolSpec {
    fn default() -> Self {
        Self {
            enabled: true,
            operations: Vec::new(),
            root_path: None,
            command: None,
            args: Vec::new(),
        }
    }
}

/// Workflow routing policy from the `workflow` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowPolicy {
    /// Agent id that receives work by default; also the coordinator node.
    pub default_agent: String,

    /// How the coordinator routes work to sub-agents.
    pub delegation_strategy: DelegationStrategy,

    /// Whether the runtime may run sub-agents in parallel (informational for
    /// this subsystem; passed through to the runtime).
    pub enable_parallel_execution: bool,

    /// Whether file-writing operations require user confirmation.
    pub require_confirmation: bool,
}

impl Default for WorkflowPolicy {
    fn default() -> Self {
        Self {
            default_agent: DEFAULT_AGENT_ID.to_string(),
            delegation_strategy: DelegationStrategy::default(),
            enable_parallel_execution: true,
            require_confirmation: true,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_tools() -> Vec<String> {
    vec!["mcp_filesystem".to_string()]
}
fn default_permissions() -> Vec<String> {
    vec!["read".to_string()]
}

/// The complete project configuration.
///
/// Loaded once per assembly pass and never mutated after validation.
/// `project` is optional and `agents` defaults to an empty map so that a
/// missing section is a reportable validation error, not a parse failure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project metadata section.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectMeta>,

    /// Agent specs keyed by agent id.
    pub agents: BTreeMap<String, AgentSpec>,

    /// Tool specs keyed by tool id.
    pub mcp_tools: BTreeMap<String, ToolSpec>,

    /// Workflow routing policy.
    pub workflow: WorkflowPolicy,
}

impl ProjectConfig {
    /// Load the configuration document from a project root.
    ///
    /// # Returns
    ///
    /// * `Ok(ProjectConfig)` - Parsed (not yet validated) configuration
    /// * `Err(AracError::Load)` - Unreadable file or malformed JSON
    pub fn load(root: &ProjectRoot) -> Result<Self> {
        let path = root.config_path();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            AracError::Load(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parse the configuration from a JSON string.
    ///
    /// Unknown fields are ignored for forward compatibility. Parse errors
    /// carry line and column context.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            AracError::Load(format!(
                "invalid JSON in {} at line {}, column {}: {}",
                crate::discovery::CONFIG_FILE,
                e.line(),
                e.column(),
                e
            ))
        })
    }

    /// Serialize the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AracError::Load(format!("failed to serialize configuration: {}", e)))
    }

    /// Write the configuration document under the project root, creating the
    /// `.arclient` directory if needed.
    pub fn save(&self, root: &ProjectRoot) -> Result<()> {
        let arclient = root.arclient_dir();
        std::fs::create_dir_all(&arclient).map_err(|e| {
            AracError::Load(format!(
                "failed to create '{}': {}",
                arclient.display(),
                e
            ))
        })?;

        let path = root.config_path();
        std::fs::write(&path, self.to_json()?).map_err(|e| {
            AracError::Load(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Build the default configuration for a freshly scaffolded project:
    /// a coordinator plus one base agent, both bound to the filesystem tool.
    pub fn default_for(project_name: &str) -> Self {
        let mut agents = BTreeMap::new();
        agents.insert(
            "coordinator".to_string(),
            AgentSpec {
                agent_type: "akashic_coordinator".to_string(),
                enabled: true,
                model: DEFAULT_MODEL.to_string(),
                prompt_template: Some("prompts/coordinator.md".to_string()),
                tools: default_tools(),
                permissions: vec![
                    "read".to_string(),
                    "write".to_string(),
                    "create".to_string(),
                ],
                target_directories: Vec::new(),
                max_output_tokens: None,
                max_context_tokens: None,
                custom_config: BTreeMap::new(),
            },
        );
        agents.insert(
            "base_agent".to_string(),
            AgentSpec {
                agent_type: "akashic_base".to_string(),
                enabled: true,
                model: DEFAULT_MODEL.to_string(),
                prompt_template: Some("prompts/base_agent.md".to_string()),
                tools: default_tools(),
                permissions: vec![
                    "read".to_string(),
                    "write".to_string(),
                    "create".to_string(),
                ],
                target_directories: Vec::new(),
                max_output_tokens: None,
                max_context_tokens: None,
                custom_config: BTreeMap::new(),
            },
        );

        let mut mcp_tools = BTreeMap::new();
        mcp_tools.insert("mcp_filesystem".to_string(), ToolSpec::default());

        Self {
            project: Some(ProjectMeta {
                name: project_name.to_string(),
                kind: default_project_kind(),
                root_path: None,
            }),
            agents,
            mcp_tools,
            workflow: WorkflowPolicy::default(),
        }
    }

    /// The model of the designated default agent, or the global default when
    /// that agent is absent.
    pub fn default_model(&self) -> &str {
        self.agents
            .get(&self.workflow.default_agent)
            .map(|a| a.model.as_str())
            .unwrap_or(DEFAULT_MODEL)
    }

    /// Iterate over enabled agents only.
    pub fn enabled_agents(&self) -> impl Iterator<Item = (&str, &AgentSpec)> {
        self.agents
            .iter()
            .filter(|(_, a)| a.enabled)
            .map(|(id, a)| (id.as_str(), a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_json() {
        let config = ProjectConfig::from_json("{}").unwrap();

        assert!(config.project.is_none());
        assert!(config.agents.is_empty());
        assert!(config.mcp_tools.is_empty());
        assert_eq!(config.workflow.default_agent, "coordinator");
        assert_eq!(
            config.workflow.delegation_strategy,
            DelegationStrategy::LlmDriven
        );
        assert!(config.workflow.enable_parallel_execution);
        assert!(config.workflow.require_confirmation);
    }

    #[test]
    fn test_parse_agent_defaults() {
        let json = r#"{
            "project": { "name": "demo" },
            "agents": {
                "coordinator": { "type": "akashic_coordinator" }
            }
        }"#;
        let config = ProjectConfig::from_json(json).unwrap();

        let agent = config.agents.get("coordinator").unwrap();
        assert!(agent.enabled);
        assert_eq!(agent.model, DEFAULT_MODEL);
        assert_eq!(agent.tools, vec!["mcp_filesystem"]);
        assert_eq!(agent.permissions, vec!["read"]);
        assert!(agent.target_directories.is_empty());
        assert!(agent.custom_config.is_empty());

        let meta = config.project.unwrap();
        assert_eq!(meta.name, "demo");
        assert_eq!(meta.kind, "general");
    }

    #[test]
    fn test_parse_full_document() {
        let json = r#"{
            "project": { "name": "kb", "type": "notes", "root_path": "/srv/kb" },
            "agents": {
                "coordinator": {
                    "type": "akashic_coordinator",
                    "model": "anthropic/claude-sonnet",
                    "prompt_template": "prompts/coordinator.md",
                    "permissions": ["read", "write", "create", "delete"]
                },
                "meeting_agent": {
                    "type": "meeting_minutes",
                    "enabled": false,
                    "target_directories": ["Meetings"],
                    "custom_config": { "language": "en" }
                }
            },
            "mcp_tools": {
                "mcp_filesystem": {
                    "enabled": true,
                    "operations": ["read_file", "write_file"],
                    "command": "npx -y @modelcontextprotocol/server-filesystem",
                    "args": ["--verbose"]
                }
            },
            "workflow": {
                "default_agent": "coordinator",
                "delegation_strategy": "static",
                "enable_parallel_execution": false,
                "require_confirmation": false
            }
        }"#;
        let config = ProjectConfig::from_json(json).unwrap();

        assert_eq!(config.agents.len(), 2);
        let coordinator = config.agents.get("coordinator").unwrap();
        assert_eq!(coordinator.model, "anthropic/claude-sonnet");
        assert_eq!(
            coordinator.parsed_permissions(),
            vec![
                Permission::Read,
                Permission::Write,
                Permission::Create,
                Permission::Delete
            ]
        );

        let meeting = config.agents.get("meeting_agent").unwrap();
        assert!(!meeting.enabled);
        assert_eq!(meeting.target_directories, vec!["Meetings"]);
        assert_eq!(
            meeting.custom_config.get("language"),
            Some(&serde_json::json!("en"))
        );

        let fs_tool = config.mcp_tools.get("mcp_filesystem").unwrap();
        assert_eq!(fs_tool.operations, vec!["read_file", "write_file"]);
        assert_eq!(
            fs_tool.command.as_deref(),
            Some("npx -y @modelcontextprotocol/server-filesystem")
        );
        assert_eq!(fs_tool.args, vec!["--verbose"]);

        assert_eq!(
            config.workflow.delegation_strategy,
            DelegationStrategy::Static
        );
        assert!(!config.workflow.enable_parallel_execution);
    }

    #[test]
    fn test_parse_unknown_fields_ignored() {
        let json = r#"{
            "project": { "name": "demo" },
            "agents": {
                "coordinator": { "type": "akashic_coordinator", "future_field": 1 }
            },
            "future_section": { "nested": true }
        }"#;
        let config = ProjectConfig::from_json(json).unwrap();
        assert_eq!(config.agents.len(), 1);
    }

    #[test]
    fn test_malformed_json_reports_position() {
        let result = ProjectConfig::from_json("{ \"agents\": ");
        assert!(result.is_err());

        let err = result.unwrap_err();
        assert_eq!(err.category(), "load");
        assert!(err.to_string().contains("line"));
        assert!(err.to_string().contains("column"));
    }

    #[test]
    fn test_permission_tokens() {
        assert_eq!(Permission::from_token("read"), Some(Permission::Read));
        assert_eq!(Permission::from_token("delete"), Some(Permission::Delete));
        assert_eq!(Permission::from_token("execute"), None);
        assert_eq!(Permission::Write.as_token(), "write");
    }

    #[test]
    fn test_parsed_permissions_skips_unknown_and_dedups() {
        let json = r#"{
            "agents": {
                "a": { "type": "t", "permissions": ["read", "bogus", "read", "write"] }
            }
        }"#;
        let config = ProjectConfig::from_json(json).unwrap();
        let perms = config.agents.get("a").unwrap().parsed_permissions();
        assert_eq!(perms, vec![Permission::Read, Permission::Write]);
    }

    #[test]
    fn test_default_for_has_coordinator_and_base() {
        let config = ProjectConfig::default_for("demo");

        assert_eq!(config.project.as_ref().unwrap().name, "demo");
        assert!(config.agents.contains_key("coordinator"));
        assert!(config.agents.contains_key("base_agent"));
        assert!(config.mcp_tools.contains_key("mcp_filesystem"));
        assert_eq!(config.default_model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_default_model_prefers_default_agent() {
        let json = r#"{
            "agents": {
                "coordinator": { "type": "akashic_coordinator", "model": "openai/o3" }
            }
        }"#;
        let config = ProjectConfig::from_json(json).unwrap();
        assert_eq!(config.default_model(), "openai/o3");
    }

    #[test]
    fn test_enabled_agents_filters() {
        let json = r#"{
            "agents": {
                "on": { "type": "t" },
                "off": { "type": "t", "enabled": false }
            }
        }"#;
        let config = ProjectConfig::from_json(json).unwrap();
        let ids: Vec<&str> = config.enabled_agents().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["on"]);
    }

    #[test]
    fn test_json_round_trip() {
        let config = ProjectConfig::default_for("demo");
        let json = config.to_json().unwrap();
        let parsed = ProjectConfig::from_json(&json).unwrap();

        assert_eq!(parsed.agents.len(), config.agents.len());
        assert_eq!(parsed.workflow.default_agent, config.workflow.default_agent);
    }

    #[test]
    fn test_token_caps_default_to_none() {
        let json = r#"{
            "agents": {
                "capped": {
                    "type": "akashic_base",
                    "max_output_tokens": 4096,
                    "max_context_tokens": 128000
                },
                "uncapped": { "type": "akashic_base" }
            }
        }"#;
        let config = ProjectConfig::from_json(json).unwrap();

        let capped = config.agents.get("capped").unwrap();
        assert_eq!(capped.max_output_tokens, Some(4096));
        assert_eq!(capped.max_context_tokens, Some(128_000));

        let uncapped = config.agents.get("uncapped").unwrap();
        assert_eq!(uncapped.max_output_tokens, None);
        assert_eq!(uncapped.max_context_tokens, None);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (_temp, root, _config) = crate::test_support::project_with_config("{}");
        let config = ProjectConfig::default_for("demo");

        config.save(&root).unwrap();
        let loaded = ProjectConfig::load(&root).unwrap();

        assert_eq!(loaded.project.unwrap().name, "demo");
        assert_eq!(loaded.agents.len(), 2);
        assert!(loaded.mcp_tools.contains_key("mcp_filesystem"));
    }
}
