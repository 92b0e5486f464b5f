//! Tool capability binding.
//!
//! The concrete filesystem tools live outside this crate: a [`ToolHost`]
//! collaborator supplies, per tool id, the operations it actually exposes at
//! a given root path. This module binds those capabilities to agents by
//! intersecting declared operations, host-exposed operations, and the
//! agent's permissions, and enforces the sandboxing boundary on every call
//! through [`BoundTool::permits`], not just at construction.

use crate::config::{Permission, ToolSpec};
use crate::error::{AracError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Operations the standard filesystem tool server exposes.
pub const STANDARD_FILESYSTEM_OPERATIONS: &[&str] = &[
    "read_file",
    "write_file",
    "list_directory",
    "create_directory",
    "search_files",
    "get_file_info",
    "move_file",
];

/// The permission an operation requires to enter an agent's bound set.
///
/// Read-class operations are enumerated; `write_file`/`edit_file` need
/// `write`, `create_directory` needs `create`, and `move_file`/`delete_file`
/// need `delete`. Operation names outside the known set conservatively
/// require `write`.
pub fn required_permission(operation: &str) -> Permission {
    match operation {
        "read_file" | "list_directory" | "search_files" | "get_file_info" => Permission::Read,
        "write_file" | "edit_file" => Permission::Write,
        "create_directory" => Permission::Create,
        "move_file" | "delete_file" => Permission::Delete,
        _ => Permission::Write,
    }
}

/// The operations a host exposes for one tool at one root.
#[derive(Debug, Clone)]
pub struct ToolCapability {
    /// Tool id this capability answers for.
    pub tool_id: String,
    /// Sandboxing root every operation is confined under.
    pub root: PathBuf,
    /// Operation names the host can actually perform.
    pub operations: Vec<String>,
}

/// External collaborator that materializes tool capabilities.
///
/// The factory only binds references; it never implements filesystem access.
/// Returning `None` for a declared, enabled, referenced tool is a factory
/// error at construction time.
pub trait ToolHost {
    /// The capability for `tool_id` scoped to `root`, if this host can
    /// supply one.
    fn capability(&self, tool_id: &str, root: &Path) -> Option<ToolCapability>;
}

/// In-memory [`ToolHost`] with a fixed operation table per tool id.
///
/// Used by tests and as the permissive supplier for fallback assembly.
#[derive(Debug, Clone, Default)]
pub struct StaticToolHost {
    tools: BTreeMap<String, Vec<String>>,
}

impl StaticToolHost {
    /// An empty host that answers for no tools.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool id with the operations it exposes.
    pub fn with_tool<I, S>(mut self, tool_id: &str, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.insert(
            tool_id.to_string(),
            operations.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// A host exposing the standard filesystem operations as `mcp_filesystem`.
    pub fn filesystem() -> Self {
        Self::new().with_tool("mcp_filesystem", STANDARD_FILESYSTEM_OPERATIONS.iter().copied())
    }
}

impl ToolHost for StaticToolHost {
    fn capability(&self, tool_id: &str, root: &Path) -> Option<ToolCapability> {
        self.tools.get(tool_id).map(|ops| ToolCapability {
            tool_id: tool_id.to_string(),
            root: root.to_path_buf(),
            operations: ops.clone(),
        })
    }
}

/// A tool bound to one agent: the surviving operation set, the sandboxing
/// root, and the agent's target-directory scope.
#[derive(Debug, Clone)]
pub struct BoundTool {
    tool_id: String,
    root: PathBuf,
    operations: Vec<String>,
    scope_patterns: Vec<String>,
    scope: Option<GlobSet>,
}

impl BoundTool {
    /// Bind an operation set under a root, optionally scoped to target
    /// directories.
    ///
    /// # Errors
    ///
    /// `AracError::Factory` when a target-directory pattern is not a valid
    /// glob.
    pub fn new(
        tool_id: &str,
        root: &Path,
        operations: Vec<String>,
        target_directories: &[String],
    ) -> Result<Self> {
        let scope = if target_directories.is_empty() {
            None
        } else {
            Some(build_scope(tool_id, target_directories)?)
        };

        Ok(Self {
            tool_id: tool_id.to_string(),
            root: root.to_path_buf(),
            operations,
            scope_patterns: target_directories.to_vec(),
            scope,
        })
    }

    /// The bound tool id.
    pub fn tool_id(&self) -> &str {
        &self.tool_id
    }

    /// The sandboxing root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Operations in the bound set, in declaration order.
    pub fn operations(&self) -> &[String] {
        &self.operations
    }

    /// The declared target-directory patterns, empty when unrestricted.
    pub fn scope_patterns(&self) -> &[String] {
        &self.scope_patterns
    }

    /// Whether invocations are restricted to target directories.
    pub fn is_scoped(&self) -> bool {
        self.scope.is_some()
    }

    /// Whether one invocation is allowed: the operation is in the bound set,
    /// the path stays confined under the root, and the path falls inside the
    /// target-directory scope when one exists. Checked per call.
    pub fn permits(&self, operation: &str, path: &Path) -> bool {
        if !self.operations.iter().any(|op| op == operation) {
            return false;
        }

        let Some(relative) = confine(&self.root, path) else {
            return false;
        };

        match &self.scope {
            None => true,
            Some(scope) => scope.is_match(&relative),
        }
    }
}

/// Resolve a path against a sandboxing root, rejecting escapes.
///
/// Returns the root-relative path when the input is confined: relative paths
/// must not traverse upward, absolute paths must sit under the root.
fn confine(root: &Path, path: &Path) -> Option<PathBuf> {
    let relative = if path.is_absolute() {
        path.strip_prefix(root).ok()?.to_path_buf()
    } else {
        path.to_path_buf()
    };

    let mut depth: i32 = 0;
    for component in relative.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(relative)
}

/// Compile target-directory patterns into a scope matcher.
///
/// Each pattern matches itself and everything beneath it, so a plain
/// directory name like `Meetings` scopes the whole subtree.
fn build_scope(tool_id: &str, patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let normalized = pattern.trim().trim_end_matches('/').replace('\\', "/");
        if normalized.is_empty() {
            continue;
        }
        for glob in [normalized.clone(), format!("{}/**", normalized)] {
            builder.add(Glob::new(&glob).map_err(|e| {
                AracError::Factory(format!(
                    "tool '{}' has invalid target directory pattern '{}': {}",
                    tool_id, pattern, e
                ))
            })?);
        }
    }

    builder.build().map_err(|e| {
        AracError::Factory(format!(
            "tool '{}' target directory scope failed to compile: {}",
            tool_id, e
        ))
    })
}

/// Build the argv for a tool's external server process, if it declares one.
///
/// The command line is split with shell quoting rules and the declared extra
/// arguments are appended.
pub fn launch_argv(tool_id: &str, spec: &ToolSpec) -> Result<Option<Vec<String>>> {
    let Some(command) = spec.command.as_deref() else {
        return Ok(None);
    };

    let command = command.trim();
    if command.is_empty() {
        return Err(AracError::Factory(format!(
            "tool '{}' declares an empty launch command",
            tool_id
        )));
    }

    let mut argv = shell_words::split(command).map_err(|e| {
        AracError::Factory(format!(
            "tool '{}' launch command failed to parse: {}",
            tool_id, e
        ))
    })?;
    argv.extend(spec.args.iter().cloned());

    Ok(Some(argv))
}
