//! Configuration validation.
//!
//! Validation runs after loading and before the factory. It never mutates the
//! configuration and has no side effects beyond existence probes for prompt
//! templates and target directories. Every finding carries a stable category prefix
//! (`missing-section:`, `unknown-permission:`, ...) so callers and tests can
//! match by category without depending on message wording.
//!
//! Errors make the configuration unusable and send the orchestrator to
//! fallback; warnings are advisory and assembly proceeds.

use crate::config::{ProjectConfig, RECOGNIZED_PERMISSIONS};
use crate::discovery::ProjectRoot;
use crate::prompt;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Agent ids are lowercase identifiers: letters, digits, underscores.
static AGENT_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]{0,63}$").expect("invalid agent id regex"));

/// Outcome of validating a [`ProjectConfig`].
///
/// Errors and warnings are ordered by check, then by agent/tool id (the
/// configuration maps are sorted), so repeated runs over the same document
/// produce identical reports.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Fatal findings; any entry makes the configuration invalid.
    pub errors: Vec<String>,
    /// Non-fatal findings; assembly proceeds with these recorded.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether the configuration may proceed to the factory.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, category: &str, message: String) {
        self.errors.push(format!("{}: {}", category, message));
    }

    fn warning(&mut self, category: &str, message: String) {
        self.warnings.push(format!("{}: {}", category, message));
    }
}

/// Validate a loaded configuration against the project root.
///
/// Checks, in order:
///
/// 1. Required top-level sections (`project`, `agents`) are present
/// 2. Per agent: id format, non-empty model (enabled only), model identifier
///    shape, prompt template existence and non-emptiness (both warnings; the
///    resolver substitutes a default), target directory existence (warning;
///    glob patterns are skipped), recognized permission tokens, and tool
///    references (unknown tool is an error regardless of enablement; a
///    disabled tool is a warning)
/// 3. At least one agent is enabled; a lone enabled default agent is a
///    warning (nothing to delegate to)
/// 4. `workflow.default_agent` names an enabled agent
/// 5. Per tool: no duplicate operation names
pub fn validate(config: &ProjectConfig, root: &ProjectRoot) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.project.is_none() {
        report.error(
            "missing-section",
            "required top-level section 'project' is absent".to_string(),
        );
    }
    if config.agents.is_empty() {
        report.error(
            "missing-section",
            "required top-level section 'agents' is absent or declares no agents".to_string(),
        );
    }

    for (id, agent) in &config.agents {
        if !AGENT_ID_REGEX.is_match(id) {
            report.error(
                "agent-id",
                format!(
                    "agent id '{}' is not a valid identifier (expected lowercase letters, digits, underscores)",
                    id
                ),
            );
        }

        if agent.enabled {
            if agent.model.trim().is_empty() {
                report.error(
                    "empty-model",
                    format!("agent '{}' has an empty model identifier", id),
                );
            } else if !is_plausible_model(&agent.model) {
                report.warning(
                    "model-format",
                    format!(
                        "agent '{}' has unusual model identifier '{}' (expected '<provider>/<model>')",
                        id, agent.model
                    ),
                );
            }

            if let Some(template) = &agent.prompt_template {
                match prompt::template_path(root, template) {
                    None => report.warning(
                        "prompt-template",
                        format!(
                            "agent '{}' template '{}' not found under '{}' (a built-in default will be used)",
                            id,
                            template,
                            root.arclient_dir().display()
                        ),
                    ),
                    Some(path) if is_empty_file(&path) => report.warning(
                        "prompt-template",
                        format!(
                            "agent '{}' template '{}' is empty (a built-in default will be used)",
                            id, template
                        ),
                    ),
                    Some(_) => {}
                }
            }

            for target in &agent.target_directories {
                // Glob patterns cannot be probed for existence.
                if target.contains(['*', '?', '[']) {
                    continue;
                }
                if !root.path().join(target).is_dir() {
                    report.warning(
                        "target-directory",
                        format!(
                            "agent '{}' target directory '{}' does not exist under the project root",
                            id, target
                        ),
                    );
                }
            }
        }

        for token in &agent.permissions {
            if !RECOGNIZED_PERMISSIONS.contains(&token.as_str()) {
                report.error(
                    "unknown-permission",
                    format!(
                        "agent '{}' declares unrecognized permission '{}' (recognized: {})",
                        id,
                        token,
                        RECOGNIZED_PERMISSIONS.join(", ")
                    ),
                );
            }
        }

        for tool_id in &agent.tools {
            match config.mcp_tools.get(tool_id) {
                None => report.error(
                    "unknown-tool",
                    format!(
                        "agent '{}' references tool '{}' which is not declared in mcp_tools",
                        id, tool_id
                    ),
                ),
                Some(tool) if !tool.enabled => report.warning(
                    "disabled-tool",
                    format!("agent '{}' references disabled tool '{}'", id, tool_id),
                ),
                Some(_) => {}
            }
        }
    }

    let enabled: Vec<&str> = config.enabled_agents().map(|(id, _)| id).collect();
    if !config.agents.is_empty() && enabled.is_empty() {
        report.error(
            "no-enabled-agents",
            "every declared agent is disabled".to_string(),
        );
    } else if enabled.len() == 1 && enabled[0] == config.workflow.default_agent {
        report.warning(
            "single-agent",
            format!(
                "only the default agent '{}' is enabled (no specialized agents to delegate to)",
                enabled[0]
            ),
        );
    }

    let default_agent = &config.workflow.default_agent;
    match config.agents.get(default_agent) {
        None => report.error(
            "default-agent",
            format!(
                "workflow.default_agent '{}' is not a declared agent",
                default_agent
            ),
        ),
        Some(agent) if !agent.enabled => report.error(
            "default-agent",
            format!("workflow.default_agent '{}' is disabled", default_agent),
        ),
        Some(_) => {}
    }

    for (tool_id, tool) in &config.mcp_tools {
        let mut seen = BTreeSet::new();
        for op in &tool.operations {
            if !seen.insert(op.as_str()) {
                report.error(
                    "duplicate-operation",
                    format!("tool '{}' declares operation '{}' more than once", tool_id, op),
                );
            }
        }
    }

    report
}

/// Model identifiers are either `<provider>/<model>` with both halves
/// non-empty, or a bare non-empty model name.
fn is_plausible_model(model: &str) -> bool {
    match model.split_once('/') {
        Some((provider, name)) => !provider.is_empty() && !name.is_empty(),
        None => !model.is_empty(),
    }
}

fn is_empty_file(path: &std::path::Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(false)
}
