//! Prompt template resolution.
//!
//! Maps a declared prompt-template reference to file content. Templates are
//! static text files under the `.arclient` directory; no interpolation is
//! performed. When the file cannot be read the resolver substitutes a
//! built-in default selected by the agent's type tag, and records that it
//! did so via [`PromptSource`], so the orchestrator can report the
//! substitution (validation already emitted a warning for the missing file).

use crate::config::AgentSpec;
use crate::discovery::ProjectRoot;
use std::path::{Path, PathBuf};
use tracing::debug;

/// How a prompt was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource {
    /// Read from the declared template file.
    Template,
    /// Substituted from the built-in defaults.
    BuiltinDefault,
}

/// A resolved prompt with its provenance.
#[derive(Debug, Clone)]
pub struct ResolvedPrompt {
    /// The prompt text handed to the agent.
    pub text: String,
    /// Where the text came from.
    pub source: PromptSource,
}

impl ResolvedPrompt {
    /// Whether the built-in default was substituted.
    pub fn used_default(&self) -> bool {
        self.source == PromptSource::BuiltinDefault
    }
}

/// Resolve an agent's prompt.
///
/// Reads `project_root/.arclient/<prompt_template>` (or the template path as
/// an absolute path) and returns its content verbatim. On any read failure,
/// or when the file is empty, returns the built-in default for the agent's
/// type tag.
pub fn resolve(spec: &AgentSpec, root: &ProjectRoot) -> ResolvedPrompt {
    if let Some(template) = &spec.prompt_template {
        if let Some(path) = template_path(root, template) {
            match std::fs::read_to_string(&path) {
                Ok(text) if !text.is_empty() => {
                    return ResolvedPrompt {
                        text,
                        source: PromptSource::Template,
                    };
                }
                Ok(_) => {
                    debug!(
                        template = %path.display(),
                        "prompt template is empty, substituting default"
                    );
                }
                Err(e) => {
                    debug!(
                        template = %path.display(),
                        error = %e,
                        "prompt template unreadable, substituting default"
                    );
                }
            }
        } else {
            debug!(template = %template, "prompt template not found, substituting default");
        }
    }

    ResolvedPrompt {
        text: default_prompt(&spec.agent_type).to_string(),
        source: PromptSource::BuiltinDefault,
    }
}

/// Locate a declared template on disk.
///
/// Probes `.arclient/<template>` first, then the template as an absolute
/// path. Returns the existing path, or None.
pub(crate) fn template_path(root: &ProjectRoot, template: &str) -> Option<PathBuf> {
    let relative = root.arclient_dir().join(template);
    if relative.is_file() {
        return Some(relative);
    }

    let absolute = Path::new(template);
    if absolute.is_absolute() && absolute.is_file() {
        return Some(absolute.to_path_buf());
    }

    None
}

/// The built-in default prompt for a type tag.
///
/// Type tags dispatch through this lookup only; unrecognized tags get the
/// generic default. Each agent is looked up independently by its own tag.
pub fn default_prompt(type_tag: &str) -> &'static str {
    match type_tag {
        "akashic_coordinator" => COORDINATOR_DEFAULT,
        "akashic_base" => BASE_AGENT_DEFAULT,
        "meeting_minutes" => MEETING_AGENT_DEFAULT,
        _ => GENERIC_DEFAULT,
    }
}

/// Prompt for the minimal fallback agent built when assembly degrades.
pub const FALLBACK_PROMPT: &str = "You are a basic file management assistant. \
Help users organize and manage their files and documents.";

const COORDINATOR_DEFAULT: &str = r#"You are the coordinator agent for a file-based knowledge management project.

## Core Responsibilities
1. **File System Operations**: Navigate, query, create, modify, and organize files following directory structure rules
2. **Agent Coordination**: Delegate specialized tasks to appropriate sub-agents
3. **Knowledge Management**: Maintain consistency and integrity of the knowledge base
4. **Directory Rules**: Enforce rules defined in README.md and Rule.md files

## Operation Principles
1. Always understand directory structure and rules before operations
2. Parent directory rules apply unless overridden by local rules
3. Update README.md files after any structural changes
4. Ask for user confirmation before file write operations
5. Route specialized tasks to appropriate sub-agents

## Workflow
1. Analyze the request and identify the task type
2. Use filesystem tools to understand the current structure
3. Check relevant directory rules and permissions
4. Delegate to specialized agents if appropriate, or handle directly
5. Ensure all changes keep the knowledge base consistent
"#;

const BASE_AGENT_DEFAULT: &str = r#"You are a base agent specialized in file-based knowledge management.

## Core Capabilities
- **File System Operations**: Navigate, query, create, modify, and delete files
- **Directory Structure Management**: Maintain hierarchical organization following README.md/Rule.md
- **Consistency Maintenance**: Ensure all operations preserve knowledge base integrity
- **Cross-Reference Management**: Maintain associations between related documents

## Operation Principles
1. Respect directory-specific rules defined in README.md or Rule.md
2. Apply inheritance: parent directory rules apply unless overridden
3. Update relevant README.md files after any file operation
4. When rules conflict, follow the rule closest to the current directory
5. Ask for user confirmation before any file write operation
6. Operate only within authorized directories
"#;

const MEETING_AGENT_DEFAULT: &str = r#"You are a meeting minutes agent for a file-based knowledge management project.

## Core Responsibilities
1. Process meeting transcripts into structured meeting minutes
2. File minutes under the project's designated meeting directories
3. Name files consistently (date-prefixed, descriptive titles)
4. Update the directory README.md with each new record
5. Cross-reference decisions and action items with related documents

Operate only within your target directories and ask for confirmation before
writing files.
"#;

const GENERIC_DEFAULT: &str = r#"You are an AI assistant specialized for this project.

Use the available filesystem tools to answer questions about project files
and, where your permissions allow, to create and modify them. Follow the
directory rules recorded in README.md files and ask for confirmation before
writing.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{VALID_CONFIG, project_with_config, write_prompt};

    fn spec(agent_type: &str, template: Option<&str>) -> AgentSpec {
        let json = serde_json::json!({
            "type": agent_type,
            "prompt_template": template,
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_resolve_reads_template_verbatim() {
        let (_temp, root, _config) = project_with_config(VALID_CONFIG);
        write_prompt(&root, "prompts/coordinator.md", "Coordinate {not a var}.\n");

        let resolved = resolve(&spec("akashic_coordinator", Some("prompts/coordinator.md")), &root);

        assert_eq!(resolved.source, PromptSource::Template);
        assert_eq!(resolved.text, "Coordinate {not a var}.\n");
        assert!(!resolved.used_default());
    }

    #[test]
    fn test_resolve_missing_template_uses_type_default() {
        let (_temp, root, _config) = project_with_config(VALID_CONFIG);

        let resolved = resolve(&spec("meeting_minutes", Some("prompts/absent.md")), &root);

        assert!(resolved.used_default());
        assert!(!resolved.text.is_empty());
        assert!(resolved.text.contains("meeting"));
    }

    #[test]
    fn test_resolve_empty_template_uses_default() {
        let (_temp, root, _config) = project_with_config(VALID_CONFIG);
        write_prompt(&root, "prompts/coordinator.md", "");

        let resolved = resolve(&spec("akashic_coordinator", Some("prompts/coordinator.md")), &root);

        assert!(resolved.used_default());
        assert_eq!(resolved.text, COORDINATOR_DEFAULT);
    }

    #[test]
    fn test_resolve_no_template_declared_uses_default() {
        let (_temp, root, _config) = project_with_config(VALID_CONFIG);

        let resolved = resolve(&spec("akashic_base", None), &root);

        assert!(resolved.used_default());
        assert_eq!(resolved.text, BASE_AGENT_DEFAULT);
    }

    #[test]
    fn test_unrecognized_type_gets_generic_default() {
        let (_temp, root, _config) = project_with_config(VALID_CONFIG);

        let resolved = resolve(&spec("custom_reviewer", None), &root);

        assert!(resolved.used_default());
        assert_eq!(resolved.text, GENERIC_DEFAULT);
    }

    #[test]
    fn test_default_prompts_are_distinct_and_non_empty() {
        let tags = ["akashic_coordinator", "akashic_base", "meeting_minutes", "other"];
        for tag in tags {
            assert!(!default_prompt(tag).is_empty(), "empty default for {}", tag);
        }
        assert_ne!(
            default_prompt("akashic_coordinator"),
            default_prompt("akashic_base")
        );
    }

    #[test]
    fn test_template_path_prefers_arclient_relative() {
        let (_temp, root, _config) = project_with_config(VALID_CONFIG);
        write_prompt(&root, "prompts/a.md", "relative");

        let found = template_path(&root, "prompts/a.md").unwrap();
        assert!(found.starts_with(root.arclient_dir()));
    }

    #[test]
    fn test_template_path_accepts_absolute() {
        let (_temp, root, _config) = project_with_config(VALID_CONFIG);
        let outside = root.path().join("external.md");
        std::fs::write(&outside, "outside").unwrap();

        let template = outside.to_string_lossy().to_string();
        assert_eq!(template_path(&root, &template), Some(outside));
    }
}
