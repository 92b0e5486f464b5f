//! Assembly orchestration.
//!
//! Composes discovery, loading, validation, and construction into one
//! sequential pipeline:
//!
//! ```text
//! Start -> Locating -> Loading -> Validating -> Building -> Ready
//!             |           |           |             |
//!             +-----------+-----------+-------------+--> Fallback
//! ```
//!
//! Every failure path lands in the terminal `Fallback` state, which still
//! produces a usable single-agent registry: the system degrades, it never
//! refuses to start. The pipeline is synchronous and shares nothing between
//! invocations; concurrent calls each build their own configuration and
//! registry.
//!
//! Degraded mode is observable: the [`Assembly`] records the stage reached,
//! the stage that failed, the ordered error and warning lists that led
//! there, and which agents received built-in prompts.

use crate::config::{DEFAULT_MODEL, Permission, ProjectConfig};
use crate::discovery::{self, ARAC_PROJECT_PATH_ENV, ProjectRoot};
use crate::error::AracError;
use crate::factory::{AgentFactory, AgentNode, AgentRegistry};
use crate::prompt::{FALLBACK_PROMPT, PromptSource, ResolvedPrompt};
use crate::tools::{BoundTool, ToolHost};
use crate::validate;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Agent id of the minimal fallback node.
pub const FALLBACK_AGENT_ID: &str = "akashic_fallback";

/// Tool id the fallback node requests from the host.
const FALLBACK_TOOL_ID: &str = "mcp_filesystem";

/// States of the assembly pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStage {
    Start,
    Locating,
    Loading,
    Validating,
    Building,
    /// Full registry assembled.
    Ready,
    /// Terminal degraded state; a minimal single-agent registry was produced.
    Fallback,
}

impl AssemblyStage {
    /// Stable name for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            AssemblyStage::Start => "start",
            AssemblyStage::Locating => "locating",
            AssemblyStage::Loading => "loading",
            AssemblyStage::Validating => "validating",
            AssemblyStage::Building => "building",
            AssemblyStage::Ready => "ready",
            AssemblyStage::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for AssemblyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of one assembly pass.
///
/// Always carries a usable registry; check [`Assembly::is_degraded`] and the
/// error list to distinguish full assembly from fallback.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// The constructed agent registry (full or the single fallback node).
    pub registry: AgentRegistry,
    /// The state the pipeline reached: `Ready` or `Fallback`.
    pub stage: AssemblyStage,
    /// The stage that failed, when `stage` is `Fallback`.
    pub failed_at: Option<AssemblyStage>,
    /// Ordered errors that led to fallback (empty when ready).
    pub errors: Vec<String>,
    /// Ordered non-fatal findings from validation.
    pub warnings: Vec<String>,
    /// Ids of agents whose prompt fell back to a built-in default.
    pub default_prompt_agents: Vec<String>,
    /// The located project root, when discovery succeeded.
    pub project_root: Option<ProjectRoot>,
    /// When this assembly pass completed.
    pub assembled_at: DateTime<Utc>,
}

impl Assembly {
    /// Whether the pipeline degraded to the minimal fallback agent.
    pub fn is_degraded(&self) -> bool {
        self.stage == AssemblyStage::Fallback
    }

    /// The designated default/coordinator node.
    pub fn default_agent(&self) -> Option<&AgentNode> {
        self.registry.default_agent()
    }
}

/// Assemble the agent hierarchy starting from a directory.
///
/// Consults the `ARAC_PROJECT_PATH` environment variable before walking up
/// from `start_dir`. Never fails: any stage failure produces a fallback
/// assembly instead.
pub fn assemble(start_dir: &Path, host: &dyn ToolHost) -> Assembly {
    let override_path = std::env::var(ARAC_PROJECT_PATH_ENV).ok();
    assemble_with(start_dir, override_path.as_deref(), host)
}

/// Assemble with an explicit root override instead of reading the
/// environment.
pub fn assemble_with(
    start_dir: &Path,
    override_path: Option<&str>,
    host: &dyn ToolHost,
) -> Assembly {
    let pipeline = Pipeline {
        start_dir,
        host,
    };

    debug!(start_dir = %start_dir.display(), "assembly started");

    let root = match discovery::discover_from(start_dir, override_path) {
        Ok(root) => root,
        Err(e) => return pipeline.fallback(AssemblyStage::Locating, None, vec![e], Vec::new()),
    };
    info!(root = %root, "project root located");

    let config = match ProjectConfig::load(&root) {
        Ok(config) => config,
        Err(e) => {
            return pipeline.fallback(AssemblyStage::Loading, Some(root), vec![e], Vec::new());
        }
    };

    let report = validate::validate(&config, &root);
    for warning in &report.warnings {
        warn!(finding = %warning, "configuration warning");
    }
    if !report.is_valid() {
        let errors = report
            .errors
            .iter()
            .map(|e| AracError::Validation(e.clone()))
            .collect();
        return pipeline.fallback(AssemblyStage::Validating, Some(root), errors, report.warnings);
    }

    let registry = match AgentFactory::new(&config, &root, host).build() {
        Ok(registry) => registry,
        Err(e) => {
            return pipeline.fallback(AssemblyStage::Building, Some(root), vec![e], report.warnings);
        }
    };

    let default_prompt_agents: Vec<String> = registry
        .iter()
        .filter(|(_, node)| node.prompt.used_default())
        .map(|(id, _)| id.to_string())
        .collect();
    for id in &default_prompt_agents {
        info!(agent = %id, "agent uses built-in default prompt");
    }

    info!(
        agents = registry.len(),
        default_agent = registry.default_agent_id(),
        "assembly ready"
    );

    Assembly {
        registry,
        stage: AssemblyStage::Ready,
        failed_at: None,
        errors: Vec::new(),
        warnings: report.warnings,
        default_prompt_agents,
        project_root: Some(root),
        assembled_at: Utc::now(),
    }
}

struct Pipeline<'a> {
    start_dir: &'a Path,
    host: &'a dyn ToolHost,
}

impl Pipeline<'_> {
    /// Build the degraded single-agent assembly.
    ///
    /// The fallback node gets the generic built-in prompt, no sub-agents,
    /// and whatever filesystem capability the host can supply, bound with a
    /// permissive default scope (every exposed operation, no target
    /// restriction) rooted at the project root when one was located, else
    /// the start directory.
    fn fallback(
        &self,
        failed_at: AssemblyStage,
        project_root: Option<ProjectRoot>,
        errors: Vec<AracError>,
        warnings: Vec<String>,
    ) -> Assembly {
        let errors: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        warn!(
            failed_at = %failed_at,
            errors = errors.len(),
            "assembly degraded to fallback agent"
        );

        let fallback_root = project_root
            .as_ref()
            .map(|r| r.path().to_path_buf())
            .unwrap_or_else(|| self.start_dir.to_path_buf());

        let tools = self
            .host
            .capability(FALLBACK_TOOL_ID, &fallback_root)
            .and_then(|cap| BoundTool::new(FALLBACK_TOOL_ID, &cap.root, cap.operations, &[]).ok())
            .into_iter()
            .collect();

        let node = AgentNode {
            id: FALLBACK_AGENT_ID.to_string(),
            agent_type: "akashic_base".to_string(),
            description: "Basic file management agent (fallback mode)".to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: None,
            max_context_tokens: None,
            prompt: ResolvedPrompt {
                text: FALLBACK_PROMPT.to_string(),
                source: PromptSource::BuiltinDefault,
            },
            permissions: vec![
                Permission::Read,
                Permission::Write,
                Permission::Create,
                Permission::Delete,
            ],
            tools,
            sub_agents: Vec::new(),
            custom_config: BTreeMap::new(),
        };

        let mut nodes = BTreeMap::new();
        nodes.insert(node.id.clone(), node);

        Assembly {
            registry: AgentRegistry::new(nodes, FALLBACK_AGENT_ID.to_string()),
            stage: AssemblyStage::Fallback,
            failed_at: Some(failed_at),
            errors,
            warnings,
            default_prompt_agents: vec![FALLBACK_AGENT_ID.to_string()],
            project_root,
            assembled_at: Utc::now(),
        }
    }
}
