//! Arac: configuration-driven agent assembly for AkashicRecords projects.
//!
//! This crate turns a per-project `.arclient/config.json` plus prompt
//! templates into a hierarchy of agent definitions (one coordinator plus N
//! specialized agents) ready to hand to an external agent-execution
//! runtime. The runtime, the concrete filesystem tools (reached through the
//! [`tools::ToolHost`] seam), and model-provider networking all live outside
//! this crate.
//!
//! # Pipeline
//!
//! ```text
//! discover (.arclient marker or ARAC_PROJECT_PATH)
//!   -> load config.json
//!   -> validate (errors + warnings, stable category prefixes)
//!   -> build AgentNode registry (prompts, permissions, tool bindings)
//! ```
//!
//! Any stage failure degrades to a minimal single-agent fallback instead of
//! refusing to start; see [`assembly::Assembly`] for how that outcome is
//! observed.
//!
//! # Example
//!
//! ```no_run
//! use arac::{StaticToolHost, assemble};
//!
//! let host = StaticToolHost::filesystem();
//! let assembly = assemble(std::path::Path::new("."), &host);
//!
//! println!("stage: {}", assembly.stage);
//! for (id, agent) in assembly.registry.iter() {
//!     println!("{} -> {}", id, agent.model);
//! }
//! ```

pub mod assembly;
pub mod config;
pub mod discovery;
pub mod error;
pub mod factory;
pub mod prompt;
pub mod tools;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;

pub use assembly::{Assembly, AssemblyStage, assemble, assemble_with};
pub use config::{
    AgentSpec, DelegationStrategy, Permission, ProjectConfig, ProjectMeta, ToolSpec,
    WorkflowPolicy,
};
pub use discovery::ProjectRoot;
pub use error::{AracError, Result};
pub use factory::{AgentFactory, AgentNode, AgentRegistry};
pub use prompt::{PromptSource, ResolvedPrompt};
pub use tools::{BoundTool, StaticToolHost, ToolCapability, ToolHost};
pub use validate::ValidationReport;
