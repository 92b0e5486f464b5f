//! Error types for agent assembly.
//!
//! One variant per pipeline stage, derived with thiserror. Messages are
//! written to be user-actionable.

use thiserror::Error;

/// Main error type for assembly operations.
///
/// Each variant corresponds to one stage of the assembly pipeline. Every stage
/// returns a result rather than panicking; the assembly orchestrator is the
/// only place that converts these into the fallback state.
#[derive(Error, Debug)]
pub enum AracError {
    /// No project root could be located.
    #[error("project root not found: {0}")]
    NotFound(String),

    /// The configuration document could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Load(String),

    /// The configuration model violates a structural or semantic constraint.
    #[error("configuration validation failed: {0}")]
    Validation(String),

    /// Agent construction failed (missing tool binding or unresolvable default agent).
    #[error("agent construction failed: {0}")]
    Factory(String),
}

impl AracError {
    /// Returns the stable category name for this error class.
    pub fn category(&self) -> &'static str {
        match self {
            AracError::NotFound(_) => "not-found",
            AracError::Load(_) => "load",
            AracError::Validation(_) => "validation",
            AracError::Factory(_) => "factory",
        }
    }
}

/// Result type alias for assembly operations.
pub type Result<T> = std::result::Result<T, AracError>;
