//! Error taxonomy for the agent pipeline.
//!
//! Tool-level failures are recoverable: the orchestrator narrates them
//! back to the model as observations and the turn continues. Upstream
//! failures (model endpoint down, loop exhausted) are fatal to the turn.

use thiserror::Error;

/// Message surfaced to the user when the agent loop cannot produce an answer.
pub const APOLOGY_MESSAGE: &str =
    "I'm sorry, I wasn't able to complete that request. Please try again in a moment.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("{0}")]
    PolicyViolation(String),

    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl AgentError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        AgentError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Recoverable errors become tool observations; the rest end the turn.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AgentError::Upstream(_))
    }
}
