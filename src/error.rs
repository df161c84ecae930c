use thiserror::Error;

use crate::config::ConfigurationError;
use crate::orchestration::queue::EnqueueError;
use crate::state_machine::StepStateError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("State transition error: {0}")]
    StateTransition(#[from] StepStateError),

    #[error("Launch error: {0}")]
    Launch(#[from] EnqueueError),

    #[error("Step '{step_name}' failed: {message}")]
    StepExecution { step_name: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Build a step failure from any displayable cause
    pub fn step_failed(step_name: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::StepExecution {
            step_name: step_name.into(),
            message: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
