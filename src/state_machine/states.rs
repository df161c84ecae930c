use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one step invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Created, not yet picked up
    #[default]
    Pending,
    /// Step body is executing
    Running,
    /// Blocked inside the input gate; never persisted
    AwaitingInput,
    /// Step returned its result
    Succeeded,
    /// Step raised an error; the chain stops
    Failed,
}

impl StepState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Check if the step body currently holds a worker
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::AwaitingInput)
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::AwaitingInput => write!(f, "awaiting_input"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for StepState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "awaiting_input" => Ok(Self::AwaitingInput),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid step state: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_and_active_checks() {
        assert!(StepState::Succeeded.is_terminal());
        assert!(StepState::Failed.is_terminal());
        assert!(!StepState::AwaitingInput.is_terminal());
        assert!(StepState::AwaitingInput.is_active());
        assert!(!StepState::Pending.is_active());
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(StepState::AwaitingInput.to_string(), "awaiting_input");
        assert_eq!("running".parse::<StepState>().unwrap(), StepState::Running);
        assert!("in_progress".parse::<StepState>().is_err());
    }
}
