use serde::{Deserialize, Serialize};

/// Events that drive a step through its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StepEvent {
    /// Worker picked the step up
    Start,
    /// Step entered the input gate
    AwaitInput,
    /// Input gate returned a value
    InputResolved,
    /// Step returned its result
    Succeed,
    /// Step raised an error
    Fail(String),
}

impl StepEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::AwaitInput => "await_input",
            Self::InputResolved => "input_resolved",
            Self::Succeed => "succeed",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }
}
