//! Notification model shared by every component that reports status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::gate::InputRequest;
use crate::progress::ProgressSnapshot;

/// Status carried by a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Milestone reached inside a running step
    Progress,
    /// Step finished and produced its result
    Success,
    /// Step failed; the chain stops
    Error,
    /// Pipeline run launched
    Start,
    /// Step is waiting for a human decision
    InputRequired,
    /// Client disconnected while a step waited; default substituted
    Warning,
    /// Input wait expired; default substituted
    Timeout,
    /// Final step finished; the run is over
    Completed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Success => "success",
            Self::Error => "error",
            Self::Start => "start",
            Self::InputRequired => "input_required",
            Self::Warning => "warning",
            Self::Timeout => "timeout",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status event sent to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub task_name: String,
    pub result: Value,
    pub status: NotificationStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_input: Option<InputRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_info: Option<ProgressSnapshot>,
}

impl Notification {
    pub fn new(
        task_name: impl Into<String>,
        result: impl Into<Value>,
        status: NotificationStatus,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            result: result.into(),
            status,
            timestamp: Utc::now(),
            error: None,
            request_input: None,
            progress_info: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_request_input(mut self, request: InputRequest) -> Self {
        self.request_input = Some(request);
        self
    }

    pub fn with_progress(mut self, snapshot: ProgressSnapshot) -> Self {
        self.progress_info = Some(snapshot);
        self
    }
}
