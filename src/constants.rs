//! # Pipeline Constants
//!
//! Keys, sentinels and timing defaults shared by the input gate, the session
//! manager and the control surface. Every component that writes or reads the
//! durable store must agree on these values.

use std::time::Duration;

/// Prefix of the durable-store key holding the response for one task
pub const USER_INPUT_KEY_PREFIX: &str = "user_input:";

/// Value written by the session manager when the client owning a task disconnects
pub const CANCELLED_SENTINEL: &str = "CANCELLED";

/// Interval between two reads of the durable store while a step awaits input
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Expiry applied to a value submitted through the control surface
pub const SUBMITTED_INPUT_TTL_SECONDS: u64 = 300;

/// Expiry applied to the cancellation sentinel
pub const CANCELLATION_TTL_SECONDS: u64 = 10;

/// Wait budget used when a step does not pass its own timeout
pub const DEFAULT_INPUT_TIMEOUT_SECONDS: u64 = 300;

/// Substituted for a missing `text` response
pub const DEFAULT_TEXT_VALUE: &str = "Значение по умолчанию";

/// Substituted for a missing or malformed `number` response
pub const DEFAULT_NUMBER_VALUE: f64 = 1.0;

/// Task name used for run-level notifications
pub const PIPELINE_TASK_NAME: &str = "Пайплайн данных";

/// Largest accepted multiplier for placeholder delays
pub const MAX_STEP_DELAY_SCALE: f64 = 100.0;

/// Capacity of the notification broadcast channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Build the durable-store key for a task's input
///
/// This key also carries the cancellation sentinel for every prompt of the task.
pub fn user_input_key(task_id: &str) -> String {
    format!("{USER_INPUT_KEY_PREFIX}{task_id}")
}

/// Key answering prompt number `sequence` of a task
///
/// The first prompt uses the plain task key; later prompts append their number.
pub fn input_response_key(task_id: &str, sequence: u32) -> String {
    match sequence {
        0 => user_input_key(task_id),
        n => format!("{USER_INPUT_KEY_PREFIX}{task_id}:{n}"),
    }
}
