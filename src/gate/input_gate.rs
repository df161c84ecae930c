//! # Input Gate
//!
//! Blocking request/await bridge between a running step and a human decision.
//!
//! A request is announced with an `input_required` notification, then the
//! durable store is polled under the request's response key
//! (`user_input:{task_id}` for the first prompt of a task,
//! `user_input:{task_id}:{sequence}` for later ones). The first matching
//! rule resolves the wait:
//!
//! 1. a value is present: it is consumed atomically and interpreted;
//! 2. the cancellation sentinel is present under `user_input:{task_id}`: it
//!    is consumed, a `warning` is emitted and the default is returned;
//! 3. the deadline passed: any stale key is removed, a `timeout` is emitted
//!    and the default is returned.
//!
//! A later prompt discards whatever non-sentinel value it finds under the
//! task key; that value was meant for an earlier prompt that already resolved.
//!
//! Store faults while polling are logged and retried until the deadline.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use super::input::{default_value_with, InputRequest, InputValue};
use crate::config::InputConfig;
use crate::constants::{user_input_key, CANCELLED_SENTINEL};
use crate::error::Result;
use crate::events::{Notification, NotificationStatus, Notifier};
use crate::store::KeyValueStore;

/// How an input wait ended
#[derive(Debug, Clone, PartialEq)]
pub enum InputOutcome {
    /// A human answered (after lenient interpretation)
    Provided(InputValue),
    /// An answer arrived but did not fit the request; carries the default
    Rejected(InputValue),
    /// The owning client disconnected; carries the default
    Cancelled(InputValue),
    /// Nobody answered in time; carries the default
    TimedOut(InputValue),
}

impl InputOutcome {
    pub fn value(&self) -> &InputValue {
        match self {
            Self::Provided(v) | Self::Rejected(v) | Self::Cancelled(v) | Self::TimedOut(v) => v,
        }
    }

    pub fn into_value(self) -> InputValue {
        match self {
            Self::Provided(v) | Self::Rejected(v) | Self::Cancelled(v) | Self::TimedOut(v) => v,
        }
    }

    /// Whether the value is the default rather than a usable human answer
    pub fn is_default(&self) -> bool {
        !matches!(self, Self::Provided(_))
    }
}

#[derive(Debug, Clone)]
pub struct InputGate {
    store: Arc<dyn KeyValueStore>,
    notifier: Notifier,
    poll_interval: Duration,
    text_default: String,
}

impl InputGate {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: Notifier, config: &InputConfig) -> Self {
        Self {
            store,
            notifier,
            poll_interval: config.poll_interval(),
            text_default: config.text_default.clone(),
        }
    }

    /// Wait for an answer and return only the value
    pub async fn request_input(&self, task_name: &str, request: InputRequest) -> Result<InputValue> {
        self.await_input(task_name, request)
            .await
            .map(InputOutcome::into_value)
    }

    /// Wait for an answer, reporting how the wait ended
    ///
    /// Only an invalid request is an error; every other path yields a value.
    #[instrument(
        skip(self, request),
        fields(task_id = %request.task_id, sequence = request.sequence, input_type = %request.input_type)
    )]
    pub async fn await_input(&self, task_name: &str, request: InputRequest) -> Result<InputOutcome> {
        request.validate()?;

        let key = request.response_key();
        // follow-up prompts still watch the task key for the sentinel
        let task_key = (request.sequence > 0).then(|| user_input_key(&request.task_id));
        let deadline = Instant::now() + Duration::from_secs(request.timeout_seconds);

        info!(timeout_seconds = request.timeout_seconds, "Awaiting user input");
        self.notifier
            .emit(
                Notification::new(task_name, request.prompt.clone(), NotificationStatus::InputRequired)
                    .with_request_input(request.clone()),
            )
            .await;

        loop {
            match self.store.take(&key).await {
                Ok(Some(raw)) if raw == CANCELLED_SENTINEL => {
                    return Ok(self.cancel(task_name, &request).await);
                }
                Ok(Some(raw)) => return Ok(self.resolve(&request, &raw)),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Store read failed while awaiting input - retrying"),
            }

            if let Some(task_key) = &task_key {
                match self.store.take(task_key).await {
                    Ok(Some(raw)) if raw == CANCELLED_SENTINEL => {
                        return Ok(self.cancel(task_name, &request).await);
                    }
                    Ok(Some(raw)) => {
                        warn!(answer = %raw, "Discarding an answer meant for an earlier prompt");
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Store read failed while awaiting input - retrying"),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(self.time_out(task_name, &key, &request).await);
            }

            let nap = self.poll_interval.min(deadline - now);
            debug!(sleep_ms = nap.as_millis() as u64, "No input yet");
            sleep(nap).await;
        }
    }

    fn resolve(&self, request: &InputRequest, raw: &str) -> InputOutcome {
        match request.parse_answer(raw) {
            Some(value) => {
                info!(value = %value, "User input received");
                InputOutcome::Provided(value)
            }
            None => {
                let value = self.default_for(request);
                warn!(answer = %raw, default = %value, "Unusable input received - using default");
                InputOutcome::Rejected(value)
            }
        }
    }

    async fn cancel(&self, task_name: &str, request: &InputRequest) -> InputOutcome {
        let value = self.default_for(request);
        warn!(default = %value, "Client disconnected while awaiting input - using default");
        self.notifier
            .emit(Notification::new(
                task_name,
                format!("Клиент отключился, используется значение по умолчанию: {value}"),
                NotificationStatus::Warning,
            ))
            .await;
        InputOutcome::Cancelled(value)
    }

    async fn time_out(&self, task_name: &str, key: &str, request: &InputRequest) -> InputOutcome {
        if let Err(e) = self.store.delete(key).await {
            warn!(error = %e, "Failed to clear input key after timeout");
        }
        let value = self.default_for(request);
        warn!(default = %value, "Input wait timed out - using default");
        self.notifier
            .emit(Notification::new(
                task_name,
                format!("Время ожидания истекло, используется значение по умолчанию: {value}"),
                NotificationStatus::Timeout,
            ))
            .await;
        InputOutcome::TimedOut(value)
    }

    fn default_for(&self, request: &InputRequest) -> InputValue {
        default_value_with(request.input_type, &request.options, &self.text_default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventPublisher;
    use crate::store::InMemoryStore;
    use crate::PipelineConfig;

    fn gate_with(store: &InMemoryStore, publisher: &EventPublisher) -> InputGate {
        InputGate::new(
            Arc::new(store.clone()),
            Notifier::new(publisher.clone()),
            &PipelineConfig::default().input,
        )
    }

    fn choices() -> Vec<String> {
        vec!["A".to_string(), "B".to_string()]
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_present_is_consumed() {
        let store = InMemoryStore::new();
        let publisher = EventPublisher::new(16);
        let gate = gate_with(&store, &publisher);
        store
            .set("user_input:t1", "\"B\"".to_string(), Duration::from_secs(300))
            .await
            .unwrap();

        let outcome = gate
            .await_input("step", InputRequest::select("t1", "pick", choices(), 30))
            .await
            .unwrap();

        assert_eq!(outcome, InputOutcome::Provided(InputValue::Select("B".to_string())));
        assert_eq!(store.get("user_input:t1").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_arriving_later_is_picked_up() {
        let store = InMemoryStore::new();
        let publisher = EventPublisher::new(16);
        let gate = gate_with(&store, &publisher);

        let writer = store.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(3500)).await;
            writer
                .set("user_input:t2", "\"0.8\"".to_string(), Duration::from_secs(300))
                .await
                .unwrap();
        });

        let started = Instant::now();
        let value = gate
            .request_input("step", InputRequest::number("t2", "quality", 60).with_range(0.1, 1.0))
            .await
            .unwrap();

        assert_eq!(value, InputValue::Number(0.8));
        assert!(started.elapsed() <= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_default_and_clears_key() {
        let store = InMemoryStore::new();
        let publisher = EventPublisher::new(16);
        let mut receiver = publisher.subscribe();
        let gate = gate_with(&store, &publisher);

        let started = Instant::now();
        let outcome = gate
            .await_input("step", InputRequest::select("t3", "pick", choices(), 5))
            .await
            .unwrap();

        assert_eq!(outcome, InputOutcome::TimedOut(InputValue::Select("A".to_string())));
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(store.get("user_input:t3").await.unwrap(), None);

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.status, NotificationStatus::InputRequired);
        assert_eq!(first.request_input.unwrap().task_id, "t3");
        let last = receiver.recv().await.unwrap();
        assert_eq!(last.status, NotificationStatus::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_sentinel_yields_default_within_one_poll() {
        let store = InMemoryStore::new();
        let publisher = EventPublisher::new(16);
        let mut receiver = publisher.subscribe();
        let gate = gate_with(&store, &publisher);

        let writer = store.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(2)).await;
            writer
                .set("user_input:t4", CANCELLED_SENTINEL.to_string(), Duration::from_secs(10))
                .await
                .unwrap();
        });

        let started = Instant::now();
        let outcome = gate
            .await_input("step", InputRequest::number("t4", "quality", 300))
            .await
            .unwrap();

        assert_eq!(outcome, InputOutcome::Cancelled(InputValue::Number(1.0)));
        assert!(started.elapsed() <= Duration::from_secs(3));
        assert_eq!(store.get("user_input:t4").await.unwrap(), None);

        let statuses: Vec<_> = std::iter::from_fn(|| receiver.try_recv().ok())
            .map(|n| n.status)
            .collect();
        assert_eq!(
            statuses,
            vec![NotificationStatus::InputRequired, NotificationStatus::Warning]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_typed_as_cancelled_is_not_the_sentinel() {
        let store = InMemoryStore::new();
        let publisher = EventPublisher::new(16);
        let gate = gate_with(&store, &publisher);
        store
            .set("user_input:t5", "\"CANCELLED\"".to_string(), Duration::from_secs(300))
            .await
            .unwrap();

        let outcome = gate
            .await_input("step", InputRequest::text("t5", "comment", 30))
            .await
            .unwrap();

        assert_eq!(outcome, InputOutcome::Provided(InputValue::Text("CANCELLED".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_request_is_rejected_before_waiting() {
        let store = InMemoryStore::new();
        let publisher = EventPublisher::new(16);
        let mut receiver = publisher.subscribe();
        let gate = gate_with(&store, &publisher);

        let result = gate
            .await_input("step", InputRequest::select("t6", "pick", vec![], 30))
            .await;

        assert!(result.is_err());
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unusable_answer_is_reported_as_rejected() {
        let store = InMemoryStore::new();
        let publisher = EventPublisher::new(16);
        let gate = gate_with(&store, &publisher);
        store
            .set("user_input:t7", "\"C\"".to_string(), Duration::from_secs(300))
            .await
            .unwrap();

        let outcome = gate
            .await_input("step", InputRequest::select("t7", "pick", choices(), 30))
            .await
            .unwrap();

        assert_eq!(outcome, InputOutcome::Rejected(InputValue::Select("A".to_string())));
        assert!(outcome.is_default());
        assert!(!InputOutcome::Provided(InputValue::Number(0.5)).is_default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_answer_does_not_resolve_the_next_prompt() {
        let store = InMemoryStore::new();
        let publisher = EventPublisher::new(16);
        let gate = gate_with(&store, &publisher);
        let formats = vec!["Подробный отчет".to_string(), "Краткий отчет".to_string()];
        let charts = vec!["Да, включить графики".to_string(), "Нет, только текст".to_string()];

        let first = gate
            .await_input("report", InputRequest::select("t8", "format", formats, 5))
            .await
            .unwrap();
        assert_eq!(first, InputOutcome::TimedOut(InputValue::Select("Подробный отчет".to_string())));

        // the answer to the first prompt arrives after it gave up
        store
            .set("user_input:t8", "\"Краткий отчет\"".to_string(), Duration::from_secs(300))
            .await
            .unwrap();
        let writer = store.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            writer
                .set("user_input:t8:1", "\"Нет, только текст\"".to_string(), Duration::from_secs(300))
                .await
                .unwrap();
        });

        let started = Instant::now();
        let second = gate
            .await_input(
                "report",
                InputRequest::select("t8", "charts", charts, 30).with_sequence(1),
            )
            .await
            .unwrap();

        assert_eq!(second, InputOutcome::Provided(InputValue::Select("Нет, только текст".to_string())));
        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(store.get("user_input:t8").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_up_prompt_sees_task_cancellation() {
        let store = InMemoryStore::new();
        let publisher = EventPublisher::new(16);
        let gate = gate_with(&store, &publisher);
        store
            .set("user_input:t9", CANCELLED_SENTINEL.to_string(), Duration::from_secs(10))
            .await
            .unwrap();

        let outcome = gate
            .await_input("step", InputRequest::number("t9", "again", 300).with_sequence(2))
            .await
            .unwrap();

        assert_eq!(outcome, InputOutcome::Cancelled(InputValue::Number(1.0)));
        assert_eq!(store.get("user_input:t9").await.unwrap(), None);
    }
}
