//! Best-effort emission of notifications.
//!
//! Observability never decides the outcome of a step: every delivery failure
//! is logged here and dropped.

use std::sync::Arc;
use tracing::{debug, warn};

use super::publisher::{EventPublisher, NotificationSink};
use super::types::{Notification, NotificationStatus};

/// Fans a notification out to every registered sink, swallowing failures
#[derive(Debug, Clone)]
pub struct Notifier {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl Notifier {
    /// Notifier delivering to a single broadcast publisher
    pub fn new(publisher: EventPublisher) -> Self {
        Self {
            sinks: vec![Arc::new(publisher)],
        }
    }

    /// Notifier with an arbitrary sink set (empty means discard)
    pub fn with_sinks(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn add_sink(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    /// Deliver to all sinks; never fails
    pub async fn emit(&self, notification: Notification) {
        debug!(
            task_name = %notification.task_name,
            status = %notification.status,
            "Emitting notification"
        );
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(&notification).await {
                warn!(
                    sink = sink.sink_name(),
                    status = %notification.status,
                    error = %e,
                    "Notification delivery failed - continuing"
                );
            }
        }
    }

    /// Shorthand for a plain status message
    pub async fn emit_status(
        &self,
        task_name: &str,
        result: impl Into<serde_json::Value>,
        status: NotificationStatus,
    ) {
        self.emit(Notification::new(task_name, result, status)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PublishError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct FailingSink {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn deliver(&self, _notification: &Notification) -> Result<(), PublishError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(PublishError::Delivery("connection refused".to_string()))
        }

        fn sink_name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_block_other_sinks() {
        let failing = Arc::new(FailingSink::default());
        let publisher = EventPublisher::new(8);
        let mut receiver = publisher.subscribe();
        let notifier = Notifier::with_sinks(vec![failing.clone(), Arc::new(publisher)]);

        notifier
            .emit_status("step", "still delivered", NotificationStatus::Progress)
            .await;

        assert_eq!(failing.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(receiver.recv().await.unwrap().result, "still delivered");
    }

    #[tokio::test]
    async fn test_empty_notifier_discards() {
        let notifier = Notifier::with_sinks(Vec::new());
        notifier
            .emit_status("step", "nobody listens", NotificationStatus::Warning)
            .await;
    }
}
