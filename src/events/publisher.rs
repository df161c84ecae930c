use async_trait::async_trait;
use std::fmt;
use tokio::sync::broadcast;

use super::types::Notification;
use crate::constants::DEFAULT_CHANNEL_CAPACITY;

/// Transport that carries notifications to observers
///
/// Delivery is best-effort: implementations report failures, callers decide
/// whether they matter (the pipeline never lets them).
#[async_trait]
pub trait NotificationSink: Send + Sync + fmt::Debug {
    async fn deliver(&self, notification: &Notification) -> Result<(), PublishError>;

    fn sink_name(&self) -> &'static str;
}

/// Broadcast fan-out of notifications to every live subscriber
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<Notification>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification to all current subscribers
    pub fn publish(&self, notification: Notification) -> Result<(), PublishError> {
        // send() fails only when nobody is subscribed, which is fine for a broadcast
        match self.sender.send(notification) {
            Ok(_) => Ok(()),
            Err(broadcast::error::SendError(_)) => Ok(()),
        }
    }

    /// Subscribe to notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl NotificationSink for EventPublisher {
    async fn deliver(&self, notification: &Notification) -> Result<(), PublishError> {
        self.publish(notification.clone())
    }

    fn sink_name(&self) -> &'static str {
        "broadcast"
    }
}

/// A sink could not hand a notification over
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}
