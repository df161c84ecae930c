//! Scripted remote client for end-to-end pipeline tests.

#![allow(dead_code)]

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use interactive_pipeline::config::{ConfigManager, PipelineConfig};
use interactive_pipeline::control::ControlSurface;
use interactive_pipeline::events::{Notification, NotificationStatus};
use interactive_pipeline::store::InMemoryStore;
use interactive_pipeline::workload::FixedWorkload;

pub const SESSION_ID: &str = "client-1";

/// What the client does with the next input prompt
#[derive(Debug, Clone)]
pub enum Reply {
    Answer(Value),
    /// Disconnect while the prompt is pending, then reconnect
    Disconnect,
    /// Leave the prompt to time out
    Ignore,
}

pub fn answer(value: impl Into<Value>) -> Reply {
    Reply::Answer(value.into())
}

/// Runtime with an in-memory store and deterministic workload
pub fn runtime(config: PipelineConfig) -> (ControlSurface, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let manager = ConfigManager::from_config(config).expect("valid test configuration");
    let surface = ControlSurface::bootstrap_with(manager, store.clone(), Arc::new(FixedWorkload::upper()));
    (surface, store)
}

/// Subscribe now and answer prompts in order until the run ends
///
/// Must be called before launching so no notification is missed. Returns
/// every notification observed.
pub fn spawn_client(surface: &ControlSurface, replies: Vec<Reply>) -> JoinHandle<Vec<Notification>> {
    let mut receiver = surface.subscribe();
    let surface = surface.clone();
    surface.connect(SESSION_ID);

    tokio::spawn(async move {
        let mut replies = replies.into_iter();
        let mut seen = Vec::new();
        loop {
            let notification = match receiver.recv().await {
                Ok(notification) => notification,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            let status = notification.status;

            if let (NotificationStatus::InputRequired, Some(request)) =
                (status, notification.request_input.clone())
            {
                surface
                    .bind_active_task(SESSION_ID, &request.task_id)
                    .expect("client session is connected");
                match replies.next().unwrap_or(Reply::Ignore) {
                    Reply::Answer(value) => surface
                        .submit_response(&request.task_id, request.sequence, &value)
                        .await
                        .expect("submit input"),
                    Reply::Disconnect => {
                        surface.disconnect(SESSION_ID).await.expect("disconnect");
                        surface.connect(SESSION_ID);
                    }
                    Reply::Ignore => {}
                }
            }

            seen.push(notification);
            if matches!(status, NotificationStatus::Completed | NotificationStatus::Error) {
                break;
            }
        }
        seen
    })
}

pub fn with_status(notifications: &[Notification], status: NotificationStatus) -> Vec<&Notification> {
    notifications.iter().filter(|n| n.status == status).collect()
}
