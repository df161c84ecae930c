//! # Session/Cancellation Manager
//!
//! Owns the table of connected clients. A session may be bound to at most one
//! task awaiting input; when the client goes away the manager writes the
//! cancellation sentinel for that task so a polling input gate resolves to
//! its default instead of waiting out the full timeout.
//!
//! Nothing outside this module reads or writes session state.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::constants::{user_input_key, CANCELLATION_TTL_SECONDS, CANCELLED_SENTINEL};
use crate::error::{PipelineError, Result};
use crate::logging::log_session_operation;
use crate::store::KeyValueStore;

/// One connected observer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSession {
    pub session_id: String,
    pub connected_at: DateTime<Utc>,
    pub active_task_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<String, ClientSession>>>,
    store: Arc<dyn KeyValueStore>,
    cancellation_ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_cancellation_ttl(store, Duration::from_secs(CANCELLATION_TTL_SECONDS))
    }

    pub fn with_cancellation_ttl(store: Arc<dyn KeyValueStore>, cancellation_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            store,
            cancellation_ttl,
        }
    }

    /// Register a connection; reconnecting with a known id starts a fresh session
    pub fn on_connect(&self, session_id: &str) -> ClientSession {
        let session = ClientSession {
            session_id: session_id.to_string(),
            connected_at: Utc::now(),
            active_task_id: None,
        };
        let previous = self
            .sessions
            .write()
            .insert(session_id.to_string(), session.clone());
        if previous.is_some() {
            warn!(session_id = %session_id, "Session id reconnected - previous binding dropped");
        }
        log_session_operation("connect", session_id, None, None);
        session
    }

    /// Bind the task whose input requests this client is answering
    ///
    /// Replaces any earlier binding.
    pub fn bind_active_task(&self, session_id: &str, task_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(session_id).ok_or_else(|| {
            PipelineError::Validation(format!("unknown session: {session_id}"))
        })?;
        let replaced = session.active_task_id.replace(task_id.to_string());
        drop(sessions);

        debug!(
            session_id = %session_id,
            task_id = %task_id,
            replaced = ?replaced,
            "Active task bound"
        );
        log_session_operation("bind_active_task", session_id, Some(task_id), None);
        Ok(())
    }

    /// Forget the session and cancel its pending input wait, if any
    ///
    /// Returns the task id that was cancelled.
    pub async fn on_disconnect(&self, session_id: &str) -> Result<Option<String>> {
        let removed = self.sessions.write().remove(session_id);
        let Some(session) = removed else {
            debug!(session_id = %session_id, "Disconnect for unknown session ignored");
            return Ok(None);
        };

        let Some(task_id) = session.active_task_id else {
            log_session_operation("disconnect", session_id, None, Some("no active task"));
            return Ok(None);
        };

        if let Err(e) = self
            .store
            .set(
                &user_input_key(&task_id),
                CANCELLED_SENTINEL.to_string(),
                self.cancellation_ttl,
            )
            .await
        {
            error!(
                session_id = %session_id,
                task_id = %task_id,
                error = %e,
                "Failed to write cancellation sentinel"
            );
            return Err(e.into());
        }

        log_session_operation(
            "disconnect",
            session_id,
            Some(&task_id),
            Some("cancellation sentinel written"),
        );
        Ok(Some(task_id))
    }

    /// Task currently bound to a session
    pub fn active_task(&self, session_id: &str) -> Option<String> {
        self.sessions
            .read()
            .get(session_id)
            .and_then(|session| session.active_task_id.clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn manager() -> (SessionManager, InMemoryStore) {
        let store = InMemoryStore::new();
        (SessionManager::new(Arc::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_disconnect_with_bound_task_writes_sentinel() {
        let (sessions, store) = manager();
        sessions.on_connect("s1");
        sessions.bind_active_task("s1", "task-9").unwrap();

        let cancelled = sessions.on_disconnect("s1").await.unwrap();

        assert_eq!(cancelled.as_deref(), Some("task-9"));
        assert_eq!(
            store.get("user_input:task-9").await.unwrap().as_deref(),
            Some(CANCELLED_SENTINEL)
        );
        assert_eq!(sessions.session_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_without_binding_writes_nothing() {
        let (sessions, store) = manager();
        sessions.on_connect("s1");

        assert_eq!(sessions.on_disconnect("s1").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_rebinding_replaces_previous_task() {
        let (sessions, store) = manager();
        sessions.on_connect("s1");
        sessions.bind_active_task("s1", "old").unwrap();
        sessions.bind_active_task("s1", "new").unwrap();
        assert_eq!(sessions.active_task("s1").as_deref(), Some("new"));

        sessions.on_disconnect("s1").await.unwrap();

        assert_eq!(store.get("user_input:old").await.unwrap(), None);
        assert!(store.get("user_input:new").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_bind_unknown_session_is_rejected() {
        let (sessions, _) = manager();
        assert!(matches!(
            sessions.bind_active_task("ghost", "t"),
            Err(PipelineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_disconnect_is_a_noop() {
        let (sessions, store) = manager();
        assert_eq!(sessions.on_disconnect("ghost").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sentinel_expires_after_cancellation_ttl() {
        let (sessions, store) = manager();
        sessions.on_connect("s1");
        sessions.bind_active_task("s1", "t").unwrap();
        sessions.on_disconnect("s1").await.unwrap();

        tokio::time::advance(Duration::from_secs(CANCELLATION_TTL_SECONDS + 1)).await;

        assert_eq!(store.get("user_input:t").await.unwrap(), None);
    }
}
