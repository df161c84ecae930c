//! # Control Surface
//!
//! Assembles the pipeline runtime from configuration and exposes the inbound
//! operations an outer layer routes to it: launch, submit-input and the
//! connection lifecycle.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{ConfigManager, PipelineConfig};
use crate::constants::input_response_key;
use crate::error::{PipelineError, Result};
use crate::events::{EventPublisher, Notification, Notifier};
use crate::gate::InputGate;
use crate::orchestration::{
    ChainHandle, ChainOrchestrator, InProcessQueue, StepExecutor, StepResult,
};
use crate::progress::{ProgressAggregator, ProgressSnapshot};
use crate::session::{ClientSession, SessionManager};
use crate::store::{InMemoryStore, KeyValueStore};
use crate::workload::{standard_pipeline, RandomWorkload, Workload};

/// Handle on one assembled pipeline runtime
#[derive(Debug, Clone)]
pub struct ControlSurface {
    config_manager: Arc<ConfigManager>,
    store: Arc<dyn KeyValueStore>,
    publisher: EventPublisher,
    progress: ProgressAggregator,
    queue: Arc<InProcessQueue>,
    orchestrator: ChainOrchestrator,
    sessions: SessionManager,
}

impl ControlSurface {
    /// In-memory store and randomized placeholder workload
    pub fn bootstrap(config_manager: Arc<ConfigManager>) -> Self {
        let workload = RandomWorkload::new(config_manager.config().pipeline.step_delay_scale);
        Self::bootstrap_with(
            config_manager,
            Arc::new(InMemoryStore::new()),
            Arc::new(workload),
        )
    }

    /// Assemble around a caller-supplied store and workload
    pub fn bootstrap_with(
        config_manager: Arc<ConfigManager>,
        store: Arc<dyn KeyValueStore>,
        workload: Arc<dyn Workload>,
    ) -> Self {
        let config = config_manager.config();
        let publisher = EventPublisher::new(config.events.channel_capacity);
        let notifier = Notifier::new(publisher.clone());

        let gate = InputGate::new(store.clone(), notifier.clone(), &config.input);
        let progress = ProgressAggregator::new(notifier.clone());
        let executor = StepExecutor::new(
            gate,
            progress.clone(),
            notifier.clone(),
            config.input.default_timeout_seconds,
        );
        let queue = Arc::new(InProcessQueue::new(executor));
        let orchestrator =
            ChainOrchestrator::new(standard_pipeline(workload), queue.clone(), notifier);
        let sessions = SessionManager::with_cancellation_ttl(
            store.clone(),
            Duration::from_secs(config.input.cancellation_ttl_seconds),
        );

        info!(
            environment = %config_manager.environment(),
            steps = orchestrator.total_steps(),
            "Pipeline runtime assembled"
        );

        Self {
            config_manager,
            store,
            publisher,
            progress,
            queue,
            orchestrator,
            sessions,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        self.config_manager.config()
    }

    /// Observe every notification emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.publisher.subscribe()
    }

    /// Launch a run; a missing size falls back to the configured default
    #[instrument(skip(self))]
    pub async fn launch(&self, data_size: Option<u64>) -> Result<ChainHandle> {
        let data_size = data_size.unwrap_or(self.config().pipeline.default_data_size);
        self.orchestrator
            .launch(StepResult::new().with("data_size", data_size))
            .await
    }

    /// Launch a run without keeping its handle
    pub async fn start(&self, data_size: Option<u64>) -> Result<Uuid> {
        self.launch(data_size).await.map(ChainHandle::detach)
    }

    /// Store a human answer for the first prompt of the step running as `task_id`
    ///
    /// The value is stored JSON-encoded and expires if nobody reads it.
    pub async fn submit_input(&self, task_id: &str, value: &Value) -> Result<()> {
        self.submit_response(task_id, 0, value).await
    }

    /// Store a human answer for prompt `sequence` of the step running as `task_id`
    ///
    /// `sequence` is echoed from the `request_input` of the notification being answered.
    #[instrument(skip(self, value))]
    pub async fn submit_response(&self, task_id: &str, sequence: u32, value: &Value) -> Result<()> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(PipelineError::Validation(
                "task_id is required to submit input".to_string(),
            ));
        }

        let encoded = serde_json::to_string(value)?;
        let ttl = Duration::from_secs(self.config().input.submitted_value_ttl_seconds);
        self.store
            .set(&input_response_key(task_id, sequence), encoded, ttl)
            .await?;

        debug!(task_id = %task_id, sequence, ttl_seconds = ttl.as_secs(), "Input submitted");
        Ok(())
    }

    pub fn connect(&self, session_id: &str) -> ClientSession {
        self.sessions.on_connect(session_id)
    }

    /// Route a disconnect; returns the task whose wait was cancelled, if any
    pub async fn disconnect(&self, session_id: &str) -> Result<Option<String>> {
        self.sessions.on_disconnect(session_id).await
    }

    pub fn bind_active_task(&self, session_id: &str, task_id: &str) -> Result<()> {
        self.sessions.bind_active_task(session_id, task_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.session_count()
    }

    /// Latest progress of a run still in flight
    pub fn progress(&self, run_id: &Uuid) -> Option<ProgressSnapshot> {
        self.progress.latest(&run_id.to_string())
    }

    /// Stop accepting launches; runs already in flight continue
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}
