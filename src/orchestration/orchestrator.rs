//! # Chain Orchestrator
//!
//! Builds the ordered step list and the initial arguments once, announces the
//! run and hands the chain to a [`TaskQueue`]. It never waits for the chain
//! and is never re-entered by a failing step.

use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::queue::{ChainHandle, TaskQueue};
use super::step_handler::PipelineStep;
use super::types::{PipelineRun, StepResult};
use crate::constants::PIPELINE_TASK_NAME;
use crate::error::Result;
use crate::events::{Notification, NotificationStatus, Notifier};

#[derive(Debug, Clone)]
pub struct ChainOrchestrator {
    steps: Vec<Arc<dyn PipelineStep>>,
    queue: Arc<dyn TaskQueue>,
    notifier: Notifier,
}

impl ChainOrchestrator {
    pub fn new(steps: Vec<Arc<dyn PipelineStep>>, queue: Arc<dyn TaskQueue>, notifier: Notifier) -> Self {
        Self {
            steps,
            queue,
            notifier,
        }
    }

    /// Append a step to the end of the chain
    pub fn with_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn total_steps(&self) -> u32 {
        self.steps.len() as u32
    }

    /// Launch a run and return its handle without waiting for it
    ///
    /// A queue refusal is returned as [`crate::PipelineError::Launch`].
    #[instrument(skip_all, fields(queue = self.queue.queue_name(), total_steps = self.steps.len()))]
    pub async fn launch(&self, initial_input: StepResult) -> Result<ChainHandle> {
        let run = PipelineRun::new(self.total_steps());
        let run_id = run.run_id;

        info!(run_id = %run_id, "Launching pipeline run");
        self.notifier
            .emit(Notification::new(
                PIPELINE_TASK_NAME,
                json!({
                    "message": "Запуск пайплайна обработки данных",
                    "run_id": run_id.to_string(),
                    "total_steps": run.total_steps,
                    "steps": self.step_names(),
                }),
                NotificationStatus::Start,
            ))
            .await;

        match self
            .queue
            .enqueue_chain(run, self.steps.clone(), initial_input)
            .await
        {
            Ok(handle) => Ok(handle),
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Failed to enqueue pipeline chain");
                Err(e.into())
            }
        }
    }

    /// Launch a run and return only its identity
    pub async fn start(&self, initial_input: StepResult) -> Result<Uuid> {
        self.launch(initial_input).await.map(ChainHandle::detach)
    }
}
