//! # Task Queue
//!
//! Seam between the orchestrator and whatever runs the chain. A queue accepts
//! the whole chain at once and hands back a [`ChainHandle`]; the chain then
//! runs without the launcher, one step at a time, each step consuming the
//! result of the one before it.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::step_executor::StepExecutor;
use super::step_handler::PipelineStep;
use super::types::{PipelineRun, StepResult};
use crate::error::{PipelineError, Result};

/// Errors that can occur while handing a chain to a queue
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("Queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Anything able to run a step chain in the background
#[async_trait]
pub trait TaskQueue: Send + Sync + std::fmt::Debug {
    /// Accept the chain; steps run in order after this returns
    async fn enqueue_chain(
        &self,
        run: PipelineRun,
        steps: Vec<Arc<dyn PipelineStep>>,
        initial_input: StepResult,
    ) -> std::result::Result<ChainHandle, EnqueueError>;

    /// Queue name for identification in logs
    fn queue_name(&self) -> &'static str;
}

/// Handle on a chain that has been accepted by a queue
#[derive(Debug)]
pub struct ChainHandle {
    run_id: Uuid,
    join: JoinHandle<Result<StepResult>>,
}

impl ChainHandle {
    pub fn new(run_id: Uuid, join: JoinHandle<Result<StepResult>>) -> Self {
        Self { run_id, join }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the chain to end with the final result or the halting error
    pub async fn wait(self) -> Result<StepResult> {
        match self.join.await {
            Ok(result) => result,
            Err(join_error) => Err(PipelineError::step_failed(
                "chain",
                format!("chain task aborted: {join_error}"),
            )),
        }
    }

    /// Detach; the chain keeps running
    pub fn detach(self) -> Uuid {
        self.run_id
    }
}

/// Runs chains as tokio tasks inside this process
#[derive(Debug)]
pub struct InProcessQueue {
    executor: StepExecutor,
    accepting: AtomicBool,
}

impl InProcessQueue {
    pub fn new(executor: StepExecutor) -> Self {
        Self {
            executor,
            accepting: AtomicBool::new(true),
        }
    }

    /// Refuse new chains; chains already running are left alone
    pub fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
        info!("In-process queue stopped accepting chains");
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskQueue for InProcessQueue {
    async fn enqueue_chain(
        &self,
        run: PipelineRun,
        steps: Vec<Arc<dyn PipelineStep>>,
        initial_input: StepResult,
    ) -> std::result::Result<ChainHandle, EnqueueError> {
        if !self.is_accepting() {
            return Err(EnqueueError::QueueUnavailable(
                "in-process queue is shut down".to_string(),
            ));
        }
        if steps.is_empty() {
            return Err(EnqueueError::InvalidRequest(
                "chain must contain at least one step".to_string(),
            ));
        }
        if steps.len() != run.total_steps as usize {
            return Err(EnqueueError::InvalidRequest(format!(
                "run declares {} steps but chain has {}",
                run.total_steps,
                steps.len()
            )));
        }

        let run_id = run.run_id;
        let executor = self.executor.clone();
        let span = tracing::info_span!("pipeline_chain", run_id = %run_id);

        let join = tokio::spawn(
            async move {
                let mut carried = initial_input;
                for (position, step) in steps.iter().enumerate() {
                    let step_index = position as u32 + 1;
                    match executor
                        .execute(step, &run, step_index, Uuid::new_v4(), carried)
                        .await
                    {
                        Ok(next) => carried = next,
                        Err(e) => {
                            warn!(step_index, error = %e, "Chain halted");
                            return Err(e);
                        }
                    }
                }
                info!(total_steps = run.total_steps, "Chain completed");
                Ok(carried)
            }
            .instrument(span),
        );

        Ok(ChainHandle::new(run_id, join))
    }

    fn queue_name(&self) -> &'static str {
        "in_process"
    }
}
