//! # Step Contract
//!
//! A pipeline step receives the accumulated result of every earlier step and
//! returns only what it adds; the executor threads `prior + additions` into
//! the next step. Through [`StepExecution`] a step reports progress and asks
//! the input gate for decisions.
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use interactive_pipeline::orchestration::{PipelineStep, StepExecution, StepOutput, StepResult};
//! use interactive_pipeline::Result;
//!
//! #[derive(Debug)]
//! struct Greeting;
//!
//! #[async_trait]
//! impl PipelineStep for Greeting {
//!     fn name(&self) -> &str {
//!         "Приветствие"
//!     }
//!
//!     async fn execute(&self, exec: &mut StepExecution, input: &StepResult) -> Result<StepOutput> {
//!         let request = exec.text_request("Как вас зовут?");
//!         let name = exec.request_input(request).await?;
//!         exec.report_progress(100.0, "Готово").await;
//!         Ok(StepOutput::new(format!("Привет, {name}"), StepResult::new().with("name", name.to_json())))
//!     }
//! }
//! ```

use async_trait::async_trait;
use std::fmt;
use tracing::debug;

use super::types::{StepContext, StepResult};
use crate::error::Result;
use crate::gate::{InputGate, InputRequest, InputValue};
use crate::progress::{ProgressAggregator, ProgressSnapshot};
use crate::state_machine::{StepEvent, StepState, StepStateMachine};

/// What a step contributes to the chain
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    /// Human-readable line sent with the success notification
    pub summary: String,
    /// Keys added to (or overriding) the prior result
    pub additions: StepResult,
}

impl StepOutput {
    pub fn new(summary: impl Into<String>, additions: StepResult) -> Self {
        Self {
            summary: summary.into(),
            additions,
        }
    }
}

/// Pluggable body of one pipeline stage
#[async_trait]
pub trait PipelineStep: Send + Sync + fmt::Debug {
    /// Display name used as the notification `task_name`
    fn name(&self) -> &str;

    /// Run the stage; an `Err` halts the chain
    async fn execute(&self, exec: &mut StepExecution, input: &StepResult) -> Result<StepOutput>;
}

/// Runtime handle owned by one step invocation
#[derive(Debug)]
pub struct StepExecution {
    context: StepContext,
    gate: InputGate,
    progress: ProgressAggregator,
    state: StepStateMachine,
    input_timeout_seconds: u64,
    next_sequence: u32,
}

impl StepExecution {
    pub(crate) fn new(
        context: StepContext,
        gate: InputGate,
        progress: ProgressAggregator,
        input_timeout_seconds: u64,
    ) -> Self {
        let state = StepStateMachine::new(context.step_name.clone());
        Self {
            context,
            gate,
            progress,
            state,
            input_timeout_seconds,
            next_sequence: 0,
        }
    }

    pub fn context(&self) -> &StepContext {
        &self.context
    }

    pub fn task_id(&self) -> String {
        self.context.task_id.to_string()
    }

    pub fn state(&self) -> StepState {
        self.state.current_state()
    }

    pub(crate) fn transition(&mut self, event: StepEvent) -> Result<StepState> {
        Ok(self.state.transition(event)?)
    }

    /// Publish the step-local percent as pipeline-wide progress
    pub async fn report_progress(
        &self,
        step_percent: f64,
        message: impl Into<serde_json::Value>,
    ) -> ProgressSnapshot {
        self.progress
            .record(
                &self.context.run_id.to_string(),
                self.context.step_index,
                self.context.total_steps,
                step_percent,
                &self.context.step_name,
                message,
            )
            .await
    }

    /// Block until the input gate resolves the request
    ///
    /// Requests are numbered in the order they are made; the sequence on
    /// `request` is overwritten.
    pub async fn request_input(&mut self, request: InputRequest) -> Result<InputValue> {
        let request = request.with_sequence(self.next_sequence);
        self.next_sequence += 1;

        self.transition(StepEvent::AwaitInput)?;
        let outcome = self
            .gate
            .await_input(&self.context.step_name, request)
            .await;
        // leave the awaiting state even when the request was invalid
        self.transition(StepEvent::InputResolved)?;

        let outcome = outcome?;
        if outcome.is_default() {
            debug!(step = %self.context.step_name, "Continuing with the default answer");
        }
        Ok(outcome.into_value())
    }

    pub fn text_request(&self, prompt: impl Into<String>) -> InputRequest {
        InputRequest::text(self.task_id(), prompt, self.input_timeout_seconds)
    }

    pub fn number_request(&self, prompt: impl Into<String>, min: f64, max: f64) -> InputRequest {
        InputRequest::number(self.task_id(), prompt, self.input_timeout_seconds).with_range(min, max)
    }

    pub fn select_request(&self, prompt: impl Into<String>, options: &[&str]) -> InputRequest {
        InputRequest::select(
            self.task_id(),
            prompt,
            options.iter().map(|o| o.to_string()).collect(),
            self.input_timeout_seconds,
        )
    }
}
