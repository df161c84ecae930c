//! # Step Executor
//!
//! Harness around one step invocation: drives the step state machine, emits
//! the opening progress and the closing success/error notification, threads
//! `prior + additions` into the result, and turns step errors and panics into
//! an `error` notification before propagating them. Nothing is retried here.

use futures::FutureExt;
use serde_json::json;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::step_handler::{PipelineStep, StepExecution};
use super::types::{PipelineRun, StepContext, StepResult};
use crate::constants::PIPELINE_TASK_NAME;
use crate::error::{PipelineError, Result};
use crate::events::{Notification, NotificationStatus, Notifier};
use crate::gate::InputGate;
use crate::logging::log_step_operation;
use crate::progress::ProgressAggregator;
use crate::state_machine::StepEvent;

#[derive(Debug, Clone)]
pub struct StepExecutor {
    gate: InputGate,
    progress: ProgressAggregator,
    notifier: Notifier,
    input_timeout_seconds: u64,
}

impl StepExecutor {
    pub fn new(
        gate: InputGate,
        progress: ProgressAggregator,
        notifier: Notifier,
        input_timeout_seconds: u64,
    ) -> Self {
        Self {
            gate,
            progress,
            notifier,
            input_timeout_seconds,
        }
    }

    /// Run `step` as position `step_index` of `run`, consuming `input`
    #[instrument(skip_all, fields(run_id = %run.run_id, step_index = step_index, task_id = %task_id))]
    pub async fn execute(
        &self,
        step: &Arc<dyn PipelineStep>,
        run: &PipelineRun,
        step_index: u32,
        task_id: Uuid,
        input: StepResult,
    ) -> Result<StepResult> {
        let context = StepContext {
            run_id: run.run_id,
            step_index,
            total_steps: run.total_steps,
            step_name: step.name().to_string(),
            task_id,
        };
        let run_id = run.run_id.to_string();
        let task_id = task_id.to_string();
        let step_name = context.step_name.clone();
        let is_last = context.is_last();

        let mut execution = StepExecution::new(
            context,
            self.gate.clone(),
            self.progress.clone(),
            self.input_timeout_seconds,
        );
        execution.transition(StepEvent::Start)?;
        log_step_operation("start", &run_id, Some(&task_id), &step_name, "running", None);
        execution
            .report_progress(0.0, format!("Запуск шага {step_index}/{}", run.total_steps))
            .await;

        let started = Instant::now();
        let outcome = AssertUnwindSafe(step.execute(&mut execution, &input))
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(output)) => {
                execution.transition(StepEvent::Succeed)?;
                let next = input.merged_with(&output.additions);

                info!(
                    step_name = %step_name,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Step succeeded"
                );
                log_step_operation(
                    "finish",
                    &run_id,
                    Some(&task_id),
                    &step_name,
                    "succeeded",
                    Some(&output.summary),
                );
                self.notifier
                    .emit(Notification::new(
                        &step_name,
                        json!({ "summary": output.summary, "fields": output.additions.into_value() }),
                        NotificationStatus::Success,
                    ))
                    .await;

                if is_last {
                    self.progress.finish_run(&run_id);
                    self.notifier
                        .emit(Notification::new(
                            PIPELINE_TASK_NAME,
                            json!({ "run_id": run_id, "result": next.clone().into_value() }),
                            NotificationStatus::Completed,
                        ))
                        .await;
                }
                return Ok(next);
            }
            Ok(Err(PipelineError::StepExecution { message, .. })) => message,
            Ok(Err(other)) => other.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        // The harness's own transition must not mask the step error
        if let Err(e) = execution.transition(StepEvent::Fail(failure.clone())) {
            error!(error = %e, "Could not record step failure state");
        }
        error!(
            step_name = %step_name,
            error = %failure,
            duration_ms = started.elapsed().as_millis() as u64,
            "Step failed - chain halted"
        );
        log_step_operation("finish", &run_id, Some(&task_id), &step_name, "failed", Some(&failure));
        self.progress.finish_run(&run_id);
        self.notifier
            .emit(
                Notification::new(&step_name, failure.clone(), NotificationStatus::Error)
                    .with_error(failure.clone()),
            )
            .await;

        Err(PipelineError::step_failed(step_name, failure))
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputConfig;
    use crate::events::EventPublisher;
    use crate::orchestration::step_handler::StepOutput;
    use crate::store::InMemoryStore;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct AskQuality;

    #[async_trait]
    impl PipelineStep for AskQuality {
        fn name(&self) -> &str {
            "ask"
        }

        async fn execute(&self, exec: &mut StepExecution, _input: &StepResult) -> Result<StepOutput> {
            let request = exec.number_request("quality?", 0.1, 1.0);
            let quality = exec.request_input(request).await?;
            exec.report_progress(100.0, "asked").await;
            Ok(StepOutput::new("asked", StepResult::new().with("quality_factor", quality.to_json())))
        }
    }

    #[derive(Debug)]
    struct Panicking;

    #[async_trait]
    impl PipelineStep for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn execute(&self, _exec: &mut StepExecution, _input: &StepResult) -> Result<StepOutput> {
            panic!("division by zero in placeholder");
        }
    }

    fn executor(publisher: &EventPublisher, timeout_seconds: u64) -> StepExecutor {
        let notifier = Notifier::new(publisher.clone());
        let gate = InputGate::new(
            Arc::new(InMemoryStore::new()),
            notifier.clone(),
            &InputConfig::default(),
        );
        StepExecutor::new(gate, ProgressAggregator::new(notifier.clone()), notifier, timeout_seconds)
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_step_merges_and_completes_run() {
        let publisher = EventPublisher::new(32);
        let mut receiver = publisher.subscribe();
        let step: Arc<dyn PipelineStep> = Arc::new(AskQuality);
        let run = PipelineRun::new(1);

        let result = executor(&publisher, 2)
            .execute(&step, &run, 1, Uuid::new_v4(), StepResult::new().with("data_size", 10))
            .await
            .unwrap();

        assert_eq!(result.get_u64_or("data_size", 0), 10);
        assert_eq!(result.get_f64_or("quality_factor", 0.0), 1.0);

        let mut statuses = Vec::new();
        while let Ok(notification) = receiver.try_recv() {
            statuses.push(notification.status);
        }
        assert_eq!(
            statuses,
            vec![
                NotificationStatus::Progress,
                NotificationStatus::InputRequired,
                NotificationStatus::Timeout,
                NotificationStatus::Progress,
                NotificationStatus::Success,
                NotificationStatus::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_error_notification() {
        let publisher = EventPublisher::new(32);
        let mut receiver = publisher.subscribe();
        let step: Arc<dyn PipelineStep> = Arc::new(Panicking);
        let run = PipelineRun::new(4);

        let err = executor(&publisher, 300)
            .execute(&step, &run, 2, Uuid::new_v4(), StepResult::new())
            .await
            .unwrap_err();

        match err {
            PipelineError::StepExecution { step_name, message } => {
                assert_eq!(step_name, "panicking");
                assert_eq!(message, "division by zero in placeholder");
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut last = None;
        while let Ok(notification) = receiver.try_recv() {
            last = Some(notification);
        }
        let last = last.unwrap();
        assert_eq!(last.status, NotificationStatus::Error);
        assert_eq!(last.error.as_deref(), Some("division by zero in placeholder"));
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "Unknown panic");
    }
}
