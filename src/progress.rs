//! # Progress Aggregator
//!
//! Folds a step-local percentage into one pipeline-wide percentage. Every
//! completed step contributes a full `1 / total_steps` share and the running
//! step contributes its fraction of that share:
//!
//! ```text
//! overall = clamp(0, 100, ((current_step - 1) + step_percent / 100) / total_steps * 100)
//! ```
//!
//! ```rust
//! use interactive_pipeline::progress::ProgressAggregator;
//!
//! assert_eq!(ProgressAggregator::compute(1, 4, 100.0), 25.0);
//! assert_eq!(ProgressAggregator::compute(2, 4, 0.0), 25.0);
//! assert_eq!(ProgressAggregator::compute(4, 4, 100.0), 100.0);
//! ```

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::events::{Notification, NotificationStatus, Notifier};

/// Latest progress of one run, as shown to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub run_id: String,
    pub current_step: u32,
    pub total_steps: u32,
    pub step_progress_percent: f64,
    pub overall_progress_percent: f64,
}

/// Computes and publishes pipeline-wide progress
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    notifier: Notifier,
    latest: Arc<DashMap<String, ProgressSnapshot>>,
}

impl ProgressAggregator {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            notifier,
            latest: Arc::new(DashMap::new()),
        }
    }

    /// Pipeline-wide percent for a 1-based step and its local percent
    ///
    /// Out-of-range inputs are clamped rather than rejected. A zero step
    /// count yields 0.
    pub fn compute(current_step: u32, total_steps: u32, step_progress_percent: f64) -> f64 {
        if total_steps == 0 {
            return 0.0;
        }
        let step_fraction = clamp_percent(step_progress_percent) / 100.0;
        let completed = f64::from(current_step) - 1.0;
        let overall = (completed + step_fraction) / f64::from(total_steps) * 100.0;
        clamp_percent(overall)
    }

    /// Compute a snapshot, remember it as the run's latest and emit it
    pub async fn record(
        &self,
        run_id: &str,
        current_step: u32,
        total_steps: u32,
        step_progress_percent: f64,
        task_name: &str,
        message: impl Into<serde_json::Value>,
    ) -> ProgressSnapshot {
        let snapshot = ProgressSnapshot {
            run_id: run_id.to_string(),
            current_step,
            total_steps,
            step_progress_percent: clamp_percent(step_progress_percent),
            overall_progress_percent: Self::compute(
                current_step,
                total_steps,
                step_progress_percent,
            ),
        };

        debug!(
            run_id = %run_id,
            current_step,
            total_steps,
            step_percent = snapshot.step_progress_percent,
            overall_percent = snapshot.overall_progress_percent,
            "Progress recorded"
        );

        self.latest.insert(run_id.to_string(), snapshot.clone());
        self.notifier
            .emit(
                Notification::new(task_name, message, NotificationStatus::Progress)
                    .with_progress(snapshot.clone()),
            )
            .await;
        snapshot
    }

    /// Latest snapshot recorded for a run still in flight
    pub fn latest(&self, run_id: &str) -> Option<ProgressSnapshot> {
        self.latest.get(run_id).map(|entry| entry.value().clone())
    }

    /// Forget a run once it completes or fails
    pub fn finish_run(&self, run_id: &str) {
        self.latest.remove(run_id);
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}
