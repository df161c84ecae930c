//! Injectable source of randomness and delay for the placeholder steps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;
use std::time::Duration;

use crate::constants::MAX_STEP_DELAY_SCALE;

/// Everything a placeholder step body may not decide by itself
#[async_trait]
pub trait Workload: Send + Sync + fmt::Debug {
    /// Real number in `[low, high]`
    fn uniform(&self, low: f64, high: f64) -> f64;

    /// Integer in `[low, high]`, both ends inclusive
    fn int_range(&self, low: u64, high: u64) -> u64;

    /// Simulated work
    async fn pause(&self, delay: Duration);

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Thread-local RNG plus real sleeps, scaled by `delay_scale`
#[derive(Debug, Clone)]
pub struct RandomWorkload {
    delay_scale: f64,
}

impl RandomWorkload {
    /// `delay_scale` is clamped to `[0, MAX_STEP_DELAY_SCALE]`; NaN disables delays
    pub fn new(delay_scale: f64) -> Self {
        let delay_scale = if delay_scale.is_nan() {
            0.0
        } else {
            delay_scale.clamp(0.0, MAX_STEP_DELAY_SCALE)
        };
        Self { delay_scale }
    }
}

impl Default for RandomWorkload {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[async_trait]
impl Workload for RandomWorkload {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if !(low < high) {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }

    fn int_range(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }

    async fn pause(&self, delay: Duration) {
        if self.delay_scale > 0.0 {
            let scaled = Duration::try_from_secs_f64(delay.as_secs_f64() * self.delay_scale)
                .unwrap_or(Duration::MAX);
            tokio::time::sleep(scaled).await;
        }
    }
}

/// Deterministic workload: every draw sits at `fraction` of its range and
/// pauses return immediately
#[derive(Debug, Clone)]
pub struct FixedWorkload {
    fraction: f64,
}

impl FixedWorkload {
    pub fn new(fraction: f64) -> Self {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        Self { fraction }
    }

    /// Every draw returns the upper bound
    pub fn upper() -> Self {
        Self::new(1.0)
    }

    /// Every draw returns the lower bound
    pub fn lower() -> Self {
        Self::new(0.0)
    }
}

#[async_trait]
impl Workload for FixedWorkload {
    fn uniform(&self, low: f64, high: f64) -> f64 {
        if self.fraction >= 1.0 {
            return high;
        }
        low + (high - low) * self.fraction
    }

    fn int_range(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        low + ((high - low) as f64 * self.fraction).round() as u64
    }

    async fn pause(&self, _delay: Duration) {}
}
