//! # Orchestration Types
//!
//! Run identity, per-step context and the open result map threaded from one
//! step into the next.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One end-to-end execution of the step chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub total_steps: u32,
    pub created_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn new(total_steps: u32) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            total_steps,
            created_at: Utc::now(),
        }
    }
}

/// Identity of a single step invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepContext {
    pub run_id: Uuid,
    /// 1-based position in the chain
    pub step_index: u32,
    pub total_steps: u32,
    pub step_name: String,
    /// Correlates this invocation with the queue and the input gate
    pub task_id: Uuid,
}

impl StepContext {
    pub fn is_last(&self) -> bool {
        self.step_index >= self.total_steps
    }
}

/// Open key/value payload produced by a step
///
/// Readers never fail on a missing key: the `*_or` accessors return the
/// caller's documented default instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepResult(Map<String, Value>);

impl StepResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; non-objects are stored under `"value"`
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            Value::Null => Self::default(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Self(map)
            }
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get_str_or(&self, key: &str, default: &str) -> String {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// Numbers and numeric strings are both accepted
    pub fn get_f64_or(&self, key: &str, default: f64) -> f64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn get_u64_or(&self, key: &str, default: u64) -> u64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .unwrap_or(default),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Prior result plus `additions`; additions win on key collisions
    pub fn merged_with(mut self, additions: &StepResult) -> Self {
        for (key, value) in &additions.0 {
            self.0.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for StepResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors_tolerate_absence_and_type_drift() {
        let result = StepResult::from_value(json!({
            "data_size": 100,
            "quality_factor": "0.8",
            "processing_type": "Детальная обработка",
            "includes_charts": false
        }));

        assert_eq!(result.get_u64_or("data_size", 0), 100);
        assert_eq!(result.get_f64_or("quality_factor", 1.0), 0.8);
        assert_eq!(result.get_f64_or("missing", 1.0), 1.0);
        assert_eq!(result.get_str_or("processing_type", "x"), "Детальная обработка");
        assert_eq!(result.get_str_or("analysis_method", "default"), "default");
        assert!(!result.get_bool_or("includes_charts", true));
    }

    #[test]
    fn test_merge_keeps_prior_keys_and_adds_new_ones() {
        let prior = StepResult::new().with("data_size", 100).with("status", "prepared");
        let additions = StepResult::new().with("processed", 85).with("status", "processed");

        let merged = prior.merged_with(&additions);

        assert_eq!(merged.get("data_size"), Some(&json!(100)));
        assert_eq!(merged.get("processed"), Some(&json!(85)));
        assert_eq!(merged.get("status"), Some(&json!("processed")));
    }

    #[test]
    fn test_from_value_wraps_scalars() {
        assert_eq!(StepResult::from_value(json!(5)).get("value"), Some(&json!(5)));
        assert!(StepResult::from_value(Value::Null).is_empty());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let result = StepResult::new().with("a", 1);
        assert_eq!(serde_json::to_value(&result).unwrap(), json!({"a": 1}));
    }
}
