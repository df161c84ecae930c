//! Input requests, typed responses and the default-substitution policy.
//!
//! Default policy, applied whenever a human answer is missing or unusable:
//!
//! | input type | default |
//! |---|---|
//! | `select` | first entry of `options` |
//! | `number` | `1` |
//! | `text` | fixed placeholder ([`DEFAULT_TEXT_VALUE`]) |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::constants::{input_response_key, DEFAULT_NUMBER_VALUE, DEFAULT_TEXT_VALUE};
use crate::error::{PipelineError, Result};

/// Kind of answer a step expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Text,
    Number,
    Select,
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Select => write!(f, "select"),
        }
    }
}

/// Inclusive bounds accepted for a `number` answer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumberRange {
    pub min: f64,
    pub max: f64,
}

impl NumberRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A decision a running step needs from a human
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRequest {
    pub task_id: String,
    /// Position of this prompt among the prompts of its task, starting at 0
    #[serde(default)]
    pub sequence: u32,
    pub prompt: String,
    pub input_type: InputType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub timeout_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<NumberRange>,
}

impl InputRequest {
    pub fn text(task_id: impl Into<String>, prompt: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            task_id: task_id.into(),
            sequence: 0,
            prompt: prompt.into(),
            input_type: InputType::Text,
            options: Vec::new(),
            timeout_seconds,
            range: None,
        }
    }

    pub fn number(task_id: impl Into<String>, prompt: impl Into<String>, timeout_seconds: u64) -> Self {
        Self {
            input_type: InputType::Number,
            ..Self::text(task_id, prompt, timeout_seconds)
        }
    }

    pub fn select(
        task_id: impl Into<String>,
        prompt: impl Into<String>,
        options: Vec<String>,
        timeout_seconds: u64,
    ) -> Self {
        Self {
            input_type: InputType::Select,
            options,
            ..Self::text(task_id, prompt, timeout_seconds)
        }
    }

    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Store key an answer to this prompt must be written under
    pub fn response_key(&self) -> String {
        input_response_key(&self.task_id, self.sequence)
    }

    /// Declare the accepted range of a `number` answer
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(NumberRange { min, max });
        self
    }

    /// Options are required for `select` and forbidden otherwise
    pub fn validate(&self) -> Result<()> {
        if self.task_id.is_empty() {
            return Err(PipelineError::Validation(
                "input request requires a task id".to_string(),
            ));
        }
        match (self.input_type, self.options.is_empty()) {
            (InputType::Select, true) => Err(PipelineError::Validation(format!(
                "select request for task {} has no options",
                self.task_id
            ))),
            (InputType::Text | InputType::Number, false) => Err(PipelineError::Validation(format!(
                "{} request for task {} must not carry options",
                self.input_type, self.task_id
            ))),
            _ => Ok(()),
        }
    }

    /// Default answer for this request with the standard text placeholder
    pub fn default_value(&self) -> InputValue {
        default_value(self.input_type, &self.options)
    }

    /// Parse a stored response; `None` when it does not fit the request
    pub fn parse_answer(&self, raw: &str) -> Option<InputValue> {
        let answer = decode_stored(raw);
        match self.input_type {
            InputType::Text => Some(InputValue::Text(answer)),
            InputType::Number => parse_number(&answer)
                .filter(|n| self.range.map_or(true, |r| r.contains(*n)))
                .map(InputValue::Number),
            InputType::Select => {
                let trimmed = answer.trim();
                self.options
                    .iter()
                    .find(|option| option.as_str() == trimmed)
                    .map(|option| InputValue::Select(option.clone()))
            }
        }
    }

    /// Interpret a stored response leniently, falling back to the default
    ///
    /// `text_default` replaces the text placeholder when the text fallback is used.
    pub fn interpret(&self, raw: &str, text_default: &str) -> InputValue {
        self.parse_answer(raw)
            .unwrap_or_else(|| default_value_with(self.input_type, &self.options, text_default))
    }
}

/// A resolved answer, typed by the request it answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum InputValue {
    Text(String),
    Number(f64),
    Select(String),
}

impl InputValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) | Self::Select(s) => parse_number(s),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) | Self::Select(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }

    /// Plain JSON form folded into a step result
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) | Self::Select(s) => Value::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Default answer for an input type
pub fn default_value(input_type: InputType, options: &[String]) -> InputValue {
    default_value_with(input_type, options, DEFAULT_TEXT_VALUE)
}

/// Default answer with a caller-supplied text placeholder
pub fn default_value_with(input_type: InputType, options: &[String], text_default: &str) -> InputValue {
    match input_type {
        InputType::Select => InputValue::Select(options.first().cloned().unwrap_or_default()),
        InputType::Number => InputValue::Number(DEFAULT_NUMBER_VALUE),
        InputType::Text => InputValue::Text(text_default.to_string()),
    }
}

/// Stored responses are JSON-encoded by the control surface; raw text is accepted too
fn decode_stored(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(s)) => s,
        Ok(Value::Number(n)) => n.to_string(),
        Ok(Value::Bool(b)) => b.to_string(),
        _ => raw.to_string(),
    }
}

/// Accepts surrounding whitespace and a decimal comma
fn parse_number(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}
