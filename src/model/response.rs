//! Submitted survey responses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single answer value.
///
/// Untagged so the JSON shape decides the variant: a string, an array of
/// strings (multi-select), or anything else (numbers, booleans, objects).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Single(String),
    Multi(Vec<String>),
    Other(Value),
}

impl Answer {
    /// Numeric reading of the answer, used for scale-scored questions.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Answer::Single(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Answer::Other(Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }
}

impl From<&str> for Answer {
    fn from(value: &str) -> Self {
        Answer::Single(value.to_string())
    }
}

impl From<Vec<&str>> for Answer {
    fn from(values: Vec<&str>) -> Self {
        Answer::Multi(values.into_iter().map(str::to_string).collect())
    }
}

/// A submitted response. Read-only for the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub id: String,
    #[serde(default)]
    pub survey_id: String,
    #[serde(default)]
    pub answers: BTreeMap<String, Answer>,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,
}

impl Response {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_answer(mut self, question_id: impl Into<String>, answer: impl Into<Answer>) -> Self {
        self.answers.insert(question_id.into(), answer.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_completion(mut self, percentage: f64) -> Self {
        self.completion_percentage = Some(percentage);
        self
    }

    /// Metadata value rendered as a string; empty strings count as absent.
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
