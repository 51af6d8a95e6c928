//! Scoring versions: a score configuration snapshot plus the responses
//! collected under it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Response, ScoreConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringVersion {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Explicit version number supplied by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub score_config: ScoreConfig,
    #[serde(default)]
    pub responses: Vec<Response>,
}

impl ScoringVersion {
    pub fn new(id: impl Into<String>, score_config: ScoreConfig, responses: Vec<Response>) -> Self {
        Self {
            id: id.into(),
            score_config,
            responses,
            ..Self::default()
        }
    }

    pub fn with_sequence(mut self, sequence: i64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
