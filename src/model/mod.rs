//! Data model consumed by the scoring engine.

mod response;
mod survey;
mod version;

use std::path::Path;

use serde::de::DeserializeOwned;

pub use response::{Answer, Response};
pub use survey::{Question, QuestionType, Scale, ScoreCategory, ScoreConfig, ScoreRange, Survey};
pub use version::ScoringVersion;

use crate::core::{Error, Result};

/// Read and deserialize a JSON document.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&content)?;
    tracing::debug!(path = %path.display(), "loaded JSON input");
    Ok(value)
}

/// Load a survey definition.
pub fn load_survey(path: impl AsRef<Path>) -> Result<Survey> {
    read_json(path)
}

/// Load a JSON array of responses.
pub fn load_responses(path: impl AsRef<Path>) -> Result<Vec<Response>> {
    read_json(path)
}

/// Load a JSON array of scoring versions.
pub fn load_versions(path: impl AsRef<Path>) -> Result<Vec<ScoringVersion>> {
    read_json(path)
}
