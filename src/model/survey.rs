//! Survey definitions and scoring configuration.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::score::band;

/// Question kind as authored in the survey builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    Likert,
    Rating,
    MultipleChoice,
    Checkbox,
    Dropdown,
    Text,
    Textarea,
    Nps,
    #[default]
    #[serde(other)]
    Other,
}

/// Numeric scale for questions answered with a number rather than a label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
}

impl Scale {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

fn default_weight() -> f64 {
    1.0
}

/// A single survey question.
///
/// Reverse scoring has no flag of its own: a negatively framed question simply
/// maps "Strongly Agree" to the lowest value in `option_scores`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type", default)]
    pub question_type: QuestionType,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub scorable: bool,
    #[serde(default)]
    pub scoring_category: Option<String>,
    #[serde(default = "default_weight")]
    pub score_weight: f64,
    #[serde(default)]
    pub option_scores: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Scale>,
}

impl Question {
    /// Create an unscored question.
    pub fn new(id: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            id: id.into(),
            question_type,
            text: String::new(),
            scorable: false,
            scoring_category: None,
            score_weight: default_weight(),
            option_scores: BTreeMap::new(),
            scale: None,
        }
    }

    /// Mark the question as scorable under `category` using an option-to-points map.
    pub fn scored<I, S>(mut self, category: impl Into<String>, option_scores: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        self.scorable = true;
        self.scoring_category = Some(category.into());
        self.option_scores = option_scores
            .into_iter()
            .map(|(label, points)| (label.into(), points))
            .collect();
        self
    }

    /// Mark the question as scorable under `category` using a numeric scale.
    pub fn scaled(mut self, category: impl Into<String>, min: f64, max: f64) -> Self {
        self.scorable = true;
        self.scoring_category = Some(category.into());
        self.scale = Some(Scale { min, max });
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.score_weight = weight;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// The scoring category, if the question is scorable and names a non-empty one.
    pub fn category(&self) -> Option<&str> {
        if !self.scorable {
            return None;
        }
        self.scoring_category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// Highest point value a single selected answer can earn (before weighting).
    pub fn max_single_points(&self) -> Option<f64> {
        if !self.option_scores.is_empty() {
            self.option_scores
                .values()
                .copied()
                .filter(|v| v.is_finite())
                .reduce(f64::max)
        } else {
            self.scale.map(|s| s.max)
        }
    }

    /// Highest point total a multi-select answer can earn: every positively
    /// scored option selected at once.
    pub fn max_multi_points(&self) -> Option<f64> {
        if self.option_scores.is_empty() {
            return self.scale.map(|s| s.max);
        }
        Some(
            self.option_scores
                .values()
                .filter(|v| v.is_finite() && **v > 0.0)
                .sum(),
        )
    }
}

/// A named scoring dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCategory {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Relative weight of this category in a response's overall score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl ScoreCategory {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// A qualitative band covering an inclusive score range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRange {
    pub id: String,
    pub min: f64,
    pub max: f64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

impl ScoreRange {
    pub fn new(id: impl Into<String>, min: f64, max: f64, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            min,
            max,
            label: label.into(),
            color: None,
            interpretation: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_interpretation(mut self, text: impl Into<String>) -> Self {
        self.interpretation = Some(text.into());
        self
    }

    /// Whether `score` lies within `[min, max]`.
    pub fn contains(&self, score: f64) -> bool {
        score >= self.min && score <= self.max
    }
}

/// Survey-level scoring configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreConfig {
    pub enabled: bool,
    pub categories: Vec<ScoreCategory>,
    pub score_ranges: Vec<ScoreRange>,
}

impl ScoreConfig {
    pub fn category(&self, id: &str) -> Option<&ScoreCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Whether any category carries an explicit weight.
    pub fn has_category_weights(&self) -> bool {
        self.categories.iter().any(|c| c.weight.is_some())
    }

    /// Reject structurally invalid configurations.
    ///
    /// A disabled configuration is never validated. Questions naming an
    /// unknown category are not an error; they are excluded during scoring.
    pub fn validate(&self, questions: &[Question]) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            if category.id.trim().is_empty() {
                return Err(Error::invalid_score_config("category id is empty"));
            }
            if !seen.insert(category.id.as_str()) {
                return Err(Error::invalid_score_config(format!(
                    "duplicate category id: {}",
                    category.id
                )));
            }
            if let Some(weight) = category.weight {
                if !weight.is_finite() || weight < 0.0 {
                    return Err(Error::invalid_score_config(format!(
                        "category {} has invalid weight {}",
                        category.id, weight
                    )));
                }
            }
        }

        for question in questions.iter().filter(|q| q.scorable) {
            if !question.score_weight.is_finite() || question.score_weight <= 0.0 {
                return Err(Error::invalid_score_config(format!(
                    "question {} has non-positive weight {}",
                    question.id, question.score_weight
                )));
            }
            if let Some(scale) = question.scale {
                if !(scale.min.is_finite() && scale.max.is_finite()) || scale.min > scale.max {
                    return Err(Error::invalid_score_config(format!(
                        "question {} has invalid scale {}..{}",
                        question.id, scale.min, scale.max
                    )));
                }
            }
        }

        if !self.score_ranges.is_empty() {
            band::check_coverage(&self.score_ranges)?;
        }

        Ok(())
    }
}

/// A survey as seen by the scoring engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub score_config: ScoreConfig,
}

impl Survey {
    pub fn new(id: impl Into<String>, questions: Vec<Question>, score_config: ScoreConfig) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            questions,
            score_config,
        }
    }

    /// Scorable questions mapped to `category_id`.
    pub fn questions_in(&self, category_id: &str) -> impl Iterator<Item = &Question> + '_ {
        let category_id = category_id.to_string();
        self.questions
            .iter()
            .filter(move |q| q.category() == Some(category_id.as_str()))
    }
}
