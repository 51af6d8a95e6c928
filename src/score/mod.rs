//! Per-response category scoring.
//!
//! A response's answers are turned into one normalized 0-100 score per
//! configured category. Missing answers are excluded from both the numerator
//! and the denominator, so an unanswered category is absent from the result
//! rather than scored zero.

pub mod band;
pub mod trend;

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Result};
use crate::model::{Answer, Question, Response, ScoreConfig, ScoreRange};

use band::BandResolver;

/// Compute a single response's category scores.
///
/// Returns `Ok(None)` when scoring is disabled, and an error when scoring is
/// enabled but the configuration is structurally invalid.
pub fn compute(
    questions: &[Question],
    answers: &BTreeMap<String, Answer>,
    config: &ScoreConfig,
) -> Result<Option<ResponseScoreSet>> {
    let calculator = CategoryScoreCalculator::new(questions, config)?;
    Ok(calculator.score_answers("", answers))
}

/// Scores responses against one survey's questions and score configuration.
pub struct CategoryScoreCalculator<'a> {
    config: &'a ScoreConfig,
    /// Scorable questions whose category exists in the configuration.
    questions: Vec<&'a Question>,
    bands: Option<BandResolver>,
}

impl<'a> CategoryScoreCalculator<'a> {
    pub fn new(questions: &'a [Question], config: &'a ScoreConfig) -> Result<Self> {
        config
            .validate(questions)
            .inspect_err(|e| warn!(error = %e, "rejected score configuration"))?;

        let mapped = questions
            .iter()
            .filter(|q| match q.category() {
                Some(category) if config.category(category).is_some() => true,
                Some(category) => {
                    debug!(question = %q.id, category, "question maps to unknown category; excluded");
                    false
                }
                None => {
                    if q.scorable {
                        debug!(question = %q.id, "scorable question has no category; excluded");
                    }
                    false
                }
            })
            .collect();

        let bands = if config.score_ranges.is_empty() {
            None
        } else {
            Some(BandResolver::new(band::BandTable::new(config.score_ranges.clone())))
        };

        Ok(Self {
            config,
            questions: mapped,
            bands,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn score_response(&self, response: &Response) -> Option<ResponseScoreSet> {
        self.score_answers(&response.id, &response.answers)
    }

    /// Score every response in parallel, preserving input order.
    pub fn score_all(&self, responses: &[Response]) -> Vec<Option<ResponseScoreSet>> {
        if !self.is_enabled() {
            return vec![None; responses.len()];
        }
        responses
            .par_iter()
            .map(|r| self.score_response(r))
            .collect()
    }

    pub fn score_answers(
        &self,
        response_id: &str,
        answers: &BTreeMap<String, Answer>,
    ) -> Option<ResponseScoreSet> {
        if !self.config.enabled {
            return None;
        }

        let mut totals: BTreeMap<&str, Tally> = BTreeMap::new();
        for question in &self.questions {
            let Some(answer) = answers.get(&question.id) else {
                continue;
            };
            let Some((raw, max)) = question_points(question, answer) else {
                debug!(response = response_id, question = %question.id, "answer not scorable; excluded");
                continue;
            };
            let Some(category) = question.category() else {
                continue;
            };
            let tally = totals.entry(category).or_default();
            tally.raw += raw * question.score_weight;
            tally.max += max * question.score_weight;
            tally.answered += 1;
        }

        let mut categories = BTreeMap::new();
        for (category_id, tally) in totals {
            let Some(normalized) = normalize(tally.raw, tally.max) else {
                debug!(response = response_id, category = category_id, "zero max score; category omitted");
                continue;
            };
            let band = self.band_for(normalized);
            let name = self
                .config
                .category(category_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            categories.insert(
                category_id.to_string(),
                CategoryScore {
                    category_id: category_id.to_string(),
                    category_name: name,
                    raw_score: tally.raw,
                    max_score: tally.max,
                    normalized_score: normalized,
                    answered_questions: tally.answered,
                    interpretation: band.and_then(|b| b.interpretation.clone()),
                    band: band.map(BandRef::from),
                },
            );
        }

        let overall_score = overall_score(&categories, self.config);
        let overall_band = overall_score
            .and_then(|s| self.band_for(s.round()))
            .map(BandRef::from);

        Some(ResponseScoreSet {
            response_id: response_id.to_string(),
            categories,
            overall_score,
            overall_band,
        })
    }

    fn band_for(&self, score: f64) -> Option<&ScoreRange> {
        self.bands.as_ref().and_then(|b| b.resolve(score))
    }
}

#[derive(Debug, Default)]
struct Tally {
    raw: f64,
    max: f64,
    answered: usize,
}

/// Unweighted `(points, max_points)` earned by one answer.
fn question_points(question: &Question, answer: &Answer) -> Option<(f64, f64)> {
    match answer {
        Answer::Single(label) => {
            let points = label_points(question, label)?;
            Some((points, question.max_single_points()?))
        }
        Answer::Multi(labels) => {
            let selected: Vec<f64> = labels
                .iter()
                .filter_map(|l| label_points(question, l))
                .collect();
            if selected.is_empty() {
                return None;
            }
            Some((selected.iter().sum(), question.max_multi_points()?))
        }
        Answer::Other(_) => {
            let value = answer.as_number()?;
            let points = question
                .option_scores
                .get(&format_number(value))
                .copied()
                .or_else(|| scale_points(question, value))?;
            Some((points, question.max_single_points()?))
        }
    }
}

fn label_points(question: &Question, label: &str) -> Option<f64> {
    if let Some(points) = question
        .option_scores
        .get(label)
        .or_else(|| question.option_scores.get(label.trim()))
    {
        return Some(*points);
    }
    label
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|v| scale_points(question, v))
}

fn scale_points(question: &Question, value: f64) -> Option<f64> {
    question
        .scale
        .filter(|s| value.is_finite() && s.contains(value))
        .map(|_| value)
}

/// Render a number the way option labels spell it ("5", not "5.0").
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// `round(100 * raw / max)` clamped to `[0, 100]`; `None` when `max` is not positive.
pub fn normalize(raw: f64, max: f64) -> Option<f64> {
    if max <= 0.0 || !raw.is_finite() || !max.is_finite() {
        return None;
    }
    Some((100.0 * raw / max).round().clamp(0.0, 100.0))
}

/// Mean of the present categories, weighted when the configuration assigns
/// category weights (a missing weight counts as 1).
fn overall_score(categories: &BTreeMap<String, CategoryScore>, config: &ScoreConfig) -> Option<f64> {
    let weighted = config.has_category_weights();
    let mut sum = 0.0;
    let mut total_weight = 0.0;
    for (id, score) in categories {
        let weight = if weighted {
            config.category(id).and_then(|c| c.weight).unwrap_or(1.0)
        } else {
            1.0
        };
        sum += score.normalized_score * weight;
        total_weight += weight;
    }
    if total_weight > 0.0 {
        Some(sum / total_weight)
    } else {
        None
    }
}

/// Band attached to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandRef {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl From<&ScoreRange> for BandRef {
    fn from(range: &ScoreRange) -> Self {
        Self {
            id: range.id.clone(),
            label: range.label.clone(),
            color: range.color.clone(),
        }
    }
}

/// One category's score within a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub category_id: String,
    pub category_name: String,
    pub raw_score: f64,
    pub max_score: f64,
    pub normalized_score: f64,
    pub answered_questions: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<BandRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
}

/// Per-response scoring output; the atomic unit of every aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseScoreSet {
    pub response_id: String,
    pub categories: BTreeMap<String, CategoryScore>,
    pub overall_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_band: Option<BandRef>,
}

impl ResponseScoreSet {
    pub fn score(&self, category_id: &str) -> Option<f64> {
        self.categories.get(category_id).map(|c| c.normalized_score)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Score analyzer - scores every response in the context.
#[derive(Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "scores"
    }

    fn description(&self) -> &'static str {
        "Compute normalized category scores for each response"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let score_sets = ctx.score_sets()?;
        let scored: Vec<ResponseScoreSet> = score_sets
            .iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .cloned()
            .collect();

        let mut category_counts: BTreeMap<String, usize> = BTreeMap::new();
        for set in &scored {
            for id in set.categories.keys() {
                *category_counts.entry(id.clone()).or_default() += 1;
            }
        }

        Ok(Analysis {
            scoring_enabled: ctx.survey.score_config.enabled,
            summary: AnalysisSummary {
                total_responses: ctx.responses.len(),
                scored_responses: scored.len(),
                category_counts,
            },
            responses: scored,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub scoring_enabled: bool,
    pub summary: AnalysisSummary,
    pub responses: Vec<ResponseScoreSet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_responses: usize,
    pub scored_responses: usize,
    /// Number of responses with a score in each category.
    pub category_counts: BTreeMap<String, usize>,
}
