//! Segment (e.g. per-manager) aggregation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::distribution::{BandDistribution, DistributionAggregator};
use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Result};

/// Segment aggregation input for one response.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentInput {
    /// Opaque grouping key; `None` groups under the unassigned bucket.
    pub segment_key: Option<String>,
    /// Optional display name for the segment.
    pub segment_label: Option<String>,
    /// Mean of the response's category scores; `None` when unscored.
    pub overall_score: Option<f64>,
    pub completion_pct: Option<f64>,
}

/// Grouping key. Responses without a key never share a group with a real key,
/// even one spelled like the unassigned label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentKey {
    Assigned(String),
    Unassigned,
}

impl SegmentKey {
    pub fn assigned(key: impl Into<String>) -> Self {
        Self::Assigned(key.into())
    }
}

/// Aggregate view of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummary {
    /// The segment key, or the unassigned label for responses without one.
    pub key: String,
    #[serde(default)]
    pub unassigned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub respondent_count: usize,
    /// Respondents with an overall score.
    pub scored_count: usize,
    /// Full-precision mean of overall scores.
    pub avg_score: Option<f64>,
    /// `avg_score` rounded to one decimal for display.
    pub avg_score_display: Option<f64>,
    /// Mean completion percentage of respondents reporting one.
    pub completion_rate: Option<f64>,
    pub band_distribution: BandDistribution,
}

/// Groups responses by an opaque key.
#[derive(Debug, Clone)]
pub struct SegmentAggregator {
    unassigned: String,
    distribution: DistributionAggregator,
}

impl Default for SegmentAggregator {
    fn default() -> Self {
        Self::new("unassigned", DistributionAggregator::default())
    }
}

impl SegmentAggregator {
    pub fn new(unassigned: impl Into<String>, distribution: DistributionAggregator) -> Self {
        Self {
            unassigned: unassigned.into(),
            distribution,
        }
    }

    /// Per-segment summaries, unordered. Presentation order is the caller's concern.
    pub fn aggregate(&self, inputs: &[SegmentInput]) -> HashMap<SegmentKey, SegmentSummary> {
        let mut groups: HashMap<SegmentKey, Vec<&SegmentInput>> = HashMap::new();
        for input in inputs {
            let key = input
                .segment_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map_or(SegmentKey::Unassigned, SegmentKey::assigned);
            groups.entry(key).or_default().push(input);
        }

        groups
            .into_iter()
            .map(|(key, members)| {
                let summary = self.summarize(&key, &members);
                (key, summary)
            })
            .collect()
    }

    fn summarize(&self, key: &SegmentKey, members: &[&SegmentInput]) -> SegmentSummary {
        let scores: Vec<f64> = members
            .iter()
            .filter_map(|m| m.overall_score)
            .filter(|s| s.is_finite())
            .collect();
        let completions: Vec<f64> = members
            .iter()
            .filter_map(|m| m.completion_pct)
            .filter(|c| c.is_finite())
            .collect();

        let avg_score = mean(&scores);
        SegmentSummary {
            label: members.iter().find_map(|m| m.segment_label.clone()),
            key: match key {
                SegmentKey::Assigned(key) => key.clone(),
                SegmentKey::Unassigned => self.unassigned.clone(),
            },
            unassigned: *key == SegmentKey::Unassigned,
            respondent_count: members.len(),
            scored_count: scores.len(),
            avg_score,
            avg_score_display: avg_score.map(round1),
            completion_rate: mean(&completions),
            band_distribution: self.distribution.aggregate_bands(&scores),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Segment analyzer - groups responses by a metadata field.
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
        "segments"
    }

    fn description(&self) -> &'static str {
        "Compare average scores and band mix across segments such as managers"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let settings = &ctx.config.segments;
        let score_sets = ctx.score_sets()?;

        let inputs: Vec<SegmentInput> = ctx
            .responses
            .iter()
            .zip(score_sets)
            .map(|(response, set)| SegmentInput {
                segment_key: response.metadata_str(&settings.key_field),
                segment_label: response.metadata_str(&settings.label_field),
                overall_score: set.as_ref().and_then(|s| s.overall_score),
                completion_pct: response.completion_percentage,
            })
            .collect();

        let aggregator = SegmentAggregator::new(
            settings.unassigned.clone(),
            DistributionAggregator::new(ctx.config.distribution.table()?, ctx.band_resolver()),
        );
        let mut segments: Vec<SegmentSummary> = aggregator.aggregate(&inputs).into_values().collect();
        segments.sort_by(|a, b| {
            b.respondent_count
                .cmp(&a.respondent_count)
                .then_with(|| a.key.cmp(&b.key))
                .then_with(|| a.unassigned.cmp(&b.unassigned))
        });

        Ok(Analysis {
            key_field: settings.key_field.clone(),
            segments,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Metadata field the segments were keyed on.
    pub key_field: String,
    /// Segments by respondent count, descending.
    pub segments: Vec<SegmentSummary>,
}
