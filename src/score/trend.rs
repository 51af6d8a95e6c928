//! Score trends across scoring versions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, TrendConfig};
use crate::core::{Error, Result};
use crate::model::{Question, ScoringVersion, Survey};

use super::CategoryScoreCalculator;

/// How versions are ordered before building a trend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendOrdering {
    /// By explicit version number; unnumbered versions go last.
    #[default]
    Sequence,
    /// By creation timestamp; undated versions go last.
    CreatedAt,
    /// Keep the caller's order.
    AsGiven,
}

/// Direction of a single category's change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

/// Overall before/after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallTrend {
    /// Only improvements.
    Positive,
    /// Only declines.
    Negative,
    /// Both improvements and declines, regardless of their balance.
    Mixed,
    /// Nothing moved beyond epsilon.
    Stable,
}

/// Averages for one scoring version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionPoint {
    pub version_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub response_count: usize,
    pub scored_count: usize,
    /// Mean normalized score per category, over responses scored in it.
    pub category_scores: BTreeMap<String, f64>,
    pub overall_score: Option<f64>,
}

/// Least-squares fit over version index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionStats {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub trends: Vec<VersionPoint>,
    pub has_multiple_versions: bool,
    pub start_score: Option<f64>,
    pub end_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_regression: Option<RegressionStats>,
    #[serde(default)]
    pub category_regressions: BTreeMap<String, RegressionStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryChange {
    pub category_id: String,
    pub before: Option<f64>,
    pub after: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub improved: usize,
    pub declined: usize,
    pub stable: usize,
    /// Categories missing on either side.
    pub unavailable: usize,
    pub overall_change: Option<f64>,
    pub overall: OverallTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub before_version: String,
    pub after_version: String,
    pub per_category: Vec<CategoryChange>,
    pub summary: ComparisonSummary,
}

/// Trend view of a survey: time series plus first-vs-last comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub summary: TrendSummary,
    /// Absent with fewer than two versions.
    pub comparison: Option<Comparison>,
}

/// Builds version points and compares them.
#[derive(Debug, Clone, Default)]
pub struct TrendAggregator {
    epsilon: f64,
    ordering: TrendOrdering,
}

impl TrendAggregator {
    pub fn new(epsilon: f64, ordering: TrendOrdering) -> Self {
        Self {
            epsilon: epsilon.abs(),
            ordering,
        }
    }

    pub fn from_config(config: &TrendConfig) -> Self {
        Self::new(config.epsilon, config.ordering)
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Versions in trend order. Ties keep the caller's order.
    pub fn order<'v>(&self, versions: &'v [ScoringVersion]) -> Vec<&'v ScoringVersion> {
        let mut ordered: Vec<&ScoringVersion> = versions.iter().collect();
        match self.ordering {
            TrendOrdering::Sequence => {
                ordered.sort_by_key(|v| (v.sequence.is_none(), v.sequence));
            }
            TrendOrdering::CreatedAt => {
                ordered.sort_by_key(|v| (v.created_at.is_none(), v.created_at));
            }
            TrendOrdering::AsGiven => {}
        }
        ordered
    }

    /// Score one version's responses under its own configuration snapshot.
    pub fn point(&self, questions: &[Question], version: &ScoringVersion) -> Result<VersionPoint> {
        let calculator = CategoryScoreCalculator::new(questions, &version.score_config)?;
        let sets = calculator.score_all(&version.responses);

        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        let mut overall = Vec::new();
        let mut scored_count = 0;
        for set in sets.iter().flatten().filter(|s| !s.is_empty()) {
            scored_count += 1;
            for (id, score) in &set.categories {
                let entry = sums.entry(id.clone()).or_insert((0.0, 0));
                entry.0 += score.normalized_score;
                entry.1 += 1;
            }
            if let Some(score) = set.overall_score {
                overall.push(score);
            }
        }

        let category_scores = sums
            .into_iter()
            .map(|(id, (sum, n))| (id, sum / n as f64))
            .collect();
        let overall_score = if overall.is_empty() {
            None
        } else {
            Some(overall.iter().sum::<f64>() / overall.len() as f64)
        };

        Ok(VersionPoint {
            version_id: version.id.clone(),
            label: version.label.clone(),
            response_count: version.responses.len(),
            scored_count,
            category_scores,
            overall_score,
        })
    }

    /// One point per version, in trend order.
    pub fn summarize(&self, questions: &[Question], versions: &[ScoringVersion]) -> Result<TrendSummary> {
        let trends = self
            .order(versions)
            .into_iter()
            .map(|v| self.point(questions, v))
            .collect::<Result<Vec<_>>>()?;

        let has_multiple_versions = trends.len() >= 2;
        let overall_values = indexed_values(&trends, |p| p.overall_score);
        let overall_regression = if has_multiple_versions && overall_values.len() >= 2 {
            Some(calculate_linear_regression(&overall_values))
        } else {
            None
        };
        let category_regressions = if has_multiple_versions {
            calculate_category_trends(&trends)
        } else {
            BTreeMap::new()
        };

        debug!(versions = trends.len(), "summarized trend");
        Ok(TrendSummary {
            start_score: trends.first().and_then(|p| p.overall_score),
            end_score: trends.last().and_then(|p| p.overall_score),
            trends,
            has_multiple_versions,
            overall_regression,
            category_regressions,
        })
    }

    pub fn classify(&self, change: f64) -> TrendDirection {
        if change > self.epsilon {
            TrendDirection::Up
        } else if change < -self.epsilon {
            TrendDirection::Down
        } else {
            TrendDirection::Neutral
        }
    }

    /// Per-category before/after deltas and an overall classification.
    pub fn compare(&self, before: &VersionPoint, after: &VersionPoint) -> Comparison {
        let categories: BTreeSet<&String> = before
            .category_scores
            .keys()
            .chain(after.category_scores.keys())
            .collect();

        let mut per_category = Vec::with_capacity(categories.len());
        let (mut improved, mut declined, mut stable, mut unavailable) = (0, 0, 0, 0);
        for id in categories {
            let b = before.category_scores.get(id).copied();
            let a = after.category_scores.get(id).copied();
            let change = match (b, a) {
                (Some(b), Some(a)) => Some(a - b),
                _ => None,
            };
            let change_percent = match (change, b) {
                (Some(change), Some(b)) if b != 0.0 => Some(change / b * 100.0),
                _ => None,
            };
            let direction = match change {
                Some(change) => self.classify(change),
                None => TrendDirection::Neutral,
            };
            match (change, direction) {
                (None, _) => unavailable += 1,
                (Some(_), TrendDirection::Up) => improved += 1,
                (Some(_), TrendDirection::Down) => declined += 1,
                (Some(_), TrendDirection::Neutral) => stable += 1,
            }
            per_category.push(CategoryChange {
                category_id: id.clone(),
                before: b,
                after: a,
                change,
                change_percent,
                direction,
            });
        }

        let overall_change = match (before.overall_score, after.overall_score) {
            (Some(b), Some(a)) => Some(a - b),
            _ => None,
        };

        Comparison {
            before_version: before.version_id.clone(),
            after_version: after.version_id.clone(),
            per_category,
            summary: ComparisonSummary {
                improved,
                declined,
                stable,
                unavailable,
                overall_change,
                overall: classify_overall(improved, declined),
            },
        }
    }

    /// Compare two points of a summary by version id; defaults to first vs last.
    pub fn compare_in(
        &self,
        summary: &TrendSummary,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Comparison> {
        if !summary.has_multiple_versions {
            return Err(Error::insufficient_data(format!(
                "comparison needs at least 2 versions, got {}",
                summary.trends.len()
            )));
        }
        let find = |id: Option<&str>, fallback: Option<&VersionPoint>| -> Result<VersionPoint> {
            match id {
                Some(id) => summary
                    .trends
                    .iter()
                    .find(|p| p.version_id == id)
                    .cloned()
                    .ok_or_else(|| Error::invalid_argument(format!("unknown version: {id}"))),
                None => fallback
                    .cloned()
                    .ok_or_else(|| Error::insufficient_data("no versions")),
            }
        };
        let before = find(before, summary.trends.first())?;
        let after = find(after, summary.trends.last())?;
        if before.version_id == after.version_id {
            return Err(Error::invalid_argument(format!(
                "cannot compare version {} with itself",
                before.version_id
            )));
        }
        Ok(self.compare(&before, &after))
    }
}

/// "Mixed" whenever both improvements and declines exist.
fn classify_overall(improved: usize, declined: usize) -> OverallTrend {
    match (improved, declined) {
        (0, 0) => OverallTrend::Stable,
        (_, 0) => OverallTrend::Positive,
        (0, _) => OverallTrend::Negative,
        _ => OverallTrend::Mixed,
    }
}

/// Analyze score trends across a survey's scoring versions.
pub fn analyze_trend(survey: &Survey, versions: &[ScoringVersion], config: &Config) -> Result<TrendAnalysis> {
    let aggregator = TrendAggregator::from_config(&config.trend);
    let summary = aggregator.summarize(&survey.questions, versions)?;
    let comparison = if summary.has_multiple_versions {
        Some(aggregator.compare_in(&summary, None, None)?)
    } else {
        None
    };
    Ok(TrendAnalysis {
        summary,
        comparison,
    })
}

/// Least-squares fit over `(x, y)` points, x being the version index.
fn calculate_linear_regression(points: &[(f64, f64)]) -> RegressionStats {
    if points.len() < 2 {
        return RegressionStats {
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
        };
    }

    let n = points.len() as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut ss_tot = 0.0;
    for (x, y) in points {
        let x_diff = x - x_mean;
        let y_diff = y - y_mean;
        numerator += x_diff * y_diff;
        denominator += x_diff * x_diff;
        ss_tot += y_diff * y_diff;
    }

    let slope = if denominator != 0.0 {
        numerator / denominator
    } else {
        0.0
    };
    let intercept = y_mean - slope * x_mean;

    let ss_res: f64 = points
        .iter()
        .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    let r_squared = if ss_tot != 0.0 {
        1.0 - (ss_res / ss_tot)
    } else {
        0.0
    };

    RegressionStats {
        slope,
        intercept,
        r_squared,
    }
}

/// Points for the versions that have a value, keyed by their position in the trend.
fn indexed_values(points: &[VersionPoint], value: impl Fn(&VersionPoint) -> Option<f64>) -> Vec<(f64, f64)> {
    points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| value(p).map(|v| (i as f64, v)))
        .collect()
}

/// Regression per category, for categories present in at least two points.
fn calculate_category_trends(points: &[VersionPoint]) -> BTreeMap<String, RegressionStats> {
    let names: BTreeSet<&String> = points.iter().flat_map(|p| p.category_scores.keys()).collect();
    names
        .into_iter()
        .filter_map(|name| {
            let values = indexed_values(points, |p| p.category_scores.get(name).copied());
            (values.len() >= 2).then(|| (name.clone(), calculate_linear_regression(&values)))
        })
        .collect()
}
