//! Full analytics payload for a survey.
//!
//! Runs every aggregation against one [`AnalysisContext`] so responses are
//! scored once and shared.

mod cache;

pub use cache::AnalyticsCache;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyzers::confidence::{self, Warning};
use crate::analyzers::{distribution, segment};
use crate::core::{AnalysisContext, Analyzer, Result};
use crate::model::ScoringVersion;
use crate::score::trend::{self, TrendAnalysis};
use crate::score::{self, AnalysisSummary};

/// Everything the analytics view needs in one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub survey_id: String,
    pub generated_at: DateTime<Utc>,
    pub scoring_enabled: bool,
    pub summary: AnalysisSummary,
    /// Distribution of overall response scores.
    pub distribution: distribution::Analysis,
    /// Distribution of each configured category's scores.
    pub category_distributions: BTreeMap<String, distribution::Analysis>,
    pub segments: segment::Analysis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendAnalysis>,
    /// Sorted by severity, errors first.
    pub warnings: Vec<Warning>,
}

/// Build the report. `versions` adds the trend view when given.
pub fn build_report(ctx: &AnalysisContext<'_>, versions: Option<&[ScoringVersion]>) -> Result<AnalyticsReport> {
    let scores = score::Analyzer::new().analyze(ctx)?;
    let overall = distribution::Analyzer::new().analyze(ctx)?;

    let mut category_distributions = BTreeMap::new();
    for category in &ctx.survey.score_config.categories {
        let analysis = distribution::Analyzer::for_category(category.id.clone()).analyze(ctx)?;
        category_distributions.insert(category.id.clone(), analysis);
    }

    let segments = segment::Analyzer::new().analyze(ctx)?;

    let trend = versions
        .map(|v| trend::analyze_trend(ctx.survey, v, ctx.config))
        .transpose()?;

    let guard = match versions {
        Some(v) => confidence::Analyzer::with_versions(v.len()),
        None => confidence::Analyzer::new(),
    };
    let warnings = guard.analyze(ctx)?.warnings;

    info!(
        survey = %ctx.survey.id,
        responses = scores.summary.total_responses,
        scored = scores.summary.scored_responses,
        warnings = warnings.len(),
        "built analytics report"
    );

    Ok(AnalyticsReport {
        survey_id: ctx.survey.id.clone(),
        generated_at: Utc::now(),
        scoring_enabled: scores.scoring_enabled,
        summary: scores.summary,
        distribution: overall,
        category_distributions,
        segments,
        trend,
        warnings,
    })
}
