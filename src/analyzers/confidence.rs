//! Degenerate-data detection.
//!
//! Empty response sets, missing categories and single-version trends are not
//! errors. They produce warnings so consumers can render an empty state
//! instead of a chart full of zeros.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Result};
use crate::model::Survey;

/// Warning severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Display rank; errors first.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Error => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Machine-readable warning kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningCode {
    NoResponses,
    ScoringDisabled,
    NoCategories,
    UnmappedCategory,
    UnknownCategory,
    NoScoreRanges,
    SingleVersion,
    LowResponseCount,
    NoScoredResponses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub severity: Severity,
    pub message: String,
}

impl Warning {
    fn new(code: WarningCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
        }
    }
}

/// What the guard inspects.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub survey: &'a Survey,
    pub response_count: usize,
    /// Responses with at least one category score, when scoring has run.
    pub scored_count: Option<usize>,
    /// Number of scoring versions, when a trend view is requested.
    pub version_count: Option<usize>,
}

impl<'a> CheckContext<'a> {
    pub fn new(survey: &'a Survey, response_count: usize) -> Self {
        Self {
            survey,
            response_count,
            scored_count: None,
            version_count: None,
        }
    }

    pub fn with_scored(mut self, scored_count: usize) -> Self {
        self.scored_count = Some(scored_count);
        self
    }

    pub fn with_versions(mut self, version_count: usize) -> Self {
        self.version_count = Some(version_count);
        self
    }
}

/// Inspects inputs for conditions that make analytics misleading.
#[derive(Debug, Clone)]
pub struct ConfidenceGuard {
    low_response_threshold: usize,
}

impl Default for ConfidenceGuard {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ConfidenceGuard {
    pub fn new(low_response_threshold: usize) -> Self {
        Self {
            low_response_threshold,
        }
    }

    /// One warning per condition found, in detection order.
    pub fn check(&self, ctx: &CheckContext<'_>) -> Vec<Warning> {
        let mut warnings = Vec::new();
        let config = &ctx.survey.score_config;

        if ctx.response_count == 0 {
            warnings.push(Warning::new(
                WarningCode::NoResponses,
                Severity::Warning,
                "No responses have been collected yet",
            ));
        } else if ctx.response_count < self.low_response_threshold {
            warnings.push(Warning::new(
                WarningCode::LowResponseCount,
                Severity::Warning,
                format!(
                    "Only {} responses; results below {} responses are low confidence",
                    ctx.response_count, self.low_response_threshold
                ),
            ));
        }

        if let Some(versions) = ctx.version_count {
            if versions < 2 {
                warnings.push(Warning::new(
                    WarningCode::SingleVersion,
                    Severity::Info,
                    format!("Trends need at least 2 scoring versions, found {versions}"),
                ));
            }
        }

        if !config.enabled {
            warnings.push(Warning::new(
                WarningCode::ScoringDisabled,
                Severity::Warning,
                "Scoring is disabled for this survey; no scoring data is available",
            ));
            return warnings;
        }

        if config.categories.is_empty() {
            warnings.push(Warning::new(
                WarningCode::NoCategories,
                Severity::Error,
                "Scoring is enabled but no categories are configured",
            ));
        }

        let mapped: BTreeSet<&str> = ctx
            .survey
            .questions
            .iter()
            .filter_map(|q| q.category())
            .collect();
        for category in &config.categories {
            if !mapped.contains(category.id.as_str()) {
                warnings.push(Warning::new(
                    WarningCode::UnmappedCategory,
                    Severity::Warning,
                    format!("Category '{}' has no questions mapped to it", category.id),
                ));
            }
        }
        for id in mapped.iter().filter(|id| config.category(id).is_none()) {
            warnings.push(Warning::new(
                WarningCode::UnknownCategory,
                Severity::Info,
                format!("Questions reference unknown category '{id}' and are ignored"),
            ));
        }

        if !config.categories.is_empty() && config.score_ranges.is_empty() {
            warnings.push(Warning::new(
                WarningCode::NoScoreRanges,
                Severity::Info,
                "No score ranges defined; the default band table is used",
            ));
        }

        if ctx.response_count > 0 && ctx.scored_count == Some(0) {
            warnings.push(Warning::new(
                WarningCode::NoScoredResponses,
                Severity::Warning,
                "No response answered any scorable question",
            ));
        }

        warnings
    }
}

/// Sort errors first, keeping detection order within a severity.
pub fn sort_by_severity(warnings: &mut [Warning]) {
    warnings.sort_by_key(|w| w.severity.rank());
}

/// Confidence analyzer - reports degenerate-data warnings for the context.
#[derive(Default)]
pub struct Analyzer {
    version_count: Option<usize>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also check that a trend view has enough versions.
    pub fn with_versions(version_count: usize) -> Self {
        Self {
            version_count: Some(version_count),
        }
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "confidence"
    }

    fn description(&self) -> &'static str {
        "Flag empty, unscored or low-volume data before it is charted"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let mut check = CheckContext::new(ctx.survey, ctx.responses.len())
            .with_scored(ctx.scored()?.count());
        check.version_count = self.version_count;

        let guard = ConfidenceGuard::new(ctx.config.confidence.low_response_threshold);
        let mut warnings = guard.check(&check);
        sort_by_severity(&mut warnings);

        Ok(Analysis {
            errors: warnings.iter().filter(|w| w.severity == Severity::Error).count(),
            warnings,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub errors: usize,
    /// Sorted by severity, errors first.
    pub warnings: Vec<Warning>,
}
