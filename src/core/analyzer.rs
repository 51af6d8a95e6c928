//! Analyzer trait and the context shared by all aggregations.

use once_cell::sync::OnceCell;
use serde::Serialize;

use super::Result;
use crate::config::Config;
use crate::model::{Response, Survey};
use crate::score::band::BandResolver;
use crate::score::{CategoryScoreCalculator, ResponseScoreSet};

/// Trait implemented by every analytics view.
pub trait Analyzer: Send + Sync {
    /// The payload produced by this analyzer.
    type Output: Serialize + Send;

    /// Unique identifier for this analyzer.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Run analysis and return results.
    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output>;
}

/// Inputs of one analytics request.
///
/// Per-response score sets are computed on first use and shared by every
/// analyzer run against the same context.
pub struct AnalysisContext<'a> {
    /// Survey definition (questions + score configuration).
    pub survey: &'a Survey,
    /// Responses collected for the survey.
    pub responses: &'a [Response],
    /// Engine configuration.
    pub config: &'a Config,
    score_sets: OnceCell<Vec<Option<ResponseScoreSet>>>,
}

impl<'a> AnalysisContext<'a> {
    /// Create a new analysis context.
    pub fn new(survey: &'a Survey, responses: &'a [Response], config: &'a Config) -> Self {
        Self {
            survey,
            responses,
            config,
            score_sets: OnceCell::new(),
        }
    }

    /// Score sets aligned with `responses`; `None` entries mean scoring is disabled.
    pub fn score_sets(&self) -> Result<&[Option<ResponseScoreSet>]> {
        let sets = self.score_sets.get_or_try_init(|| {
            let calculator =
                CategoryScoreCalculator::new(&self.survey.questions, &self.survey.score_config)?;
            let sets = calculator.score_all(self.responses);
            tracing::debug!(
                survey = %self.survey.id,
                responses = self.responses.len(),
                "scored responses"
            );
            Ok::<_, super::Error>(sets)
        })?;
        Ok(sets)
    }

    /// Score sets that carry at least one category score.
    pub fn scored(&self) -> Result<impl Iterator<Item = &ResponseScoreSet> + '_> {
        Ok(self.score_sets()?.iter().flatten().filter(|s| !s.is_empty()))
    }

    /// Band resolver for aggregations: the survey's ranges, or the configured default table.
    pub fn band_resolver(&self) -> BandResolver {
        BandResolver::for_ranges(
            &self.survey.score_config.score_ranges,
            &self.config.bands.table(),
        )
    }
}
