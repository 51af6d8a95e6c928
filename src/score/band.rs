//! Score band resolution.
//!
//! Bands are inclusive, integer-bounded score ranges. A well-formed band set
//! is ordered, non-overlapping and covers `[0, 100]` with each range starting
//! one point above the previous range's maximum.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::model::ScoreRange;

pub const CRITICAL: &str = "critical";
pub const NEEDS_IMPROVEMENT: &str = "needs-improvement";
pub const DEVELOPING: &str = "developing";
pub const EFFECTIVE: &str = "effective";
pub const HIGHLY_EFFECTIVE: &str = "highly-effective";

/// Lower bounds of the canonical bands, in ascending order.
const CANONICAL_FLOORS: [f64; 5] = [0.0, 40.0, 55.0, 70.0, 85.0];

static CANONICAL: Lazy<BandTable> = Lazy::new(|| {
    BandTable::new(vec![
        ScoreRange::new(CRITICAL, 0.0, 39.0, "Critical")
            .with_color("#dc2626")
            .with_interpretation("Significant problems that need immediate attention."),
        ScoreRange::new(NEEDS_IMPROVEMENT, 40.0, 54.0, "Needs Improvement")
            .with_color("#f97316")
            .with_interpretation("Below expectations; targeted support recommended."),
        ScoreRange::new(DEVELOPING, 55.0, 69.0, "Developing")
            .with_color("#eab308")
            .with_interpretation("Progressing, with clear room to grow."),
        ScoreRange::new(EFFECTIVE, 70.0, 84.0, "Effective")
            .with_color("#22c55e")
            .with_interpretation("Consistently meeting expectations."),
        ScoreRange::new(HIGHLY_EFFECTIVE, 85.0, 100.0, "Highly Effective")
            .with_color("#059669")
            .with_interpretation("Exceeding expectations across the board."),
    ])
});

/// Immutable, ordered set of bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandTable {
    ranges: Vec<ScoreRange>,
}

impl BandTable {
    pub fn new(ranges: Vec<ScoreRange>) -> Self {
        Self { ranges }
    }

    /// Critical / Needs Improvement / Developing / Effective / Highly Effective
    /// at 0-39 / 40-54 / 55-69 / 70-84 / 85-100.
    pub fn canonical() -> Self {
        CANONICAL.clone()
    }

    pub fn ranges(&self) -> &[ScoreRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }
}

impl Default for BandTable {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Maps scores onto the bands of an injected [`BandTable`].
#[derive(Debug, Clone, Default)]
pub struct BandResolver {
    table: BandTable,
}

impl BandResolver {
    pub fn new(table: BandTable) -> Self {
        Self { table }
    }

    /// Resolver for a survey: its own ranges when it defines any, otherwise `fallback`.
    pub fn for_ranges(ranges: &[ScoreRange], fallback: &BandTable) -> Self {
        if ranges.is_empty() {
            Self::new(fallback.clone())
        } else {
            Self::new(BandTable::new(ranges.to_vec()))
        }
    }

    pub fn table(&self) -> &BandTable {
        &self.table
    }

    pub fn resolve(&self, score: f64) -> Option<&ScoreRange> {
        resolve(score, self.table.ranges())
    }

    /// Position of the matching band within the table.
    pub fn resolve_index(&self, score: f64) -> Option<usize> {
        if !score.is_finite() {
            return None;
        }
        self.table.ranges().iter().position(|r| r.contains(score))
    }
}

/// First range with `min <= score <= max`, or `None` when nothing matches.
///
/// Ranges are scanned in the order given; malformed sets are not repaired.
pub fn resolve(score: f64, ranges: &[ScoreRange]) -> Option<&ScoreRange> {
    if !score.is_finite() {
        return None;
    }
    ranges.iter().find(|r| r.contains(score))
}

/// Canonical band index (0 = Critical .. 4 = Highly Effective) for a score in `[0, 100]`.
pub fn canonical_index(score: f64) -> Option<usize> {
    if !score.is_finite() || !(0.0..=100.0).contains(&score) {
        return None;
    }
    CANONICAL_FLOORS.iter().rposition(|floor| score >= *floor)
}

/// Check that `ranges` are ordered, contiguous and cover `[0, 100]`.
pub fn check_coverage(ranges: &[ScoreRange]) -> Result<()> {
    let (first, last) = match (ranges.first(), ranges.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(Error::invalid_score_config("no score ranges defined")),
    };

    for range in ranges {
        if range.id.trim().is_empty() {
            return Err(Error::invalid_score_config("score range id is empty"));
        }
        if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
            return Err(Error::invalid_score_config(format!(
                "score range {} has min {} above max {}",
                range.id, range.min, range.max
            )));
        }
    }

    if first.min != 0.0 {
        return Err(Error::invalid_score_config(format!(
            "score ranges start at {} instead of 0",
            first.min
        )));
    }
    if last.max != 100.0 {
        return Err(Error::invalid_score_config(format!(
            "score ranges end at {} instead of 100",
            last.max
        )));
    }

    for pair in ranges.windows(2) {
        let expected = pair[0].max + 1.0;
        if pair[1].min != expected {
            let kind = if pair[1].min < expected {
                "overlaps"
            } else {
                "leaves a gap after"
            };
            return Err(Error::invalid_score_config(format!(
                "score range {} {} {}",
                pair[1].id, kind, pair[0].id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_table_is_contiguous() {
        let table = BandTable::canonical();
        assert_eq!(table.len(), 5);
        assert!(check_coverage(table.ranges()).is_ok());
    }

    #[test]
    fn test_resolve_boundaries() {
        let table = BandTable::canonical();
        let id = |score: f64| resolve(score, table.ranges()).map(|r| r.id.as_str());
        assert_eq!(id(0.0), Some(CRITICAL));
        assert_eq!(id(39.0), Some(CRITICAL));
        assert_eq!(id(40.0), Some(NEEDS_IMPROVEMENT));
        assert_eq!(id(54.0), Some(NEEDS_IMPROVEMENT));
        assert_eq!(id(55.0), Some(DEVELOPING));
        assert_eq!(id(70.0), Some(EFFECTIVE));
        assert_eq!(id(84.0), Some(EFFECTIVE));
        assert_eq!(id(85.0), Some(HIGHLY_EFFECTIVE));
        assert_eq!(id(100.0), Some(HIGHLY_EFFECTIVE));
    }

    #[test]
    fn test_resolve_out_of_range_and_empty() {
        let table = BandTable::canonical();
        assert!(resolve(-1.0, table.ranges()).is_none());
        assert!(resolve(101.0, table.ranges()).is_none());
        assert!(resolve(f64::NAN, table.ranges()).is_none());
        assert!(resolve(50.0, &[]).is_none());
    }

    #[test]
    fn test_resolve_first_match_wins_on_overlap() {
        let ranges = vec![
            ScoreRange::new("a", 0.0, 60.0, "A"),
            ScoreRange::new("b", 50.0, 100.0, "B"),
        ];
        assert_eq!(resolve(55.0, &ranges).unwrap().id, "a");
    }

    #[test]
    fn test_canonical_index() {
        assert_eq!(canonical_index(0.0), Some(0));
        assert_eq!(canonical_index(39.0), Some(0));
        assert_eq!(canonical_index(39.5), Some(0));
        assert_eq!(canonical_index(40.0), Some(1));
        assert_eq!(canonical_index(69.0), Some(2));
        assert_eq!(canonical_index(84.9), Some(3));
        assert_eq!(canonical_index(85.0), Some(4));
        assert_eq!(canonical_index(100.0), Some(4));
        assert_eq!(canonical_index(100.5), None);
        assert_eq!(canonical_index(-0.1), None);
    }

    #[test]
    fn test_resolver_index_uses_injected_table() {
        let resolver = BandResolver::new(BandTable::new(vec![
            ScoreRange::new("low", 0.0, 49.0, "Low"),
            ScoreRange::new("high", 50.0, 100.0, "High"),
        ]));
        assert_eq!(resolver.resolve_index(49.0), Some(0));
        assert_eq!(resolver.resolve_index(50.0), Some(1));
        assert_eq!(resolver.resolve(75.0).unwrap().label, "High");
    }

    #[test]
    fn test_for_ranges_falls_back() {
        let fallback = BandTable::canonical();
        let resolver = BandResolver::for_ranges(&[], &fallback);
        assert_eq!(resolver.table().len(), 5);

        let custom = vec![ScoreRange::new("all", 0.0, 100.0, "All")];
        let resolver = BandResolver::for_ranges(&custom, &fallback);
        assert_eq!(resolver.table().len(), 1);
    }

    #[test]
    fn test_check_coverage_errors() {
        assert!(check_coverage(&[]).is_err());

        let overlap = vec![
            ScoreRange::new("a", 0.0, 50.0, "A"),
            ScoreRange::new("b", 50.0, 100.0, "B"),
        ];
        let err = check_coverage(&overlap).unwrap_err().to_string();
        assert!(err.contains("overlaps"), "{err}");

        let gap = vec![
            ScoreRange::new("a", 0.0, 40.0, "A"),
            ScoreRange::new("b", 45.0, 100.0, "B"),
        ];
        let err = check_coverage(&gap).unwrap_err().to_string();
        assert!(err.contains("gap"), "{err}");

        let short = vec![ScoreRange::new("a", 0.0, 90.0, "A")];
        assert!(check_coverage(&short).is_err());

        let inverted = vec![ScoreRange::new("a", 100.0, 0.0, "A")];
        assert!(check_coverage(&inverted).is_err());
    }
}
