//! Score distributions: histogram buckets, band counts and summary statistics.

use serde::{Deserialize, Serialize};

use crate::core::{AnalysisContext, Analyzer as AnalyzerTrait, Error, Result};
use crate::score::band::{BandResolver, BandTable};

/// One histogram bucket. Buckets own their upper bound; the first bucket also
/// owns its lower bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub label: String,
    pub min: f64,
    pub max: f64,
}

impl BucketSpec {
    pub fn new(label: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            label: label.into(),
            min,
            max,
        }
    }
}

/// Ordered histogram bucket boundaries.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketTable {
    buckets: Vec<BucketSpec>,
}

impl Default for BucketTable {
    fn default() -> Self {
        Self {
            buckets: vec![
                BucketSpec::new("0-20", 0.0, 20.0),
                BucketSpec::new("21-40", 21.0, 40.0),
                BucketSpec::new("41-60", 41.0, 60.0),
                BucketSpec::new("61-80", 61.0, 80.0),
                BucketSpec::new("81-100", 81.0, 100.0),
            ],
        }
    }
}

impl BucketTable {
    pub fn new(buckets: Vec<BucketSpec>) -> Result<Self> {
        if buckets.is_empty() {
            return Err(Error::config("at least one bucket is required"));
        }
        for bucket in &buckets {
            if !(bucket.min.is_finite() && bucket.max.is_finite()) || bucket.min > bucket.max {
                return Err(Error::config(format!(
                    "bucket {} has min {} above max {}",
                    bucket.label, bucket.min, bucket.max
                )));
            }
        }
        if buckets.windows(2).any(|w| w[1].max <= w[0].max) {
            return Err(Error::config("bucket upper bounds must be strictly ascending"));
        }
        Ok(Self { buckets })
    }

    pub fn buckets(&self) -> &[BucketSpec] {
        &self.buckets
    }

    /// Index of the bucket owning `score`. Scores outside the table land in
    /// the nearest edge bucket.
    pub fn index_of(&self, score: f64) -> usize {
        self.buckets
            .iter()
            .position(|b| score <= b.max)
            .unwrap_or(self.buckets.len() - 1)
    }
}

/// Count and share of one histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCount {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    pub percentage: f64,
}

/// Summary statistics. `std_dev` is the sample standard deviation (n - 1)
/// and is omitted for a single score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: Option<f64>,
}

/// Histogram plus statistics. `is_empty` distinguishes "no data" from a
/// dataset that happens to fall entirely in one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub is_empty: bool,
    pub total: usize,
    pub buckets: Vec<BucketCount>,
    pub statistics: Option<Statistics>,
}

impl Distribution {
    pub fn empty() -> Self {
        Self {
            is_empty: true,
            total: 0,
            buckets: Vec::new(),
            statistics: None,
        }
    }
}

/// Count and share of one band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandCount {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub count: usize,
    pub percentage: f64,
}

/// Band counts in table order, zero-count bands included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandDistribution {
    pub is_empty: bool,
    /// Scores that resolved to a band.
    pub total: usize,
    /// Scores that matched no band.
    pub unresolved: usize,
    pub bands: Vec<BandCount>,
}

impl BandDistribution {
    pub fn empty() -> Self {
        Self {
            is_empty: true,
            total: 0,
            unresolved: 0,
            bands: Vec::new(),
        }
    }

    /// Count for a band id (zero when absent).
    pub fn count(&self, band_id: &str) -> usize {
        self.bands
            .iter()
            .find(|b| b.id == band_id)
            .map(|b| b.count)
            .unwrap_or(0)
    }
}

/// Buckets scores into an injected histogram table and band table.
#[derive(Debug, Clone, Default)]
pub struct DistributionAggregator {
    buckets: BucketTable,
    bands: BandResolver,
}

impl DistributionAggregator {
    pub fn new(buckets: BucketTable, bands: BandResolver) -> Self {
        Self { buckets, bands }
    }

    pub fn with_bands(bands: BandTable) -> Self {
        Self::new(BucketTable::default(), BandResolver::new(bands))
    }

    /// Histogram and statistics. Non-finite scores are ignored.
    pub fn aggregate(&self, scores: &[f64]) -> Distribution {
        let scores = finite(scores);
        if scores.is_empty() {
            return Distribution::empty();
        }

        let mut counts = vec![0usize; self.buckets.buckets().len()];
        for score in &scores {
            counts[self.buckets.index_of(*score)] += 1;
        }
        let percentages = allocate_percentages(&counts);

        let buckets = self
            .buckets
            .buckets()
            .iter()
            .zip(counts.iter().zip(percentages))
            .map(|(bucket, (&count, percentage))| BucketCount {
                label: bucket.label.clone(),
                min: bucket.min,
                max: bucket.max,
                count,
                percentage,
            })
            .collect();

        Distribution {
            is_empty: false,
            total: scores.len(),
            buckets,
            statistics: statistics(&scores),
        }
    }

    /// Band counts. Scores are rounded to the nearest point before lookup
    /// because bands are integer-bounded.
    pub fn aggregate_bands(&self, scores: &[f64]) -> BandDistribution {
        let scores = finite(scores);
        if scores.is_empty() {
            return BandDistribution::empty();
        }

        let ranges = self.bands.table().ranges();
        let mut counts = vec![0usize; ranges.len()];
        let mut unresolved = 0;
        for score in &scores {
            match self.bands.resolve_index(score.round()) {
                Some(i) => counts[i] += 1,
                None => unresolved += 1,
            }
        }
        let percentages = allocate_percentages(&counts);

        let bands = ranges
            .iter()
            .zip(counts.iter().zip(percentages))
            .map(|(range, (&count, percentage))| BandCount {
                id: range.id.clone(),
                label: range.label.clone(),
                color: range.color.clone(),
                count,
                percentage,
            })
            .collect();

        BandDistribution {
            is_empty: false,
            total: counts.iter().sum(),
            unresolved,
            bands,
        }
    }
}

fn finite(scores: &[f64]) -> Vec<f64> {
    scores.iter().copied().filter(|s| s.is_finite()).collect()
}

/// Min, max, mean, median and sample standard deviation; `None` for no scores.
pub fn statistics(scores: &[f64]) -> Option<Statistics> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let std_dev = if n > 1 {
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Some(variance.sqrt())
    } else {
        None
    };

    Some(Statistics {
        count: n,
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        median,
        std_dev,
    })
}

/// Whole-number percentages that sum to exactly 100 (largest remainder
/// method, ties to the earlier entry). All zeros when the counts sum to zero.
pub fn allocate_percentages(counts: &[usize]) -> Vec<f64> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0.0; counts.len()];
    }

    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * 100.0 / total as f64)
        .collect();
    let mut result: Vec<f64> = exact.iter().map(|e| e.floor()).collect();
    let assigned: f64 = result.iter().sum();
    let mut remaining = (100.0 - assigned).round() as usize;

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - result[a];
        let rb = exact[b] - result[b];
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for i in order {
        if remaining == 0 {
            break;
        }
        if exact[i] > result[i] {
            result[i] += 1.0;
            remaining -= 1;
        }
    }
    result
}

/// Distribution analyzer - overall or single-category score distribution.
#[derive(Default)]
pub struct Analyzer {
    category: Option<String>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
        }
    }
}

impl AnalyzerTrait for Analyzer {
    type Output = Analysis;

    fn name(&self) -> &'static str {
        "distribution"
    }

    fn description(&self) -> &'static str {
        "Bucket scores into a histogram and band counts with summary statistics"
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Self::Output> {
        let aggregator =
            DistributionAggregator::new(ctx.config.distribution.table()?, ctx.band_resolver());

        let scores: Vec<f64> = match &self.category {
            Some(category) => ctx.scored()?.filter_map(|s| s.score(category)).collect(),
            None => ctx.scored()?.filter_map(|s| s.overall_score).collect(),
        };

        Ok(Analysis {
            scope: self.category.clone().unwrap_or_else(|| "overall".to_string()),
            distribution: aggregator.aggregate(&scores),
            band_distribution: aggregator.aggregate_bands(&scores),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// "overall" or a category id.
    pub scope: String,
    pub distribution: Distribution,
    pub band_distribution: BandDistribution,
}
