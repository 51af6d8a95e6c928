//! Configuration loading and management.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::analyzers::distribution::{BucketSpec, BucketTable};
use crate::core::{Error, Result};
use crate::model::ScoreRange;
use crate::score::band::BandTable;
use crate::score::trend::TrendOrdering;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default band table for surveys without custom score ranges.
    pub bands: BandsConfig,
    /// Histogram buckets.
    pub distribution: DistributionConfig,
    /// Segment grouping.
    pub segments: SegmentsConfig,
    /// Trend comparison.
    pub trend: TrendConfig,
    /// Confidence warnings.
    pub confidence: ConfidenceConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Use this for explicit `--config` flags.
    /// Env vars with `TALLY_` prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed("TALLY_").split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Load configuration from directory, looking for tally.toml or .tally/tally.toml.
    ///
    /// Missing files are silently skipped (defaults are used).
    /// Env vars with `TALLY_` prefix override file/default values.
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("tally.toml")))
            .merge(Toml::file(dir.join(".tally/tally.toml")))
            .merge(Env::prefixed("TALLY_").split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        if !self.bands.ranges.is_empty() {
            crate::score::band::check_coverage(&self.bands.ranges)
                .map_err(|e| Error::config(format!("[bands] {e}")))?;
        }
        self.distribution.table()?;
        if !self.trend.epsilon.is_finite() || self.trend.epsilon < 0.0 {
            return Err(Error::config(format!(
                "[trend] epsilon must be a non-negative number, got {}",
                self.trend.epsilon
            )));
        }
        if self.segments.unassigned.trim().is_empty() {
            return Err(Error::config("[segments] unassigned label is empty"));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Create default config file content.
    pub fn default_toml() -> &'static str {
        include_str!("default_config.toml")
    }
}

/// Default band table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandsConfig {
    pub ranges: Vec<ScoreRange>,
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            ranges: BandTable::canonical().ranges().to_vec(),
        }
    }
}

impl BandsConfig {
    pub fn table(&self) -> BandTable {
        BandTable::new(self.ranges.clone())
    }
}

/// Histogram bucket configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    pub buckets: Vec<BucketSpec>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            buckets: BucketTable::default().buckets().to_vec(),
        }
    }
}

impl DistributionConfig {
    pub fn table(&self) -> Result<BucketTable> {
        BucketTable::new(self.buckets.clone()).map_err(|e| Error::config(format!("[distribution] {e}")))
    }
}

/// Segment grouping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentsConfig {
    /// Response metadata field holding the segment key.
    pub key_field: String,
    /// Response metadata field holding a display name for the segment.
    pub label_field: String,
    /// Key used for responses without a segment.
    pub unassigned: String,
}

impl Default for SegmentsConfig {
    fn default() -> Self {
        Self {
            key_field: "managerId".to_string(),
            label_field: "managerName".to_string(),
            unassigned: "unassigned".to_string(),
        }
    }
}

/// Trend comparison configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Changes within `[-epsilon, epsilon]` are neutral.
    pub epsilon: f64,
    /// How versions are ordered before comparison.
    pub ordering: TrendOrdering,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.0,
            ordering: TrendOrdering::Sequence,
        }
    }
}

/// Confidence warning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Response counts below this are flagged as low confidence.
    pub low_response_threshold: usize,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            low_response_threshold: 5,
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format.
    #[default]
    Json,
    /// Markdown format.
    Markdown,
    /// Human-readable text.
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(format!("Unknown format: {s}. Use 'text', 'json', or 'md'")),
        }
    }
}
