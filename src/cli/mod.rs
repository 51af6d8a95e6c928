//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Tally - survey scoring and analytics from the command line.
#[derive(Parser)]
#[command(name = "tally")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Survey definition (JSON)
    #[arg(short, long)]
    pub survey: Option<PathBuf>,

    /// Responses collected for the survey (JSON array)
    #[arg(short, long)]
    pub responses: Option<PathBuf>,

    /// Scoring versions for trend commands (JSON array)
    #[arg(long)]
    pub versions: Option<PathBuf>,

    /// Output format (default: from config, else json)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score every response by category
    Scores,

    /// Histogram, statistics and band counts of scores
    #[command(alias = "dist")]
    Distribution(DistributionArgs),

    /// Band counts of overall scores
    Bands,

    /// Compare segments such as managers
    #[command(alias = "seg")]
    Segments(SegmentArgs),

    /// Score trend across scoring versions
    Trend,

    /// Compare two scoring versions
    #[command(alias = "diff")]
    Compare(CompareArgs),

    /// Check inputs for empty or low-confidence data
    Check(CheckArgs),

    /// Full analytics report
    Report,

    /// Print the effective configuration as TOML
    Config(ConfigArgs),
}

#[derive(Args, Default)]
pub struct DistributionArgs {
    /// Category id to analyze instead of overall scores
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args, Default)]
pub struct SegmentArgs {
    /// Metadata field to group by (overrides [segments] key_field)
    #[arg(long = "by")]
    pub key_field: Option<String>,
}

#[derive(Args, Default)]
pub struct CompareArgs {
    /// Version id of the baseline (default: first version)
    #[arg(long)]
    pub before: Option<String>,

    /// Version id to compare against the baseline (default: last version)
    #[arg(long)]
    pub after: Option<String>,
}

#[derive(Args, Default)]
pub struct CheckArgs {
    /// Also check that --versions supports a trend view
    #[arg(long)]
    pub trend: bool,
}

#[derive(Args, Default)]
pub struct ConfigArgs {
    /// Print the commented default configuration instead
    #[arg(long)]
    pub default: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[value(alias = "md")]
    Markdown,
    Text,
}

impl From<OutputFormat> for crate::output::Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => Self::Json,
            OutputFormat::Markdown => Self::Markdown,
            OutputFormat::Text => Self::Text,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
