//! Tally CLI - survey scoring and analytics.

use std::io::stdout;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tally::analyzers::confidence::{self, Severity, Warning};
use tally::analyzers::{distribution, segment};
use tally::cli::{Cli, Command};
use tally::config::Config;
use tally::core::{AnalysisContext, Analyzer, Error, Result};
use tally::model::{self, Response, ScoringVersion, Survey};
use tally::output::Format;
use tally::report;
use tally::score::{self, trend};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_default(".")?,
    };

    let format = match cli.format {
        Some(format) => Format::from(format),
        None => Format::from(config.output.format),
    };

    match &cli.command {
        Command::Config(args) => {
            if args.default {
                print!("{}", Config::default_toml());
            } else {
                print!("{}", config.to_toml()?);
            }
        }
        Command::Trend => {
            let survey = load_survey(&cli.survey)?;
            let versions = load_versions(&cli.versions)?;
            warn_single_version(&survey, &versions, &config);
            let analysis = trend::analyze_trend(&survey, &versions, &config)?;
            format.format(&analysis, &mut stdout())?;
        }
        Command::Compare(args) => {
            let survey = load_survey(&cli.survey)?;
            let versions = load_versions(&cli.versions)?;
            let aggregator = trend::TrendAggregator::from_config(&config.trend);
            let summary = aggregator.summarize(&survey.questions, &versions)?;
            let comparison =
                aggregator.compare_in(&summary, args.before.as_deref(), args.after.as_deref())?;
            format.format(&comparison, &mut stdout())?;
        }
        command => {
            if let Command::Segments(args) = command {
                if let Some(field) = &args.key_field {
                    config.segments.key_field = field.clone();
                }
            }
            let survey = load_survey(&cli.survey)?;
            let responses = load_responses(&cli.responses)?;
            let ctx = AnalysisContext::new(&survey, &responses, &config);
            run_command(command, &cli, &ctx, format)?;
        }
    }

    Ok(())
}

fn run_command(command: &Command, cli: &Cli, ctx: &AnalysisContext<'_>, format: Format) -> Result<()> {
    match command {
        Command::Scores => {
            print_warnings(&confidence::Analyzer::new().analyze(ctx)?.warnings);
            run_analyzer(score::Analyzer::new(), ctx, format)
        }
        Command::Distribution(args) => {
            print_warnings(&confidence::Analyzer::new().analyze(ctx)?.warnings);
            match &args.category {
                Some(category) => {
                    if ctx.survey.score_config.category(category).is_none() {
                        return Err(Error::invalid_argument(format!("unknown category: {category}")));
                    }
                    run_analyzer(distribution::Analyzer::for_category(category.clone()), ctx, format)
                }
                None => run_analyzer(distribution::Analyzer::new(), ctx, format),
            }
        }
        Command::Bands => {
            print_warnings(&confidence::Analyzer::new().analyze(ctx)?.warnings);
            let analysis = distribution::Analyzer::new().analyze(ctx)?;
            format.format(&analysis.band_distribution, &mut stdout())
        }
        Command::Segments(_) => {
            print_warnings(&confidence::Analyzer::new().analyze(ctx)?.warnings);
            run_analyzer(segment::Analyzer::new(), ctx, format)
        }
        Command::Check(args) => {
            let analyzer = if args.trend {
                let versions = load_versions(&cli.versions)?;
                confidence::Analyzer::with_versions(versions.len())
            } else {
                confidence::Analyzer::new()
            };
            run_analyzer(analyzer, ctx, format)
        }
        Command::Report => {
            let versions = match &cli.versions {
                Some(path) => Some(model::load_versions(path)?),
                None => None,
            };
            let report = report::build_report(ctx, versions.as_deref())?;
            print_warnings(&report.warnings);
            format.format(&report, &mut stdout())
        }
        Command::Trend | Command::Compare(_) | Command::Config(_) => Ok(()),
    }
}

fn run_analyzer<A: Analyzer>(analyzer: A, ctx: &AnalysisContext<'_>, format: Format) -> Result<()> {
    tracing::debug!(analyzer = analyzer.name(), description = analyzer.description(), "running analyzer");
    let result = analyzer.analyze(ctx)?;
    format.format(&result, &mut stdout())?;
    Ok(())
}

fn require<'a>(path: &'a Option<PathBuf>, flag: &str) -> Result<&'a Path> {
    path.as_deref()
        .ok_or_else(|| Error::invalid_argument(format!("{flag} <PATH> is required for this command")))
}

fn load_survey(path: &Option<PathBuf>) -> Result<Survey> {
    model::load_survey(require(path, "--survey")?)
}

fn load_responses(path: &Option<PathBuf>) -> Result<Vec<Response>> {
    model::load_responses(require(path, "--responses")?)
}

fn load_versions(path: &Option<PathBuf>) -> Result<Vec<ScoringVersion>> {
    model::load_versions(require(path, "--versions")?)
}

fn warn_single_version(survey: &Survey, versions: &[ScoringVersion], config: &Config) {
    let responses: usize = versions.iter().map(|v| v.responses.len()).sum();
    let check = confidence::CheckContext::new(survey, responses).with_versions(versions.len());
    let guard = confidence::ConfidenceGuard::new(config.confidence.low_response_threshold);
    let mut warnings = guard.check(&check);
    confidence::sort_by_severity(&mut warnings);
    print_warnings(&warnings);
}

/// Warnings go to stderr so stdout stays a clean payload.
fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        let tag = match warning.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Info => "info".cyan(),
        };
        eprintln!("{tag}: {}", warning.message);
    }
}
