//! Tally - survey scoring and analytics aggregation.
//!
//! Turns raw survey responses into normalized per-category scores, qualitative
//! bands, distributions, segment comparisons and version-over-version trends.
//! Everything is recomputed from `(responses, survey questions, score config)`
//! on each request; no computed score is persisted.
//!
//! # Example
//!
//! ```no_run
//! use tally::analyzers::segment::Analyzer as SegmentAnalyzer;
//! use tally::config::Config;
//! use tally::core::{AnalysisContext, Analyzer};
//! use tally::model::{load_responses, load_survey};
//!
//! let config = Config::default();
//! let survey = load_survey("survey.json").unwrap();
//! let responses = load_responses("responses.json").unwrap();
//! let ctx = AnalysisContext::new(&survey, &responses, &config);
//! let result = SegmentAnalyzer::new().analyze(&ctx).unwrap();
//! println!("Found {} segments", result.segments.len());
//! ```

pub mod analyzers;
pub mod cli;
pub mod config;
pub mod core;
pub mod model;
pub mod output;
pub mod report;
pub mod score;

pub use core::{AnalysisContext, Analyzer, Error, Result};
pub use score::{compute, CategoryScoreCalculator, ResponseScoreSet};
