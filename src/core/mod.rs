//! Core types and traits for survey analytics.

mod analyzer;
mod error;

pub use analyzer::{AnalysisContext, Analyzer};
pub use error::{Error, Result};
