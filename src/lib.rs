//! Random-forest regression with model-agnostic interpretation reports.
//!
//! The [`Pipeline`] loads a delimited file, filters and splits it, tunes a
//! random forest by cross-validated grid search, explains the model on the
//! held-out rows with six interpretation methods and renders each result
//! to SVG. Everything is driven by a [`PipelineConfig`].

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use error::{PipelineError, Stage};
pub use pipeline::{
    ExplainOutcome, Interpretation, Pipeline, Prepared, RunOutcome, TestScore, TrainingReport,
    TuneOutcome,
};
