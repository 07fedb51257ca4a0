//! Error types for augur-plot.

use std::path::PathBuf;

/// Errors from rendering and writing charts.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Returned when a result has nothing to draw.
    #[error("nothing to plot for {chart}")]
    EmptyResult {
        /// Which chart was empty.
        chart: &'static str,
    },

    /// Returned when the image size is not positive and finite.
    #[error("invalid dimensions {width_in}x{height_in} in at {dpi} dpi")]
    InvalidDimensions {
        /// Width in inches.
        width_in: f64,
        /// Height in inches.
        height_in: f64,
        /// Dots per inch.
        dpi: f64,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create directory {path}")]
    CreateDir {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the image file cannot be written.
    #[error("cannot write image {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
