//! Pipeline errors, tagged with the stage that failed.

use std::path::PathBuf;

use augur_interpret::InterpretError;
use augur_io::{DataError, LoadError, WriteError};
use augur_plot::RenderError;
use augur_rf::RfError;

use crate::config::ConfigError;

/// The pipeline stage an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Configuration parsing and validation.
    Config,
    /// Reading the input file or a saved model.
    Load,
    /// Column and row filtering.
    Filter,
    /// Train/test partition and feature matrix extraction.
    Split,
    /// Cross-validated grid search and the final fit.
    Train,
    /// One of the interpretation methods.
    Interpret {
        /// Method name.
        method: &'static str,
    },
    /// Image export.
    Render,
    /// Writing JSON and model artifacts.
    Write,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Config => f.write_str("config"),
            Stage::Load => f.write_str("load"),
            Stage::Filter => f.write_str("filter"),
            Stage::Split => f.write_str("split"),
            Stage::Train => f.write_str("train"),
            Stage::Interpret { method } => write!(f, "interpret ({method})"),
            Stage::Render => f.write_str("render"),
            Stage::Write => f.write_str("write"),
        }
    }
}

/// Any failure that aborts a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Invalid or unreadable configuration.
    #[error("configuration error")]
    Config {
        #[from]
        source: ConfigError,
    },

    /// The input file could not be loaded.
    #[error("load stage failed")]
    Load {
        #[from]
        source: LoadError,
    },

    /// A saved model could not be read.
    #[error("cannot load model {path}")]
    ModelLoad {
        /// Model file.
        path: PathBuf,
        /// Underlying error.
        source: RfError,
    },

    /// A saved model was trained on different feature columns.
    #[error("model expects features {expected:?}, data has {got:?}")]
    ModelFeatures {
        /// Feature names stored in the model.
        expected: Vec<String>,
        /// Feature names of the filtered data.
        got: Vec<String>,
    },

    /// Filtering failed or left nothing to model.
    #[error("filter stage failed")]
    Filter {
        /// Underlying error.
        source: DataError,
    },

    /// The split or the feature matrix could not be built.
    #[error("split stage failed")]
    Split {
        /// Underlying error.
        source: DataError,
    },

    /// Grid search or the final fit failed.
    #[error("training stage failed")]
    Train {
        #[from]
        source: RfError,
    },

    /// An interpretation method failed.
    #[error("interpretation failed in {method}")]
    Interpret {
        /// Method name.
        method: &'static str,
        /// Underlying error.
        source: InterpretError,
    },

    /// A plot could not be rendered or written.
    #[error("render stage failed")]
    Render {
        #[from]
        source: RenderError,
    },

    /// A JSON artifact could not be written.
    #[error("cannot write results")]
    Write {
        #[from]
        source: WriteError,
    },

    /// The model file could not be written.
    #[error("cannot save model {path}")]
    ModelSave {
        /// Model file.
        path: PathBuf,
        /// Underlying error.
        source: RfError,
    },
}

impl PipelineError {
    /// The stage this error aborted.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Config { .. } => Stage::Config,
            PipelineError::Load { .. }
            | PipelineError::ModelLoad { .. }
            | PipelineError::ModelFeatures { .. } => Stage::Load,
            PipelineError::Filter { .. } => Stage::Filter,
            PipelineError::Split { .. } => Stage::Split,
            PipelineError::Train { .. } => Stage::Train,
            PipelineError::Interpret { method, .. } => Stage::Interpret { method: *method },
            PipelineError::Render { .. } => Stage::Render,
            PipelineError::Write { .. } | PipelineError::ModelSave { .. } => Stage::Write,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_named() {
        let err = PipelineError::from(ConfigError::EmptyGrid);
        assert_eq!(err.stage(), Stage::Config);

        let err = PipelineError::Filter {
            source: DataError::NoColumnsAfterFilter,
        };
        assert_eq!(err.stage().to_string(), "filter");

        let err = PipelineError::Interpret {
            method: "ale",
            source: InterpretError::EmptyData,
        };
        assert_eq!(err.stage(), Stage::Interpret { method: "ale" });
        assert_eq!(err.stage().to_string(), "interpret (ale)");

        let err = PipelineError::from(RfError::EmptyGrid);
        assert_eq!(err.stage(), Stage::Train);
    }
}
