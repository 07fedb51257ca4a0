//! JSON artifact writer and output path layout.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::domain::ExperimentName;
use crate::error::WriteError;

/// Writes result artifacts into one output directory.
///
/// Creates the output directory on construction if it does not exist.
/// Artifact files are named `{experiment}_{suffix}`.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, WriteError> {
        fs::create_dir_all(output_dir).map_err(|e| WriteError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Serialize `value` as pretty JSON to `{experiment}_{name}.json` and
    /// return the written path. Overwrites an existing file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`WriteError::Serialize`] | `value` cannot be encoded |
    /// | [`WriteError::WriteFile`] | the file cannot be written |
    #[instrument(skip(self, value))]
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf, WriteError> {
        let path = self.artifact_path(&format!("{name}.json"));
        let json = serde_json::to_string_pretty(value).map_err(|e| WriteError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| WriteError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), size_bytes = json.len(), "artifact written");
        Ok(path)
    }

    /// Return `{output_dir}/{experiment}_{file_name}` without writing anything.
    #[must_use]
    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{file_name}", self.experiment.as_str()))
    }

    /// Return the path where the model binary should be saved.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.artifact_path("model.bin")
    }

    /// Return the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Return the experiment name.
    #[must_use]
    pub fn experiment(&self) -> &ExperimentName {
        &self.experiment
    }
}
