//! Stage orchestration: load, filter, split, train, interpret, render.
//!
//! Stages run strictly in order and the first error aborts the run. Runs
//! are not transactional: artifacts written before a failure stay on disk,
//! and the abort is logged at `warn` when that happens.

use std::path::{Path, PathBuf};

use augur_interpret::{
    FeatureEffect, FeatureImportance, InteractionStrength, LocalExplanation, Method, Model,
    Predictor, TreeSurrogate,
};
use augur_io::{FeatureMatrix, FilterReport, ResultWriter};
use augur_plot::{IntoChart, PlotFile};
use augur_rf::{
    GridScore, HyperParams, OobScore, RandomForest, RankedFeature, mean_squared_error, r2_score,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;

/// Filtered and split data, ready for training.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Rows in the input file.
    pub n_rows_loaded: usize,
    /// What the filter removed.
    pub filter: FilterReport,
    /// Training rows.
    pub train: FeatureMatrix,
    /// Held-out rows the model is explained on.
    pub test: FeatureMatrix,
}

/// Held-out performance of the final model.
#[derive(Debug, Clone, Serialize)]
pub struct TestScore {
    /// Mean squared error.
    pub mse: f64,
    /// Coefficient of determination.
    pub r2: f64,
    /// Number of held-out rows.
    pub n_samples: usize,
}

/// Everything the training stage produced, written as `{experiment}_training.json`.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Experiment name.
    pub experiment: String,
    /// Outcome column.
    pub outcome: String,
    /// Rows in the input file.
    pub n_rows_loaded: usize,
    /// Training rows.
    pub n_train: usize,
    /// Held-out rows.
    pub n_test: usize,
    /// Model features, in column order.
    pub feature_names: Vec<String>,
    /// What the filter removed.
    pub filter: FilterReport,
    /// Cross-validated score of every grid point, in grid order.
    pub grid: Vec<GridScore>,
    /// Position of the selected point in `grid`.
    pub best_index: usize,
    /// The selected hyperparameters.
    pub best_params: HyperParams,
    /// Trees in the final model.
    pub n_trees: usize,
    /// Out-of-bag score of the final model.
    pub oob: Option<OobScore>,
    /// Held-out score of the final model.
    pub test: TestScore,
    /// Impurity-based importances of the final model.
    pub mdi_importances: Vec<RankedFeature>,
}

/// The six interpretation results, written as `{experiment}_interpretation.json`.
#[derive(Debug, Clone, Serialize)]
pub struct Interpretation {
    pub importance: FeatureImportance,
    pub interaction: InteractionStrength,
    pub pdp_ice: FeatureEffect,
    pub ale: FeatureEffect,
    pub surrogate: TreeSurrogate,
    pub lime: LocalExplanation,
}

/// Result of [`Pipeline::tune`].
#[derive(Debug)]
pub struct TuneOutcome {
    /// The final model.
    pub forest: RandomForest,
    /// The training report.
    pub report: TrainingReport,
    /// Written training JSON.
    pub report_path: PathBuf,
    /// Written model file.
    pub model_path: PathBuf,
}

/// Result of [`Pipeline::run`].
#[derive(Debug)]
pub struct RunOutcome {
    /// Training stage output.
    pub tune: TuneOutcome,
    /// Interpretation results.
    pub interpretation: Interpretation,
    /// Written interpretation JSON.
    pub interpretation_path: PathBuf,
    /// Written images, in [`PlotFile::ALL`] order.
    pub plots: Vec<PathBuf>,
}

/// Result of [`Pipeline::explain`].
#[derive(Debug)]
pub struct ExplainOutcome {
    /// Interpretation results.
    pub interpretation: Interpretation,
    /// Written interpretation JSON.
    pub interpretation_path: PathBuf,
    /// Written images, in [`PlotFile::ALL`] order.
    pub plots: Vec<PathBuf>,
}

/// A configured pipeline bound to one output directory.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    writer: ResultWriter,
}

impl Pipeline {
    /// Validate the configuration and create the output directory.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Config`] for invalid settings and
    /// [`PipelineError::Write`] when the output directory cannot be created.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let writer = ResultWriter::new(&config.output.dir, config.experiment()?)?;
        Ok(Self { config, writer })
    }

    /// Load, filter and split the input, then extract both feature matrices.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PipelineError::Config`] | no data path configured |
    /// | [`PipelineError::Load`] | the file cannot be read or parsed |
    /// | [`PipelineError::Filter`] | no rows or no columns remain |
    /// | [`PipelineError::Split`] | bad outcome column or an empty side |
    #[instrument(skip_all)]
    pub fn prepare(&self) -> Result<Prepared, PipelineError> {
        let path = self.config.data_path()?;
        let dataset = self.config.reader(path).read()?;
        info!(
            path = %path.display(),
            rows = dataset.n_rows(),
            columns = dataset.n_columns(),
            "dataset loaded"
        );

        let (filtered, filter) = self
            .config
            .feature_filter()
            .apply(&dataset)
            .map_err(|source| PipelineError::Filter { source })?;
        info!(
            rows = filtered.n_rows(),
            columns = filtered.n_columns(),
            dropped_columns = filter.dropped_columns.len(),
            removed_rows = filter.removed_rows.len(),
            "filter complete"
        );

        let outcome = self.config.split.outcome.as_str();
        let split = self
            .config
            .splitter()
            .and_then(|splitter| splitter.split(&filtered))
            .map_err(|source| PipelineError::Split { source })?;
        let train = split
            .train
            .feature_matrix(outcome)
            .map_err(|source| PipelineError::Split { source })?;
        let test = split
            .test
            .feature_matrix(outcome)
            .map_err(|source| PipelineError::Split { source })?;
        info!(
            n_train = train.rows.len(),
            n_test = test.rows.len(),
            n_features = train.feature_names.len(),
            "split complete"
        );

        Ok(Prepared {
            n_rows_loaded: dataset.n_rows(),
            filter,
            train,
            test,
        })
    }

    /// Grid-search the forest on the training rows and score it on the test rows.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Train`] for any forest error.
    #[instrument(skip_all, fields(grid_size = self.config.training.grid.len()))]
    pub fn train(&self, prepared: &Prepared) -> Result<(RandomForest, TrainingReport), PipelineError> {
        let train = &prepared.train;
        let search = self
            .config
            .grid_search()?
            .fit(&train.rows, &train.targets, &train.feature_names)?;

        let model = search.model();
        let predictions = model.forest().predict_batch(&prepared.test.rows)?;
        let test = TestScore {
            mse: mean_squared_error(&prepared.test.targets, &predictions),
            r2: r2_score(&prepared.test.targets, &predictions),
            n_samples: predictions.len(),
        };
        info!(
            best = %search.best_params(),
            test_mse = test.mse,
            test_r2 = test.r2,
            "training complete"
        );

        let report = TrainingReport {
            experiment: self.writer.experiment().as_str().to_string(),
            outcome: self.config.split.outcome.clone(),
            n_rows_loaded: prepared.n_rows_loaded,
            n_train: train.rows.len(),
            n_test: prepared.test.rows.len(),
            feature_names: train.feature_names.clone(),
            filter: prepared.filter.clone(),
            grid: search.scores().to_vec(),
            best_index: search.best_index(),
            best_params: search.best_params(),
            n_trees: model.metadata().n_trees,
            oob: model.oob_score().cloned(),
            test,
            mdi_importances: model.importances().to_vec(),
        };
        Ok((search.into_model().into_forest(), report))
    }

    /// Run the six interpretation methods on the held-out rows.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Interpret`] naming the failing method.
    #[instrument(skip_all, fields(n_rows = data.rows.len()))]
    pub fn interpret<M: Model>(
        &self,
        model: M,
        data: &FeatureMatrix,
    ) -> Result<Interpretation, PipelineError> {
        let predictor = Predictor::new(
            model,
            data.feature_names.clone(),
            data.rows.clone(),
            data.targets.clone(),
        )
        .map_err(|source| PipelineError::Interpret {
            method: "predictor",
            source,
        })?;

        let importance = evaluate(&self.config.permutation_importance(), &predictor)?;
        let interaction = evaluate(&self.config.interaction(), &predictor)?;
        let pdp_ice = evaluate(&self.config.partial_dependence(), &predictor)?;
        let ale = evaluate(&self.config.accumulated_local_effects(), &predictor)?;
        let surrogate = evaluate(&self.config.global_surrogate(), &predictor)?;
        let lime = evaluate(&self.config.local_surrogate(), &predictor)?;

        Ok(Interpretation {
            importance,
            interaction,
            pdp_ice,
            ale,
            surrogate,
            lime,
        })
    }

    /// Export one image per interpretation result.
    ///
    /// Images are written in [`PlotFile::ALL`] order; on failure the ones
    /// already written are left in place.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Render`] for the first image that fails.
    pub fn render(&self, interpretation: &Interpretation) -> Result<Vec<PathBuf>, PipelineError> {
        let mut written = Vec::with_capacity(PlotFile::ALL.len());
        self.render_into(interpretation, &mut written)
            .inspect_err(|err| warn_partial(err, &written))?;
        Ok(written)
    }

    /// Stages 1 to 4: train, then write the training report and the model.
    ///
    /// # Errors
    ///
    /// Any error from [`Pipeline::prepare`] or [`Pipeline::train`], plus
    /// [`PipelineError::Write`] and [`PipelineError::ModelSave`].
    #[instrument(skip_all, fields(experiment = %self.writer.experiment()))]
    pub fn tune(&self) -> Result<TuneOutcome, PipelineError> {
        let mut written = Vec::new();
        self.prepare()
            .and_then(|prepared| self.tune_prepared(&prepared, &mut written))
            .inspect_err(|err| warn_partial(err, &written))
    }

    /// The full pipeline.
    ///
    /// # Errors
    ///
    /// Any stage error; see [`Pipeline::tune`], [`Pipeline::interpret`] and
    /// [`Pipeline::render`].
    #[instrument(skip_all, fields(experiment = %self.writer.experiment()))]
    pub fn run(&self) -> Result<RunOutcome, PipelineError> {
        let mut written = Vec::new();
        self.run_inner(&mut written)
            .inspect_err(|err| warn_partial(err, &written))
    }

    /// Stages 5 to 7 with a saved model, on the same deterministic split.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ModelLoad`] if the model cannot be read,
    /// [`PipelineError::ModelFeatures`] if it was trained on other columns,
    /// plus everything [`Pipeline::prepare`], [`Pipeline::interpret`] and
    /// [`Pipeline::render`] return.
    #[instrument(skip_all, fields(model = %model_path.display()))]
    pub fn explain(&self, model_path: &Path) -> Result<ExplainOutcome, PipelineError> {
        let mut written = Vec::new();
        self.explain_inner(model_path, &mut written)
            .inspect_err(|err| warn_partial(err, &written))
    }

    fn run_inner(&self, written: &mut Vec<PathBuf>) -> Result<RunOutcome, PipelineError> {
        let prepared = self.prepare()?;
        let tune = self.tune_prepared(&prepared, written)?;
        let interpretation = self.interpret(&tune.forest, &prepared.test)?;
        let interpretation_path = self.write_interpretation(&interpretation, written)?;
        let first_plot = written.len();
        self.render_into(&interpretation, written)?;
        let plots = written[first_plot..].to_vec();
        Ok(RunOutcome {
            tune,
            interpretation,
            interpretation_path,
            plots,
        })
    }

    fn explain_inner(
        &self,
        model_path: &Path,
        written: &mut Vec<PathBuf>,
    ) -> Result<ExplainOutcome, PipelineError> {
        let forest = RandomForest::load(model_path).map_err(|source| PipelineError::ModelLoad {
            path: model_path.to_path_buf(),
            source,
        })?;
        info!(
            n_trees = forest.n_trees(),
            n_features = forest.n_features(),
            "model loaded"
        );

        let prepared = self.prepare()?;
        if forest.feature_names() != prepared.test.feature_names.as_slice() {
            return Err(PipelineError::ModelFeatures {
                expected: forest.feature_names().to_vec(),
                got: prepared.test.feature_names.clone(),
            });
        }

        let interpretation = self.interpret(&forest, &prepared.test)?;
        let interpretation_path = self.write_interpretation(&interpretation, written)?;
        let first_plot = written.len();
        self.render_into(&interpretation, written)?;
        let plots = written[first_plot..].to_vec();
        Ok(ExplainOutcome {
            interpretation,
            interpretation_path,
            plots,
        })
    }

    fn tune_prepared(
        &self,
        prepared: &Prepared,
        written: &mut Vec<PathBuf>,
    ) -> Result<TuneOutcome, PipelineError> {
        let (forest, report) = self.train(prepared)?;

        let report_path = self.writer.write_json("training", &report)?;
        written.push(report_path.clone());

        let model_path = self.writer.model_path();
        forest
            .save(&model_path)
            .map_err(|source| PipelineError::ModelSave {
                path: model_path.clone(),
                source,
            })?;
        written.push(model_path.clone());
        info!(path = %model_path.display(), "model saved");

        Ok(TuneOutcome {
            forest,
            report,
            report_path,
            model_path,
        })
    }

    fn write_interpretation(
        &self,
        interpretation: &Interpretation,
        written: &mut Vec<PathBuf>,
    ) -> Result<PathBuf, PipelineError> {
        let path = self.writer.write_json("interpretation", interpretation)?;
        written.push(path.clone());
        Ok(path)
    }

    #[instrument(skip_all)]
    fn render_into(
        &self,
        interpretation: &Interpretation,
        written: &mut Vec<PathBuf>,
    ) -> Result<(), PipelineError> {
        let exporter = self.config.exporter();
        let prefix = self
            .config
            .plot
            .prefix_with_experiment
            .then(|| self.writer.experiment().as_str());

        for file in PlotFile::ALL {
            let result: &dyn IntoChart = match file {
                PlotFile::Importance => &interpretation.importance,
                PlotFile::Interaction => &interpretation.interaction,
                PlotFile::PdpIce => &interpretation.pdp_ice,
                PlotFile::Ale => &interpretation.ale,
                PlotFile::SurrogateTree => &interpretation.surrogate,
                PlotFile::Lime => &interpretation.lime,
            };
            let path = file.path_in(self.writer.output_dir(), prefix);
            exporter.export(result, &path)?;
            written.push(path);
        }
        info!(n_plots = PlotFile::ALL.len(), "render complete");
        Ok(())
    }
}

/// Evaluate one method, tagging failures with its name.
fn evaluate<T: Method, M: Model>(
    method: &T,
    predictor: &Predictor<M>,
) -> Result<T::Output, PipelineError> {
    let output = method
        .evaluate(predictor)
        .map_err(|source| PipelineError::Interpret {
            method: method.name(),
            source,
        })?;
    info!(method = method.name(), "interpretation complete");
    Ok(output)
}

fn warn_partial(err: &PipelineError, written: &[PathBuf]) {
    if !written.is_empty() {
        warn!(
            stage = %err.stage(),
            n_written = written.len(),
            "run aborted, artifacts already written are left in place"
        );
    }
}
