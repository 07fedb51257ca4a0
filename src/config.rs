//! Pipeline configuration loaded from TOML.
//!
//! Every section and field has a default, so an empty file (or no file)
//! reproduces the standard Communities-and-Crime analysis. Command-line
//! flags override the `[data]` path and the `[output]` section.

use std::path::{Path, PathBuf};

use augur_interpret::{
    AccumulatedLocalEffects, Compare, GlobalSurrogate, Instance, Interaction, LocalSurrogate,
    Loss, PartialDependence, PermutationImportance,
};
use augur_io::{DatasetReader, ExperimentName, FeatureFilter, Splitter, WriteError};
use augur_plot::PlotExporter;
use augur_rf::{GridSearch, HyperParams, MaxFeatures, SplitMethod};
use serde::{Deserialize, Serialize};

/// Errors from reading or validating a [`PipelineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Returned when the configuration file cannot be read.
    #[error("cannot read config file {path}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the configuration file is not valid TOML for this schema.
    #[error("cannot parse config file {path}")]
    Parse {
        /// Path that was parsed.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// Returned when the configuration cannot be encoded as TOML.
    #[error("cannot encode configuration as TOML")]
    Encode {
        /// Underlying TOML error.
        #[from]
        source: toml::ser::Error,
    },

    /// Returned when no input data path was given in the file or on the command line.
    #[error("no input data path configured (set [data].path or pass --data)")]
    MissingDataPath,

    /// Returned when a delimiter or quote character is not a single ASCII byte.
    #[error("{field} must be an ASCII character, got {value:?}")]
    NonAsciiCharacter {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: char,
    },

    /// Returned when the delimiter and the quote character are the same.
    #[error("delimiter and quote must differ, both are {value:?}")]
    DelimiterIsQuote {
        /// The shared character.
        value: char,
    },

    /// Returned when a required name is empty.
    #[error("{field} must not be empty")]
    EmptyName {
        /// Offending field.
        field: &'static str,
    },

    /// Returned when the split fraction is outside (0, 1).
    #[error("split fraction must be in (0, 1), got {fraction}")]
    InvalidFraction {
        /// Offending fraction.
        fraction: f64,
    },

    /// Returned when fewer than two folds are requested.
    #[error("folds must be at least 2, got {folds}")]
    InvalidFolds {
        /// Offending fold count.
        folds: usize,
    },

    /// Returned when the hyperparameter grid is empty.
    #[error("training grid must contain at least one point")]
    EmptyGrid,

    /// Returned when a grid point cannot describe a valid forest.
    #[error("grid point {index} is invalid: {reason}")]
    InvalidGridPoint {
        /// Zero-based position in the grid.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Returned when an integer setting is below its minimum.
    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        /// Offending field.
        field: &'static str,
        /// Smallest accepted value.
        min: usize,
        /// Offending value.
        value: usize,
    },

    /// Returned when a real-valued setting is not positive and finite.
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive {
        /// Offending field.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Returned when the experiment name is not usable in file names.
    #[error("invalid experiment name")]
    InvalidExperiment {
        /// Underlying naming error.
        #[source]
        source: WriteError,
    },
}

/// `[data]`: where the input lives and how it is delimited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    /// Input file. Overridden by `--data`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Field delimiter.
    pub delimiter: char,
    /// Quote character.
    pub quote: char,
    /// Cell text that marks a missing value.
    pub na_token: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            delimiter: ',',
            quote: '"',
            na_token: "?".to_string(),
        }
    }
}

/// `[filter]`: columns removed before modelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Exact column names to drop.
    pub drop_columns: Vec<String>,
    /// Columns whose name contains any of these substrings are dropped.
    pub drop_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let drop_columns = [
            // identifiers
            "communityname",
            "state",
            "countyCode",
            "communityCode",
            "fold",
            // other crime counts and rates
            "murders",
            "murdPerPop",
            "rapes",
            "rapesPerPop",
            "robberies",
            "robbbPerPop",
            "assaults",
            "assaultPerPop",
            "burglaries",
            "burglPerPop",
            "larcenies",
            "larcPerPop",
            "autoTheft",
            "autoTheftPerPop",
            "arsons",
            "arsonsPerPop",
            "nonViolPerPop",
        ];
        // Police statistics, mostly missing outside large departments.
        let drop_patterns = ["Lemas", "Polic", "Offic", "DrugsSeiz"];
        Self {
            drop_columns: drop_columns.iter().map(|s| s.to_string()).collect(),
            drop_patterns: drop_patterns.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// `[split]`: stratified train/test partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    /// Outcome column.
    pub outcome: String,
    /// Share of rows that go to the training set.
    pub fraction: f64,
    /// Shuffle seed.
    pub seed: u64,
    /// Number of outcome quantile groups to stratify on.
    pub groups: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            outcome: "ViolentCrimesPerPop".to_string(),
            fraction: 0.8,
            seed: 49043,
            groups: 5,
        }
    }
}

/// `[training]`: cross-validated grid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Number of cross-validation folds.
    pub folds: usize,
    /// Seed for fold assignment, fold models and the final refit.
    pub seed: u64,
    /// Trees per forest.
    pub n_trees: usize,
    /// Number of outcome quantile groups the folds are stratified on.
    pub groups: usize,
    /// Hyperparameter points to compare.
    pub grid: Vec<HyperParams>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        let point = |max_features| HyperParams {
            max_features,
            split_method: SplitMethod::Exact,
            min_samples_leaf: 5,
            max_depth: None,
        };
        Self {
            folds: 5,
            seed: 65948,
            n_trees: 500,
            groups: 5,
            grid: vec![
                point(MaxFeatures::Sqrt),
                point(MaxFeatures::Third),
                point(MaxFeatures::Fraction(0.5)),
            ],
        }
    }
}

/// `[importance]`: permutation feature importance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportanceConfig {
    /// Loss function.
    pub loss: Loss,
    /// Shuffles per feature.
    pub repetitions: usize,
    /// How permuted and original loss are compared.
    pub compare: Compare,
    /// Shuffle seed.
    pub seed: u64,
}

impl Default for ImportanceConfig {
    fn default() -> Self {
        Self {
            loss: Loss::Mse,
            repetitions: 5,
            compare: Compare::Difference,
            seed: 42,
        }
    }
}

/// `[interaction]`: Friedman's H-statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InteractionConfig {
    /// Number of data points the statistic is computed on.
    pub grid_size: usize,
    /// Subsampling seed.
    pub seed: u64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            grid_size: 30,
            seed: 42,
        }
    }
}

/// `[pdp]`: partial dependence with ICE curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdpConfig {
    /// Feature to vary.
    pub feature: String,
    /// Number of grid points.
    pub grid_size: usize,
    /// Anchor every curve to zero at this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub center_at: Option<f64>,
}

impl Default for PdpConfig {
    fn default() -> Self {
        Self {
            feature: "PctKids2Par".to_string(),
            grid_size: 20,
            center_at: None,
        }
    }
}

/// `[ale]`: accumulated local effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AleConfig {
    /// Feature to explain.
    pub feature: String,
    /// Number of quantile intervals.
    pub grid_size: usize,
}

impl Default for AleConfig {
    fn default() -> Self {
        Self {
            feature: "PctIlleg".to_string(),
            grid_size: 20,
        }
    }
}

/// `[surrogate]`: global surrogate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurrogateConfig {
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum rows per leaf.
    pub min_samples_leaf: usize,
}

impl Default for SurrogateConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            min_samples_leaf: 1,
        }
    }
}

/// `[lime]`: local linear surrogate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimeConfig {
    /// Row to explain.
    pub instance: Instance,
    /// Maximum number of features in the explanation.
    pub k: usize,
    /// Kernel width on the Gower distance.
    pub kernel_width: f64,
}

impl Default for LimeConfig {
    fn default() -> Self {
        Self {
            instance: Instance::Sample { seed: 42 },
            k: 5,
            kernel_width: 0.75,
        }
    }
}

/// `[plot]`: image size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotConfig {
    /// Width in inches.
    pub width_in: f64,
    /// Height in inches.
    pub height_in: f64,
    /// Dots per inch.
    pub dpi: f64,
    /// Prefix image names with `{experiment}_`.
    pub prefix_with_experiment: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width_in: 6.0,
            height_in: 6.0,
            dpi: 96.0,
            prefix_with_experiment: false,
        }
    }
}

/// `[output]`: where artifacts go. Overridden by `--output-dir` and `--experiment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory.
    pub dir: PathBuf,
    /// Experiment name used as the artifact file prefix.
    pub experiment: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            experiment: "crime".to_string(),
        }
    }
}

/// The full pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub filter: FilterConfig,
    pub split: SplitConfig,
    pub training: TrainingConfig,
    pub importance: ImportanceConfig,
    pub interaction: InteractionConfig,
    pub pdp: PdpConfig,
    pub ale: AleConfig,
    pub surrogate: SurrogateConfig,
    pub lime: LimeConfig,
    pub plot: PlotConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    /// Read and validate a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`], [`ConfigError::Parse`], or any validation error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Encode as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Encode`] if a value has no TOML form.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply command-line overrides. `None` keeps the file value.
    #[must_use]
    pub fn with_overrides(
        mut self,
        data: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        experiment: Option<String>,
    ) -> Self {
        if data.is_some() {
            self.data.path = data;
        }
        if let Some(dir) = output_dir {
            self.output.dir = dir;
        }
        if let Some(name) = experiment {
            self.output.experiment = name;
        }
        self
    }

    /// Check every value the pipeline depends on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found, checking sections in file order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("data.delimiter", self.data.delimiter), ("data.quote", self.data.quote)] {
            if !value.is_ascii() {
                return Err(ConfigError::NonAsciiCharacter { field, value });
            }
        }
        if self.data.delimiter == self.data.quote {
            return Err(ConfigError::DelimiterIsQuote {
                value: self.data.delimiter,
            });
        }

        if self.split.outcome.is_empty() {
            return Err(ConfigError::EmptyName {
                field: "split.outcome",
            });
        }
        let fraction = self.split.fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ConfigError::InvalidFraction { fraction });
        }
        at_least("split.groups", self.split.groups, 1)?;

        if self.training.folds < 2 {
            return Err(ConfigError::InvalidFolds {
                folds: self.training.folds,
            });
        }
        at_least("training.n_trees", self.training.n_trees, 1)?;
        at_least("training.groups", self.training.groups, 1)?;
        if self.training.grid.is_empty() {
            return Err(ConfigError::EmptyGrid);
        }
        for (index, point) in self.training.grid.iter().enumerate() {
            if let Some(reason) = grid_point_problem(point) {
                return Err(ConfigError::InvalidGridPoint { index, reason });
            }
        }

        at_least("importance.repetitions", self.importance.repetitions, 1)?;
        at_least("interaction.grid_size", self.interaction.grid_size, 2)?;
        if self.pdp.feature.is_empty() {
            return Err(ConfigError::EmptyName { field: "pdp.feature" });
        }
        at_least("pdp.grid_size", self.pdp.grid_size, 1)?;
        if self.ale.feature.is_empty() {
            return Err(ConfigError::EmptyName { field: "ale.feature" });
        }
        at_least("ale.grid_size", self.ale.grid_size, 1)?;
        at_least("surrogate.max_depth", self.surrogate.max_depth, 1)?;
        at_least("surrogate.min_samples_leaf", self.surrogate.min_samples_leaf, 1)?;
        at_least("lime.k", self.lime.k, 1)?;
        positive("lime.kernel_width", self.lime.kernel_width)?;

        positive("plot.width_in", self.plot.width_in)?;
        positive("plot.height_in", self.plot.height_in)?;
        positive("plot.dpi", self.plot.dpi)?;

        self.experiment()?;
        Ok(())
    }

    /// The configured input path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDataPath`] when none was set.
    pub fn data_path(&self) -> Result<&Path, ConfigError> {
        self.data.path.as_deref().ok_or(ConfigError::MissingDataPath)
    }

    /// The validated experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidExperiment`] for names that are not
    /// safe as a file prefix.
    pub fn experiment(&self) -> Result<ExperimentName, ConfigError> {
        ExperimentName::new(self.output.experiment.clone())
            .map_err(|source| ConfigError::InvalidExperiment { source })
    }

    // --- Stage builders. Call `validate` first; ASCII characters are assumed. ---

    /// Reader for `path` with the `[data]` settings.
    #[must_use]
    pub fn reader(&self, path: &Path) -> DatasetReader {
        DatasetReader::new(path)
            .with_delimiter(self.data.delimiter as u8)
            .with_quote(self.data.quote as u8)
            .with_na_token(self.data.na_token.clone())
    }

    /// Feature filter with the `[filter]` settings.
    #[must_use]
    pub fn feature_filter(&self) -> FeatureFilter {
        FeatureFilter::new()
            .with_drop_columns(self.filter.drop_columns.iter().cloned())
            .with_drop_patterns(self.filter.drop_patterns.iter().cloned())
    }

    /// Splitter with the `[split]` settings.
    ///
    /// # Errors
    ///
    /// Returns [`augur_io::DataError::InvalidSplitFraction`] for a bad fraction.
    pub fn splitter(&self) -> Result<Splitter, augur_io::DataError> {
        Ok(Splitter::new(self.split.outcome.clone(), self.split.fraction)?
            .with_seed(self.split.seed)
            .with_groups(self.split.groups))
    }

    /// Grid search with the `[training]` settings.
    ///
    /// # Errors
    ///
    /// Returns [`augur_rf::RfError::EmptyGrid`] or
    /// [`augur_rf::RfError::InvalidTreeCount`].
    pub fn grid_search(&self) -> Result<GridSearch, augur_rf::RfError> {
        Ok(GridSearch::new(self.training.grid.clone(), self.training.n_trees)?
            .with_folds(self.training.folds)
            .with_seed(self.training.seed)
            .with_groups(self.training.groups))
    }

    #[must_use]
    pub fn permutation_importance(&self) -> PermutationImportance {
        PermutationImportance::new()
            .with_loss(self.importance.loss)
            .with_repetitions(self.importance.repetitions)
            .with_compare(self.importance.compare)
            .with_seed(self.importance.seed)
    }

    #[must_use]
    pub fn interaction(&self) -> Interaction {
        Interaction::new(self.interaction.grid_size).with_seed(self.interaction.seed)
    }

    #[must_use]
    pub fn partial_dependence(&self) -> PartialDependence {
        PartialDependence::new(self.pdp.feature.clone())
            .with_grid_size(self.pdp.grid_size)
            .with_center_at(self.pdp.center_at)
    }

    #[must_use]
    pub fn accumulated_local_effects(&self) -> AccumulatedLocalEffects {
        AccumulatedLocalEffects::new(self.ale.feature.clone()).with_grid_size(self.ale.grid_size)
    }

    #[must_use]
    pub fn global_surrogate(&self) -> GlobalSurrogate {
        GlobalSurrogate::new(self.surrogate.max_depth)
            .with_min_samples_leaf(self.surrogate.min_samples_leaf)
    }

    #[must_use]
    pub fn local_surrogate(&self) -> LocalSurrogate {
        LocalSurrogate::new()
            .with_instance(self.lime.instance)
            .with_k(self.lime.k)
            .with_kernel_width(self.lime.kernel_width)
    }

    #[must_use]
    pub fn exporter(&self) -> PlotExporter {
        PlotExporter::new()
            .with_size(self.plot.width_in, self.plot.height_in)
            .with_dpi(self.plot.dpi)
    }
}

fn at_least(field: &'static str, value: usize, min: usize) -> Result<(), ConfigError> {
    if value < min {
        return Err(ConfigError::TooSmall { field, min, value });
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::NotPositive { field, value });
    }
    Ok(())
}

/// Checks that do not depend on the feature count.
fn grid_point_problem(point: &HyperParams) -> Option<String> {
    match point.max_features {
        MaxFeatures::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
            return Some(format!("max_features fraction {f} is outside (0, 1]"));
        }
        MaxFeatures::Fixed(0) => return Some("max_features is 0".to_string()),
        _ => {}
    }
    if point.min_samples_leaf == 0 {
        return Some("min_samples_leaf is 0".to_string());
    }
    if point.max_depth == Some(0) {
        return Some("max_depth is 0".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.split.seed, 49043);
        assert_eq!(config.training.seed, 65948);
        assert_eq!(config.exporter().pixel_size().unwrap(), (576.0, 576.0));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn default_toml_round_trips() {
        let config = PipelineConfig::default().with_overrides(
            Some(PathBuf::from("data/communities.csv")),
            None,
            None,
        );
        let text = config.to_toml().unwrap();
        let back: PipelineConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let text = r#"
            [split]
            fraction = 0.7

            [training]
            n_trees = 50
            grid = [
                { max_features = "all", split_method = "extra-trees", min_samples_leaf = 2 },
                { max_features = { fraction = 0.25 }, split_method = "exact", min_samples_leaf = 5, max_depth = 8 },
            ]

            [lime]
            instance = { index = 3 }

            [importance]
            loss = "mae"
            compare = "ratio"
        "#;
        let config: PipelineConfig = toml::from_str(text).unwrap();
        config.validate().unwrap();
        assert_eq!(config.split.fraction, 0.7);
        assert_eq!(config.split.seed, 49043);
        assert_eq!(config.training.n_trees, 50);
        assert_eq!(config.training.folds, 5);
        assert_eq!(config.training.grid.len(), 2);
        assert_eq!(config.training.grid[0].max_features, MaxFeatures::All);
        assert_eq!(config.training.grid[1].max_features, MaxFeatures::Fraction(0.25));
        assert_eq!(config.training.grid[1].max_depth, Some(8));
        assert_eq!(config.lime.instance, Instance::Index(3));
        assert_eq!(config.importance.loss, Loss::Mae);
        assert_eq!(config.importance.compare, Compare::Ratio);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(toml::from_str::<PipelineConfig>("[split]\nfractoin = 0.5\n").is_err());
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = PipelineConfig::default();
        config.split.fraction = 1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFraction { .. })));

        let mut config = PipelineConfig::default();
        config.training.folds = 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidFolds { folds: 1 })));

        let mut config = PipelineConfig::default();
        config.training.grid.clear();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyGrid)));

        let mut config = PipelineConfig::default();
        config.training.grid[1].min_samples_leaf = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidGridPoint { index: 1, .. })
        ));

        let mut config = PipelineConfig::default();
        config.plot.dpi = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { field: "plot.dpi", .. })
        ));

        let mut config = PipelineConfig::default();
        config.data.quote = ',';
        assert!(matches!(config.validate(), Err(ConfigError::DelimiterIsQuote { .. })));

        let mut config = PipelineConfig::default();
        config.output.experiment = "../escape".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidExperiment { .. })));
    }

    #[test]
    fn overrides_replace_file_values() {
        let config = PipelineConfig::default().with_overrides(
            Some(PathBuf::from("in.csv")),
            Some(PathBuf::from("out")),
            Some("run2".to_string()),
        );
        assert_eq!(config.data_path().unwrap(), Path::new("in.csv"));
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert_eq!(config.experiment().unwrap().as_str(), "run2");

        let config = PipelineConfig::default();
        assert!(matches!(config.data_path(), Err(ConfigError::MissingDataPath)));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("augur.toml");
        std::fs::write(&path, "[split\n").unwrap();
        assert!(matches!(PipelineConfig::load(&path), Err(ConfigError::Parse { .. })));
        assert!(matches!(
            PipelineConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
