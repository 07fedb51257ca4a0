use std::path::PathBuf;

/// Errors from fitting, tuning, predicting with and persisting forests.
#[derive(Debug, thiserror::Error)]
pub enum RfError {
    // --- hyperparameters ---
    /// A forest needs at least one tree.
    #[error("a forest needs at least one tree, got n_trees = {n_trees}")]
    InvalidTreeCount {
        /// Requested tree count.
        n_trees: usize,
    },

    /// `max_depth = Some(0)` would leave no room for a root split.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// Requested depth.
        max_depth: usize,
    },

    #[error("min_samples_split must be at least 2, got {min_samples_split}")]
    InvalidMinSamplesSplit {
        /// Requested minimum.
        min_samples_split: usize,
    },

    #[error("min_samples_leaf must be at least 1, got {min_samples_leaf}")]
    InvalidMinSamplesLeaf {
        /// Requested minimum.
        min_samples_leaf: usize,
    },

    /// The candidate feature count per split resolved outside `[1, n_features]`.
    #[error("max_features resolves to {max_features} for {n_features} features")]
    InvalidMaxFeatures {
        /// Resolved count.
        max_features: usize,
        /// Features available.
        n_features: usize,
    },

    #[error("bootstrap fraction must be in (0, 1], got {fraction}")]
    InvalidBootstrapFraction {
        /// Requested fraction.
        fraction: f64,
    },

    #[error("cross-validation needs at least 2 folds, got {n_folds}")]
    InvalidFoldCount {
        /// Requested fold count.
        n_folds: usize,
    },

    /// A grid search was built without any hyperparameter points.
    #[error("hyperparameter grid is empty")]
    EmptyGrid,

    // --- training data ---
    #[error("no training rows")]
    EmptyDataset,

    #[error("training rows have no feature columns")]
    ZeroFeatures,

    /// Rows and targets disagree in length.
    #[error("{samples} training rows but {targets} targets")]
    TargetCountMismatch {
        /// Row count.
        samples: usize,
        /// Target count.
        targets: usize,
    },

    /// A training row is narrower or wider than the first one.
    #[error("row {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        got: usize,
        /// Offending row.
        sample_index: usize,
    },

    /// A row passed for prediction does not match the fitted width.
    #[error("model was fitted on {expected} features, row has {got}")]
    PredictionFeatureMismatch {
        /// Fitted width.
        expected: usize,
        /// Row width.
        got: usize,
    },

    #[error("feature {feature_index} of row {sample_index} is NaN or infinite")]
    NonFiniteValue {
        /// Offending row.
        sample_index: usize,
        /// Offending column.
        feature_index: usize,
    },

    #[error("target of row {sample_index} is NaN or infinite")]
    NonFiniteTarget {
        /// Offending row.
        sample_index: usize,
    },

    /// Fewer rows than folds, so some fold would be empty.
    #[error("{count} rows cannot fill {n_folds} folds")]
    TooFewSamplesForFolds {
        /// Available rows.
        count: usize,
        /// Requested folds.
        n_folds: usize,
    },

    /// No row was left out of every bootstrap, so there is nothing to score.
    #[error("out-of-bag evaluation failed: {reason}")]
    OobEvaluationFailed {
        /// Why no score could be computed.
        reason: String,
    },

    // --- persistence ---
    #[error("cannot encode model")]
    SerializeModel {
        /// Encoder error.
        source: Box<bincode::ErrorKind>,
    },

    #[error("cannot decode model {path}")]
    DeserializeModel {
        /// Model file.
        path: PathBuf,
        /// Decoder error.
        source: Box<bincode::ErrorKind>,
    },

    #[error("cannot write model {path}")]
    WriteModel {
        /// Destination file.
        path: PathBuf,
        /// I/O error.
        source: std::io::Error,
    },

    #[error("cannot read model {path}")]
    ReadModel {
        /// Model file.
        path: PathBuf,
        /// I/O error.
        source: std::io::Error,
    },

    /// The file decodes but does not start with the model tag.
    #[error("{path} is not an augur model file")]
    NotAModel {
        /// Offending file.
        path: PathBuf,
    },

    /// The file was written by a build with another format version.
    #[error("model {path} has format version {found}, this build reads version {expected}")]
    IncompatibleModelVersion {
        /// Version this build reads.
        expected: u32,
        /// Version in the file.
        found: u32,
        /// Model file.
        path: PathBuf,
    },

    /// The decoded forest is internally inconsistent.
    #[error("model {path} is corrupt: {reason}")]
    CorruptModel {
        /// Model file.
        path: PathBuf,
        /// The inconsistency found.
        reason: String,
    },
}
