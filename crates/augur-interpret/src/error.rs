//! Error types for augur-interpret.

use augur_rf::RfError;

/// Errors from building a predictor or evaluating an interpretation method.
#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    /// Returned when a feature name is not one of the predictor's features.
    #[error("unknown feature \"{name}\"")]
    UnknownFeature {
        /// The requested feature name.
        name: String,
    },

    /// Returned when a grid size is zero (or below the method's minimum).
    #[error("grid size must be at least {min}, got {grid_size}")]
    InvalidGridSize {
        /// The rejected grid size.
        grid_size: usize,
        /// The smallest accepted grid size.
        min: usize,
    },

    /// Returned when permutation importance is asked for zero repetitions.
    #[error("repetitions must be at least 1, got {repetitions}")]
    InvalidRepetitions {
        /// The rejected count.
        repetitions: usize,
    },

    /// Returned when a surrogate tree depth is zero.
    #[error("surrogate max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The rejected depth.
        max_depth: usize,
    },

    /// Returned when the LIME feature count is outside `[1, n_features]`.
    #[error("k must be in [1, {n_features}], got {k}")]
    InvalidK {
        /// The rejected feature count.
        k: usize,
        /// Number of available features.
        n_features: usize,
    },

    /// Returned when the LIME kernel width is not a positive finite number.
    #[error("kernel width must be positive and finite, got {width}")]
    InvalidKernelWidth {
        /// The rejected width.
        width: f64,
    },

    /// Returned when an explained instance index is past the last row.
    #[error("instance {index} out of range for {n_rows} rows")]
    InstanceOutOfRange {
        /// The requested row index.
        index: usize,
        /// Number of rows in the predictor.
        n_rows: usize,
    },

    /// Returned when the predictor has no rows.
    #[error("predictor has no data rows")]
    EmptyData,

    /// Returned when lengths that must agree do not.
    #[error("shape mismatch in {what}: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Which quantity disagreed.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// Returned when the weighted least-squares system has no unique solution.
    #[error("local model normal equations are singular")]
    Singular,

    /// Returned when the black-box model fails to predict.
    #[error("model prediction failed")]
    Prediction {
        /// Underlying model error.
        source: RfError,
    },

    /// Returned when the surrogate tree cannot be fitted.
    #[error("surrogate tree fit failed")]
    Surrogate {
        /// Underlying tree error.
        source: RfError,
    },
}
