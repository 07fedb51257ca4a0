//! The black-box seam: anything that maps feature rows to predictions.

use augur_rf::{RandomForest, RegressionTree};

use crate::error::InterpretError;

/// A fitted regression model that interpretation methods can query.
///
/// Implementations must be deterministic: the same rows always give the
/// same predictions.
pub trait Model: Sync {
    /// Number of features each row must have.
    fn n_features(&self) -> usize;

    /// Predict one value per row, in row order.
    ///
    /// # Errors
    ///
    /// Returns [`InterpretError::Prediction`] when the model rejects a row.
    fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, InterpretError>;
}

impl Model for RandomForest {
    fn n_features(&self) -> usize {
        RandomForest::n_features(self)
    }

    fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, InterpretError> {
        self.predict_batch(rows)
            .map_err(|source| InterpretError::Prediction { source })
    }
}

impl Model for RegressionTree {
    fn n_features(&self) -> usize {
        RegressionTree::n_features(self)
    }

    fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, InterpretError> {
        self.predict_batch(rows)
            .map_err(|source| InterpretError::Prediction { source })
    }
}

impl<M: Model + ?Sized> Model for &M {
    fn n_features(&self) -> usize {
        (**self).n_features()
    }

    fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, InterpretError> {
        (**self).predict_rows(rows)
    }
}

/// Adapts a plain function of one row into a [`Model`].
///
/// Useful for closed-form models whose effects are known exactly.
pub struct FnModel<F> {
    n_features: usize,
    f: F,
}

impl<F> FnModel<F>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    /// Wrap `f`, which expects rows of `n_features` values.
    pub fn new(n_features: usize, f: F) -> Self {
        Self { n_features, f }
    }
}

impl<F> std::fmt::Debug for FnModel<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnModel")
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl<F> Model for FnModel<F>
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, InterpretError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(InterpretError::ShapeMismatch {
                        what: "row width",
                        expected: self.n_features,
                        got: row.len(),
                    });
                }
                Ok((self.f)(row))
            })
            .collect()
    }
}
