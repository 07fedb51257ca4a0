//! Predictor adapter: a model bundled with the data it is explained on.

use tracing::debug;

use crate::error::InterpretError;
use crate::model::Model;

/// A fitted model plus feature names, feature rows, and observed outcomes.
///
/// Built once and only read afterwards; every interpretation method takes
/// it by shared reference.
#[derive(Debug)]
pub struct Predictor<M> {
    model: M,
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
    labels: Vec<f64>,
}

impl<M: Model> Predictor<M> {
    /// Bundle a model with its evaluation data.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InterpretError::EmptyData`] | `rows` is empty |
    /// | [`InterpretError::ShapeMismatch`] | names don't match the model width, a row has the wrong width, or `labels.len() != rows.len()` |
    pub fn new(
        model: M,
        feature_names: Vec<String>,
        rows: Vec<Vec<f64>>,
        labels: Vec<f64>,
    ) -> Result<Self, InterpretError> {
        if rows.is_empty() {
            return Err(InterpretError::EmptyData);
        }
        if feature_names.len() != model.n_features() {
            return Err(InterpretError::ShapeMismatch {
                what: "feature names",
                expected: model.n_features(),
                got: feature_names.len(),
            });
        }
        if let Some(row) = rows.iter().find(|r| r.len() != feature_names.len()) {
            return Err(InterpretError::ShapeMismatch {
                what: "row width",
                expected: feature_names.len(),
                got: row.len(),
            });
        }
        if labels.len() != rows.len() {
            return Err(InterpretError::ShapeMismatch {
                what: "labels",
                expected: rows.len(),
                got: labels.len(),
            });
        }
        debug!(n_rows = rows.len(), n_features = feature_names.len(), "predictor ready");
        Ok(Self {
            model,
            feature_names,
            rows,
            labels,
        })
    }

    /// Predict the given rows with the wrapped model.
    ///
    /// # Errors
    ///
    /// Propagates the model's [`InterpretError::Prediction`].
    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, InterpretError> {
        self.model.predict_rows(rows)
    }

    /// Predict the predictor's own rows.
    ///
    /// # Errors
    ///
    /// Propagates the model's [`InterpretError::Prediction`].
    pub fn predict_data(&self) -> Result<Vec<f64>, InterpretError> {
        self.model.predict_rows(&self.rows)
    }

    /// Column position of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`InterpretError::UnknownFeature`] if no feature has that name.
    pub fn feature_index(&self, name: &str) -> Result<usize, InterpretError> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| InterpretError::UnknownFeature {
                name: name.to_string(),
            })
    }

    /// Values of feature `j` in row order.
    #[must_use]
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[j]).collect()
    }

    /// Borrow the wrapped model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Feature names in column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Row-major feature values.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Observed outcomes, one per row.
    #[must_use]
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FnModel;

    fn sum_model() -> FnModel<impl Fn(&[f64]) -> f64 + Sync> {
        FnModel::new(2, |r: &[f64]| r[0] + r[1])
    }

    #[test]
    fn builds_and_predicts() {
        let p = Predictor::new(
            sum_model(),
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
            vec![3.0, 7.0],
        )
        .unwrap();
        assert_eq!(p.predict_data().unwrap(), vec![3.0, 7.0]);
        assert_eq!(p.feature_index("b").unwrap(), 1);
        assert_eq!(p.column(0), vec![1.0, 3.0]);
        assert!(matches!(
            p.feature_index("c"),
            Err(InterpretError::UnknownFeature { .. })
        ));
    }

    #[test]
    fn rejects_bad_shapes() {
        let names = || vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            Predictor::new(sum_model(), names(), vec![], vec![]),
            Err(InterpretError::EmptyData)
        ));
        assert!(matches!(
            Predictor::new(sum_model(), vec!["a".into()], vec![vec![1.0]], vec![1.0]),
            Err(InterpretError::ShapeMismatch { what: "feature names", .. })
        ));
        assert!(matches!(
            Predictor::new(sum_model(), names(), vec![vec![1.0]], vec![1.0]),
            Err(InterpretError::ShapeMismatch { what: "row width", .. })
        ));
        assert!(matches!(
            Predictor::new(sum_model(), names(), vec![vec![1.0, 2.0]], vec![]),
            Err(InterpretError::ShapeMismatch { what: "labels", .. })
        ));
    }
}
