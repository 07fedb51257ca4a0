//! Prediction and read-only accessors.

use rayon::prelude::*;

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::tree::RegressionTree;

impl RandomForest {
    /// Mean of the tree predictions for one row.
    ///
    /// # Errors
    ///
    /// [`RfError::PredictionFeatureMismatch`] when the row width differs
    /// from the training width.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let total = self
            .trees
            .iter()
            .try_fold(0.0, |acc, tree| tree.predict(sample).map(|y| acc + y))?;
        Ok(total / self.trees.len() as f64)
    }

    /// [`predict`](Self::predict) over many rows, in parallel, in input order.
    ///
    /// # Errors
    ///
    /// The first width mismatch encountered.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, RfError> {
        features.par_iter().map(|row| self.predict(row)).collect()
    }

    #[must_use]
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Column names in training order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

impl RegressionTree {
    /// # Errors
    ///
    /// [`RfError::PredictionFeatureMismatch`] for any row of the wrong width.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, RfError> {
        features.iter().map(|row| self.predict(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::error::RfError;
    use crate::forest::RandomForest;

    fn fitted() -> RandomForest {
        let features: Vec<Vec<f64>> = (0..36)
            .map(|i| vec![f64::from(i % 6), f64::from(i / 6)])
            .collect();
        let targets: Vec<f64> = features.iter().map(|r| r[0] - r[1]).collect();
        RandomForestConfig::new(6)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_min_samples_leaf(1)
            .fit(&features, &targets, &["col".to_string(), "row".to_string()])
            .unwrap()
            .into_forest()
    }

    #[test]
    fn forest_mean_of_trees() {
        let forest = fitted();
        let sample = [2.0, 4.0];
        let by_hand = forest
            .trees()
            .iter()
            .map(|t| t.predict(&sample).unwrap())
            .sum::<f64>()
            / 6.0;
        assert!((forest.predict(&sample).unwrap() - by_hand).abs() < 1e-12);
        assert_eq!(forest.n_trees(), 6);
        assert_eq!(forest.n_features(), 2);
        assert_eq!(forest.feature_names(), ["col", "row"]);
    }

    #[test]
    fn batch_keeps_row_order() {
        let forest = fitted();
        let rows = vec![vec![5.0, 0.0], vec![0.0, 5.0], vec![3.0, 3.0]];
        let batch = forest.predict_batch(&rows).unwrap();
        for (row, y) in rows.iter().zip(batch) {
            assert_eq!(forest.predict(row).unwrap(), y);
        }
        assert!(forest.predict(&[0.0, 5.0]).unwrap() < forest.predict(&[5.0, 0.0]).unwrap());
    }

    #[test]
    fn width_is_checked() {
        let forest = fitted();
        assert!(matches!(
            forest.predict(&[1.0]),
            Err(RfError::PredictionFeatureMismatch { expected: 2, got: 1 })
        ));
        assert!(forest.predict_batch(&[vec![1.0, 2.0], vec![3.0]]).is_err());
    }
}
