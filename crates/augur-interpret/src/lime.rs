//! Local surrogate (LIME): a weighted sparse linear model around one instance.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::error::InterpretError;
use crate::linalg::{WlsFit, weighted_least_squares};
use crate::method::Method;
use crate::model::Model;
use crate::predictor::Predictor;
use crate::stats::min_max;

/// Which row to explain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instance {
    /// A fixed row position.
    Index(usize),
    /// A row drawn uniformly with the given seed.
    Sample {
        /// Draw seed.
        seed: u64,
    },
}

/// LIME configuration.
///
/// Every data row is a neighbour, weighted by `exp(−d² / width²)` where `d`
/// is the Gower distance to the instance. Up to `k` features are picked by
/// greedy forward selection on weighted squared error.
///
/// # Defaults
///
/// | Parameter      | Default             |
/// |----------------|---------------------|
/// | `k`            | 5                   |
/// | `kernel_width` | 0.75                |
/// | `instance`     | `Sample { seed: 42 }` |
#[derive(Debug, Clone)]
pub struct LocalSurrogate {
    instance: Instance,
    k: usize,
    kernel_width: f64,
}

/// Contribution of one selected feature.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LocalEffect {
    /// Feature name.
    pub feature: String,
    /// The instance's value of this feature.
    pub value: f64,
    /// Local linear coefficient.
    pub coefficient: f64,
    /// `coefficient · value`.
    pub effect: f64,
}

/// Result of [`LocalSurrogate`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct LocalExplanation {
    /// Row position of the explained instance.
    pub instance_index: usize,
    /// Intercept of the local model.
    pub intercept: f64,
    /// Selected features in selection order.
    pub features: Vec<LocalEffect>,
    /// Local model prediction at the instance.
    pub local_prediction: f64,
    /// Black-box prediction at the instance.
    pub model_prediction: f64,
    /// Weighted R² of the local model over the neighbourhood.
    pub r_squared: f64,
}

impl LocalExplanation {
    /// Sum of all effects.
    #[must_use]
    pub fn sum_effects(&self) -> f64 {
        self.features.iter().map(|f| f.effect).sum()
    }
}

impl LocalSurrogate {
    /// Create a config with the defaults above.
    #[must_use]
    pub fn new() -> Self {
        Self {
            instance: Instance::Sample { seed: 42 },
            k: 5,
            kernel_width: 0.75,
        }
    }

    /// Set the row to explain.
    #[must_use]
    pub fn with_instance(mut self, instance: Instance) -> Self {
        self.instance = instance;
        self
    }

    /// Set the maximum number of features in the local model.
    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set the kernel width on the Gower-distance scale.
    #[must_use]
    pub fn with_kernel_width(mut self, kernel_width: f64) -> Self {
        self.kernel_width = kernel_width;
        self
    }

    fn resolve_instance(&self, n_rows: usize) -> Result<usize, InterpretError> {
        match self.instance {
            Instance::Index(index) if index >= n_rows => {
                Err(InterpretError::InstanceOutOfRange { index, n_rows })
            }
            Instance::Index(index) => Ok(index),
            Instance::Sample { seed } => Ok(ChaCha8Rng::seed_from_u64(seed).gen_range(0..n_rows)),
        }
    }
}

impl Default for LocalSurrogate {
    fn default() -> Self {
        Self::new()
    }
}

impl Method for LocalSurrogate {
    type Output = LocalExplanation;

    fn name(&self) -> &'static str {
        "lime"
    }

    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InterpretError::InvalidK`] | `k` outside `[1, n_features]` |
    /// | [`InterpretError::InvalidKernelWidth`] | width not positive and finite |
    /// | [`InterpretError::InstanceOutOfRange`] | `Instance::Index` past the last row |
    /// | [`InterpretError::Singular`] | no feature yields a solvable local model |
    /// | [`InterpretError::Prediction`] | model failure |
    #[instrument(skip_all, fields(k = self.k, kernel_width = self.kernel_width))]
    fn evaluate<M: Model>(&self, predictor: &Predictor<M>) -> Result<LocalExplanation, InterpretError> {
        let n_features = predictor.n_features();
        if self.k == 0 || self.k > n_features {
            return Err(InterpretError::InvalidK {
                k: self.k,
                n_features,
            });
        }
        if !(self.kernel_width.is_finite() && self.kernel_width > 0.0) {
            return Err(InterpretError::InvalidKernelWidth {
                width: self.kernel_width,
            });
        }
        let index = self.resolve_instance(predictor.n_rows())?;
        let rows = predictor.rows();
        let instance = &rows[index];
        let y = predictor.predict_data()?;

        let weights = gower_weights(predictor, instance, self.kernel_width);

        let mut selected: Vec<usize> = Vec::with_capacity(self.k);
        let mut fit: Option<WlsFit> = None;
        while selected.len() < self.k {
            let mut best: Option<(usize, WlsFit)> = None;
            for candidate in (0..n_features).filter(|j| !selected.contains(j)) {
                let mut cols = selected.clone();
                cols.push(candidate);
                // Candidates that make the system singular are skipped.
                let Ok(trial) = weighted_least_squares(rows, &cols, &y, &weights) else {
                    continue;
                };
                if best.as_ref().is_none_or(|(_, b)| trial.sse < b.sse) {
                    best = Some((candidate, trial));
                }
            }
            let Some((feature, trial)) = best else {
                break;
            };
            debug!(feature = %predictor.feature_names()[feature], sse = trial.sse, "feature selected");
            selected.push(feature);
            fit = Some(trial);
        }
        let fit = fit.ok_or(InterpretError::Singular)?;

        let weight_sum: f64 = weights.iter().sum();
        let weighted_mean = y.iter().zip(&weights).map(|(v, w)| v * w).sum::<f64>() / weight_sum;
        let sst: f64 = y
            .iter()
            .zip(&weights)
            .map(|(v, w)| w * (v - weighted_mean).powi(2))
            .sum();
        let r_squared = if sst > 0.0 { 1.0 - fit.sse / sst } else { 1.0 };

        let features: Vec<LocalEffect> = selected
            .iter()
            .zip(&fit.coefficients)
            .map(|(&j, &coefficient)| LocalEffect {
                feature: predictor.feature_names()[j].clone(),
                value: instance[j],
                coefficient,
                effect: coefficient * instance[j],
            })
            .collect();

        let explanation = LocalExplanation {
            instance_index: index,
            intercept: fit.intercept,
            local_prediction: fit.intercept + features.iter().map(|f| f.effect).sum::<f64>(),
            model_prediction: y[index],
            r_squared,
            features,
        };
        info!(
            instance = index,
            n_selected = explanation.features.len(),
            local_prediction = explanation.local_prediction,
            model_prediction = explanation.model_prediction,
            "local surrogate fitted"
        );
        Ok(explanation)
    }
}

/// Kernel weights from the Gower distance of every row to `instance`.
///
/// Features with zero range contribute zero distance.
fn gower_weights<M: Model>(predictor: &Predictor<M>, instance: &[f64], width: f64) -> Vec<f64> {
    let ranges: Vec<f64> = (0..predictor.n_features())
        .map(|j| {
            let (lo, hi) = min_max(&predictor.column(j));
            hi - lo
        })
        .collect();
    let p = ranges.len() as f64;
    predictor
        .rows()
        .iter()
        .map(|row| {
            let d = row
                .iter()
                .zip(instance)
                .zip(&ranges)
                .filter(|(_, r)| **r > 0.0)
                .map(|((a, b), r)| (a - b).abs() / r)
                .sum::<f64>()
                / p;
            (-(d * d) / (width * width)).exp()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FnModel;

    fn predictor() -> Predictor<FnModel<impl Fn(&[f64]) -> f64 + Sync>> {
        let rows: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![i as f64, ((i * 7) % 10) as f64, ((i * 3) % 4) as f64, 2.0])
            .collect();
        let labels = vec![0.0; rows.len()];
        Predictor::new(
            FnModel::new(4, |r: &[f64]| 1.0 + 2.0 * r[0] - 3.0 * r[1] + 0.01 * r[2]),
            vec!["a".into(), "b".into(), "c".into(), "const".into()],
            rows,
            labels,
        )
        .unwrap()
    }

    #[test]
    fn linear_model_recovered_locally() {
        let result = LocalSurrogate::new()
            .with_instance(Instance::Index(7))
            .with_k(2)
            .evaluate(&predictor())
            .unwrap();
        assert_eq!(result.instance_index, 7);
        let names: Vec<&str> = result.features.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a") && names.contains(&"b"));
        let b = result.features.iter().find(|f| f.feature == "b").unwrap();
        assert!((b.coefficient + 3.0).abs() < 0.05);
        assert!((result.local_prediction - result.model_prediction).abs() < 0.1);
        assert!((result.local_prediction - result.intercept - result.sum_effects()).abs() < 1e-9);
    }

    #[test]
    fn at_most_k_features_and_constant_skipped() {
        let result = LocalSurrogate::new()
            .with_instance(Instance::Index(0))
            .with_k(4)
            .evaluate(&predictor())
            .unwrap();
        assert!(result.features.len() <= 4);
        assert!(result.features.iter().all(|f| f.feature != "const"));
    }

    #[test]
    fn sampled_instance_is_deterministic() {
        let method = LocalSurrogate::new()
            .with_instance(Instance::Sample { seed: 5 })
            .with_k(1);
        let a = method.evaluate(&predictor()).unwrap();
        let b = method.evaluate(&predictor()).unwrap();
        assert_eq!(a.instance_index, b.instance_index);
        assert!(a.instance_index < 30);
    }

    #[test]
    fn invalid_settings() {
        let p = predictor();
        assert!(matches!(
            LocalSurrogate::new().with_k(0).evaluate(&p),
            Err(InterpretError::InvalidK { k: 0, .. })
        ));
        assert!(matches!(
            LocalSurrogate::new().with_k(5).evaluate(&p),
            Err(InterpretError::InvalidK { k: 5, n_features: 4 })
        ));
        assert!(matches!(
            LocalSurrogate::new().with_k(2).with_kernel_width(0.0).evaluate(&p),
            Err(InterpretError::InvalidKernelWidth { .. })
        ));
        assert!(matches!(
            LocalSurrogate::new().with_k(2).with_instance(Instance::Index(30)).evaluate(&p),
            Err(InterpretError::InstanceOutOfRange { index: 30, n_rows: 30 })
        ));
    }
}
