//! Friedman's H-statistic for the overall interaction strength of each feature.

use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use crate::error::InterpretError;
use crate::method::Method;
use crate::model::Model;
use crate::predictor::Predictor;
use crate::stats::mean;

/// Variance below which a centred prediction is treated as flat.
const FLAT_VARIANCE: f64 = 1e-12;

/// Overall interaction strength configuration.
///
/// The statistic needs `grid_size²` predictions per feature, so the data is
/// subsampled to `grid_size` rows (all rows when there are fewer).
///
/// # Defaults
///
/// | Parameter   | Default |
/// |-------------|---------|
/// | `grid_size` | 30      |
/// | `seed`      | 42      |
#[derive(Debug, Clone)]
pub struct Interaction {
    grid_size: usize,
    seed: u64,
}

/// H-statistic of one feature.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InteractionEntry {
    /// Feature name.
    pub feature: String,
    /// Share of prediction variance explained by interactions, in [0, 1].
    pub h_statistic: f64,
}

/// Result of [`Interaction`], in feature order.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InteractionStrength {
    /// Number of data points the statistic was computed on.
    pub n_points: usize,
    /// One entry per feature.
    pub features: Vec<InteractionEntry>,
}

impl Interaction {
    /// Create a config using `grid_size` data points.
    #[must_use]
    pub fn new(grid_size: usize) -> Self {
        Self { grid_size, seed: 42 }
    }

    /// Set the subsampling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new(30)
    }
}

impl Method for Interaction {
    type Output = InteractionStrength;

    fn name(&self) -> &'static str {
        "interaction"
    }

    /// Compute `H_j` for every feature `j`:
    ///
    /// `H_j² = Σᵢ [f(xᵢ) − PD_j(xᵢⱼ) − PD₋ⱼ(xᵢ,₋ⱼ)]² / Σᵢ f(xᵢ)²`
    ///
    /// with all three functions centred to mean zero over the points.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InterpretError::InvalidGridSize`] | `grid_size < 2` |
    /// | [`InterpretError::Prediction`] | model failure |
    #[instrument(skip_all, fields(grid_size = self.grid_size))]
    fn evaluate<M: Model>(
        &self,
        predictor: &Predictor<M>,
    ) -> Result<InteractionStrength, InterpretError> {
        if self.grid_size < 2 {
            return Err(InterpretError::InvalidGridSize {
                grid_size: self.grid_size,
                min: 2,
            });
        }
        let points = self.sample_points(predictor);
        let n = points.len();
        let f = centred(predictor.predict(&points)?);
        let total: f64 = f.iter().map(|v| v * v).sum();

        let features = (0..predictor.n_features())
            .into_par_iter()
            .map(|j| {
                let name = &predictor.feature_names()[j];
                let h = if total / n as f64 <= FLAT_VARIANCE {
                    0.0
                } else {
                    h_statistic(predictor, &points, &f, total, j)?
                };
                debug!(feature = %name, h, "interaction computed");
                Ok(InteractionEntry {
                    feature: name.clone(),
                    h_statistic: h,
                })
            })
            .collect::<Result<Vec<_>, InterpretError>>()?;

        if total / n as f64 <= FLAT_VARIANCE {
            warn!("model predictions are flat over the sample, reporting H = 0");
        }
        info!(n_points = n, "interaction strength complete");
        Ok(InteractionStrength {
            n_points: n,
            features,
        })
    }
}

impl Interaction {
    fn sample_points<M: Model>(&self, predictor: &Predictor<M>) -> Vec<Vec<f64>> {
        let n_rows = predictor.n_rows();
        if n_rows <= self.grid_size {
            return predictor.rows().to_vec();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut picked = index::sample(&mut rng, n_rows, self.grid_size).into_vec();
        picked.sort_unstable();
        picked.iter().map(|&i| predictor.rows()[i].clone()).collect()
    }
}

fn centred(mut values: Vec<f64>) -> Vec<f64> {
    let m = mean(&values);
    values.iter_mut().for_each(|v| *v -= m);
    values
}

fn h_statistic<M: Model>(
    predictor: &Predictor<M>,
    points: &[Vec<f64>],
    f: &[f64],
    total: f64,
    j: usize,
) -> Result<f64, InterpretError> {
    let n = points.len();
    // grid[i * n + k] = f(x_k with x_j := x_ij)
    let grid: Vec<Vec<f64>> = (0..n)
        .flat_map(|i| {
            points.iter().map(move |row| {
                let mut row = row.clone();
                row[j] = points[i][j];
                row
            })
        })
        .collect();
    let preds = predictor.predict(&grid)?;

    let pd_j = centred((0..n).map(|i| mean(&preds[i * n..(i + 1) * n])).collect());
    let pd_rest = centred(
        (0..n)
            .map(|i| (0..n).map(|k| preds[k * n + i]).sum::<f64>() / n as f64)
            .collect(),
    );

    let numerator: f64 = (0..n)
        .map(|i| (f[i] - pd_j[i] - pd_rest[i]).powi(2))
        .sum();
    Ok((numerator / total).clamp(0.0, 1.0).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FnModel;

    fn rows() -> Vec<Vec<f64>> {
        (0..6)
            .flat_map(|a| (0..6).map(move |b| vec![a as f64, b as f64, (a * b % 3) as f64]))
            .collect()
    }

    #[test]
    fn additive_model_has_no_interaction() {
        let rows = rows();
        let labels = vec![0.0; rows.len()];
        let p = Predictor::new(
            FnModel::new(3, |r: &[f64]| r[0] + 2.0 * r[1]),
            vec!["a".into(), "b".into(), "c".into()],
            rows,
            labels,
        )
        .unwrap();
        let result = Interaction::new(50).evaluate(&p).unwrap();
        assert_eq!(result.n_points, 36);
        for entry in &result.features {
            assert!(entry.h_statistic < 1e-6, "{} = {}", entry.feature, entry.h_statistic);
        }
    }

    #[test]
    fn product_term_interacts() {
        let rows = rows();
        let labels = vec![0.0; rows.len()];
        let p = Predictor::new(
            FnModel::new(3, |r: &[f64]| r[0] * r[1]),
            vec!["a".into(), "b".into(), "c".into()],
            rows,
            labels,
        )
        .unwrap();
        let result = Interaction::new(36).evaluate(&p).unwrap();
        assert!(result.features[0].h_statistic > 0.1);
        assert!(result.features[1].h_statistic > 0.1);
        assert!(result.features[2].h_statistic < 1e-6);
        assert!(result.features.iter().all(|e| (0.0..=1.0).contains(&e.h_statistic)));
    }

    #[test]
    fn flat_model_reports_zero() {
        let rows = rows();
        let labels = vec![0.0; rows.len()];
        let p = Predictor::new(
            FnModel::new(3, |_: &[f64]| 5.0),
            vec!["a".into(), "b".into(), "c".into()],
            rows,
            labels,
        )
        .unwrap();
        let result = Interaction::new(10).evaluate(&p).unwrap();
        assert_eq!(result.n_points, 10);
        assert!(result.features.iter().all(|e| e.h_statistic == 0.0));
    }

    #[test]
    fn grid_size_below_two_rejected() {
        let rows = rows();
        let labels = vec![0.0; rows.len()];
        let p = Predictor::new(
            FnModel::new(3, |r: &[f64]| r[0]),
            vec!["a".into(), "b".into(), "c".into()],
            rows,
            labels,
        )
        .unwrap();
        assert!(matches!(
            Interaction::new(1).evaluate(&p),
            Err(InterpretError::InvalidGridSize { grid_size: 1, .. })
        ));
    }
}
