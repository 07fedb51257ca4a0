//! Partial dependence with individual conditional expectation (ICE) curves.

use tracing::{info, instrument, warn};

use crate::effect::{EffectMethod, FeatureEffect};
use crate::error::InterpretError;
use crate::method::Method;
use crate::model::Model;
use crate::predictor::Predictor;
use crate::stats::{min_max, with_feature};

/// PDP + ICE configuration for one feature.
///
/// The grid is `grid_size` equidistant values from the feature's minimum to
/// its maximum. With `center_at`, each ICE curve is shifted so it is zero at
/// that value and the PDP is the mean of the shifted curves.
#[derive(Debug, Clone)]
pub struct PartialDependence {
    feature: String,
    grid_size: usize,
    center_at: Option<f64>,
}

impl PartialDependence {
    /// Create a config for `feature` with a 20-point grid and no centring.
    #[must_use]
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            grid_size: 20,
            center_at: None,
        }
    }

    /// Set the number of grid points.
    #[must_use]
    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Anchor all curves at `value`.
    #[must_use]
    pub fn with_center_at(mut self, center_at: Option<f64>) -> Self {
        self.center_at = center_at;
        self
    }
}

impl Method for PartialDependence {
    type Output = FeatureEffect;

    fn name(&self) -> &'static str {
        "pdp"
    }

    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InterpretError::UnknownFeature`] | feature not in the predictor |
    /// | [`InterpretError::InvalidGridSize`] | `grid_size` is zero |
    /// | [`InterpretError::Prediction`] | model failure |
    #[instrument(skip_all, fields(feature = %self.feature, grid_size = self.grid_size))]
    fn evaluate<M: Model>(&self, predictor: &Predictor<M>) -> Result<FeatureEffect, InterpretError> {
        if self.grid_size == 0 {
            return Err(InterpretError::InvalidGridSize {
                grid_size: 0,
                min: 1,
            });
        }
        let j = predictor.feature_index(&self.feature)?;
        let (lo, hi) = min_max(&predictor.column(j));
        let grid: Vec<f64> = if lo == hi {
            warn!(feature = %self.feature, "constant feature, single-point grid");
            vec![lo]
        } else if self.grid_size == 1 {
            vec![(lo + hi) / 2.0]
        } else {
            let step = (hi - lo) / (self.grid_size - 1) as f64;
            (0..self.grid_size).map(|g| lo + step * g as f64).collect()
        };

        let n_rows = predictor.n_rows();
        let mut ice = vec![Vec::with_capacity(grid.len()); n_rows];
        for &value in &grid {
            let preds = predictor.predict(&with_feature(predictor.rows(), j, value))?;
            for (curve, p) in ice.iter_mut().zip(preds) {
                curve.push(p);
            }
        }

        if let Some(anchor) = self.center_at {
            let anchors = predictor.predict(&with_feature(predictor.rows(), j, anchor))?;
            for (curve, a) in ice.iter_mut().zip(anchors) {
                curve.iter_mut().for_each(|v| *v -= a);
            }
        }

        let average: Vec<f64> = (0..grid.len())
            .map(|g| ice.iter().map(|curve| curve[g]).sum::<f64>() / n_rows as f64)
            .collect();

        info!(n_grid = grid.len(), n_curves = n_rows, "partial dependence complete");
        Ok(FeatureEffect {
            feature: self.feature.clone(),
            method: EffectMethod::PdpIce,
            grid,
            average,
            ice,
            counts: Vec::new(),
            center_at: self.center_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FnModel;

    fn predictor() -> Predictor<FnModel<impl Fn(&[f64]) -> f64 + Sync>> {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, (i % 3) as f64, 4.0]).collect();
        let labels = vec![0.0; rows.len()];
        Predictor::new(
            FnModel::new(3, |r: &[f64]| 3.0 * r[0] + r[0] * r[1]),
            vec!["x".into(), "z".into(), "flat".into()],
            rows,
            labels,
        )
        .unwrap()
    }

    #[test]
    fn pdp_is_mean_of_ice() {
        let effect = PartialDependence::new("x")
            .with_grid_size(5)
            .evaluate(&predictor())
            .unwrap();
        assert_eq!(effect.grid, vec![0.0, 2.25, 4.5, 6.75, 9.0]);
        assert_eq!(effect.ice.len(), 10);
        for g in 0..5 {
            let mean: f64 = effect.ice.iter().map(|c| c[g]).sum::<f64>() / 10.0;
            assert!((effect.average[g] - mean).abs() < 1e-12);
        }
        // Mean of z over rows is 0.9, so the PDP slope is 3.9.
        assert!((effect.average[4] - effect.average[0] - 9.0 * 3.9).abs() < 1e-9);
    }

    #[test]
    fn centred_curves_are_zero_at_anchor() {
        let effect = PartialDependence::new("x")
            .with_grid_size(10)
            .with_center_at(Some(0.0))
            .evaluate(&predictor())
            .unwrap();
        assert_eq!(effect.grid[0], 0.0);
        for curve in &effect.ice {
            assert!(curve[0].abs() < 1e-12);
        }
        assert!(effect.average[0].abs() < 1e-12);
    }

    #[test]
    fn constant_feature_single_point() {
        let effect = PartialDependence::new("flat").evaluate(&predictor()).unwrap();
        assert_eq!(effect.grid, vec![4.0]);
        assert_eq!(effect.average.len(), 1);
    }

    #[test]
    fn unknown_feature_and_zero_grid() {
        assert!(matches!(
            PartialDependence::new("nope").evaluate(&predictor()),
            Err(InterpretError::UnknownFeature { .. })
        ));
        assert!(matches!(
            PartialDependence::new("x").with_grid_size(0).evaluate(&predictor()),
            Err(InterpretError::InvalidGridSize { .. })
        ));
    }
}
