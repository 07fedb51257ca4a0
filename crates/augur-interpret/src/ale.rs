//! Accumulated local effects (ALE) for one numeric feature.

use tracing::{debug, info, instrument, warn};

use crate::effect::{EffectMethod, FeatureEffect};
use crate::error::InterpretError;
use crate::method::Method;
use crate::model::Model;
use crate::predictor::Predictor;
use crate::stats::{quantile_sorted, unique_sorted};

/// ALE configuration for one feature.
///
/// Interval borders are the `k / grid_size` quantiles of the feature
/// (duplicates removed), so `grid_size` is the maximum number of intervals.
#[derive(Debug, Clone)]
pub struct AccumulatedLocalEffects {
    feature: String,
    grid_size: usize,
}

impl AccumulatedLocalEffects {
    /// Create a config for `feature` with up to 20 intervals.
    #[must_use]
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            grid_size: 20,
        }
    }

    /// Set the number of quantile intervals.
    #[must_use]
    pub fn with_grid_size(mut self, grid_size: usize) -> Self {
        self.grid_size = grid_size;
        self
    }
}

impl Method for AccumulatedLocalEffects {
    type Output = FeatureEffect;

    fn name(&self) -> &'static str {
        "ale"
    }

    /// For each interval, average `f(upper border) − f(lower border)` over
    /// the rows inside it, accumulate along the borders, then subtract the
    /// count-weighted mean so the curve has mean zero over the data.
    ///
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
        let column = predictor.column(j);
        let mut sorted = column.clone();
        sorted.sort_by(f64::total_cmp);
        let borders = unique_sorted(
            &(0..=self.grid_size)
                .map(|k| quantile_sorted(&sorted, k as f64 / self.grid_size as f64))
                .collect::<Vec<_>>(),
        );

        if borders.len() < 2 {
            warn!(feature = %self.feature, "constant feature, ALE is zero");
            return Ok(FeatureEffect {
                feature: self.feature.clone(),
                method: EffectMethod::Ale,
                grid: borders,
                average: vec![0.0],
                ice: Vec::new(),
                counts: Vec::new(),
                center_at: None,
            });
        }
        let n_intervals = borders.len() - 1;

        // Interval k covers (borders[k], borders[k + 1]]; the minimum joins interval 0.
        let interval_of: Vec<usize> = column
            .iter()
            .map(|&x| borders.partition_point(|&b| b < x).saturating_sub(1).min(n_intervals - 1))
            .collect();

        let lower_rows: Vec<Vec<f64>> = predictor
            .rows()
            .iter()
            .zip(&interval_of)
            .map(|(row, &k)| {
                let mut row = row.clone();
                row[j] = borders[k];
                row
            })
            .collect();
        let upper_rows: Vec<Vec<f64>> = lower_rows
            .iter()
            .zip(&interval_of)
            .map(|(row, &k)| {
                let mut row = row.clone();
                row[j] = borders[k + 1];
                row
            })
            .collect();
        let lower = predictor.predict(&lower_rows)?;
        let upper = predictor.predict(&upper_rows)?;

        let mut sums = vec![0.0f64; n_intervals];
        let mut counts = vec![0usize; n_intervals];
        for ((&k, lo), hi) in interval_of.iter().zip(&lower).zip(&upper) {
            sums[k] += hi - lo;
            counts[k] += 1;
        }

        let mut accumulated = Vec::with_capacity(borders.len());
        accumulated.push(0.0);
        let mut running = 0.0;
        for k in 0..n_intervals {
            if counts[k] > 0 {
                running += sums[k] / counts[k] as f64;
            } else {
                debug!(interval = k, "empty interval");
            }
            accumulated.push(running);
        }

        // Each interval contributes the mean of its two end values, weighted by its rows.
        let n_rows = predictor.n_rows() as f64;
        let offset: f64 = (0..n_intervals)
            .map(|k| counts[k] as f64 * (accumulated[k] + accumulated[k + 1]) / 2.0)
            .sum::<f64>()
            / n_rows;
        let average: Vec<f64> = accumulated.iter().map(|a| a - offset).collect();

        info!(n_intervals, "accumulated local effects complete");
        Ok(FeatureEffect {
            feature: self.feature.clone(),
            method: EffectMethod::Ale,
            grid: borders,
            average,
            ice: Vec::new(),
            counts,
            center_at: None,
        })
    }
}

/// Mean effect implied by an ALE curve, weighted by interval counts.
#[must_use]
pub fn weighted_mean_effect(effect: &FeatureEffect) -> f64 {
    let total: usize = effect.counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    effect
        .counts
        .iter()
        .enumerate()
        .map(|(k, &c)| c as f64 * (effect.average[k] + effect.average[k + 1]) / 2.0)
        .sum::<f64>()
        / total as f64
}
