//! Quantile-stratified k-fold cross-validation for random forest regression.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::config::RandomForestConfig;
use crate::data::validate_training_data;
use crate::error::RfError;
use crate::metrics::{mean_squared_error, r2_score};

/// K-fold cross-validation whose folds each span the whole target range.
///
/// Rows are binned into `n_groups` target quantiles (5 by default) and each
/// bin is shuffled with `seed` (42 by default) before being dealt to folds.
#[derive(Debug, Clone)]
pub struct CrossValidation {
    n_folds: usize,
    seed: u64,
    n_groups: usize,
}

/// Held-out scores of every fold and their summary.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CrossValidationResult {
    pub fold_mse: Vec<f64>,
    pub fold_r2: Vec<f64>,
    pub mean_mse: f64,
    /// Population standard deviation over `fold_mse`.
    pub std_mse: f64,
    pub mean_r2: f64,
    pub n_folds: usize,
    pub n_samples: usize,
    pub n_features: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FoldScore {
    pub(crate) mse: f64,
    pub(crate) r2: f64,
}

impl CrossValidation {
    /// # Errors
    ///
    /// [`RfError::InvalidFoldCount`] for fewer than two folds.
    pub fn new(n_folds: usize) -> Result<Self, RfError> {
        if n_folds < 2 {
            return Err(RfError::InvalidFoldCount { n_folds });
        }
        Ok(Self {
            n_folds,
            seed: 42,
            n_groups: 5,
        })
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of target quantile bins; 0 is read as 1, which disables
    /// stratification.
    #[must_use]
    pub fn with_groups(mut self, n_groups: usize) -> Self {
        self.n_groups = n_groups.max(1);
        self
    }

    /// Score one forest configuration. The model for fold `k` is fitted on
    /// the other folds with seed `config.seed + k`.
    ///
    /// # Errors
    ///
    /// [`RfError::TooFewSamplesForFolds`] when some fold would be empty, and
    /// anything [`RandomForestConfig::fit`] returns.
    #[instrument(skip_all, fields(n_folds = self.n_folds, n_samples = features.len()))]
    pub fn evaluate(
        &self,
        config: &RandomForestConfig,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<CrossValidationResult, RfError> {
        let (n_samples, n_features) = validate_training_data(features, targets)?;
        let assignments = self.fold_assignments(targets)?;

        let scores = (0..self.n_folds)
            .map(|fold| {
                let fold_config = config.clone().with_seed(config.seed.wrapping_add(fold as u64));
                let score =
                    score_fold(&fold_config, features, targets, feature_names, &assignments, fold)?;
                debug!(fold, mse = score.mse, r2 = score.r2, "fold scored");
                Ok(score)
            })
            .collect::<Result<Vec<_>, RfError>>()?;

        let result = summarize(&scores, n_samples, n_features);
        info!(
            mean_mse = result.mean_mse,
            std_mse = result.std_mse,
            mean_r2 = result.mean_r2,
            "cross-validated"
        );
        Ok(result)
    }

    /// Fold number of every row.
    pub(crate) fn fold_assignments(&self, targets: &[f64]) -> Result<Vec<usize>, RfError> {
        if targets.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if targets.len() < self.n_folds {
            return Err(RfError::TooFewSamplesForFolds {
                count: targets.len(),
                n_folds: self.n_folds,
            });
        }

        let mut bins: Vec<Vec<usize>> = vec![Vec::new(); self.n_groups];
        for (row, bin) in quantile_groups(targets, self.n_groups).into_iter().enumerate() {
            bins[bin].push(row);
        }

        // The deal continues across bins, so a run of small bins does not
        // pile into fold 0.
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut folds = vec![0usize; targets.len()];
        let mut dealt = 0;
        for bin in &mut bins {
            bin.shuffle(&mut rng);
            for &row in bin.iter() {
                folds[row] = dealt % self.n_folds;
                dealt += 1;
            }
        }
        Ok(folds)
    }
}

#[derive(Default)]
struct Part {
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
}

/// Fit on every fold but `fold`, then score on `fold`.
pub(crate) fn score_fold(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    targets: &[f64],
    feature_names: &[String],
    folds: &[usize],
    fold: usize,
) -> Result<FoldScore, RfError> {
    let (mut fit_part, mut held_out) = (Part::default(), Part::default());
    for ((row, &y), &f) in features.iter().zip(targets).zip(folds) {
        let part = if f == fold { &mut held_out } else { &mut fit_part };
        part.rows.push(row.clone());
        part.targets.push(y);
    }

    let forest = config
        .fit(&fit_part.rows, &fit_part.targets, feature_names)?
        .into_forest();
    let predicted = forest.predict_batch(&held_out.rows)?;
    Ok(FoldScore {
        mse: mean_squared_error(&held_out.targets, &predicted),
        r2: r2_score(&held_out.targets, &predicted),
    })
}

pub(crate) fn summarize(
    scores: &[FoldScore],
    n_samples: usize,
    n_features: usize,
) -> CrossValidationResult {
    let n = scores.len().max(1) as f64;
    let fold_mse: Vec<f64> = scores.iter().map(|s| s.mse).collect();
    let fold_r2: Vec<f64> = scores.iter().map(|s| s.r2).collect();
    let mean_mse = fold_mse.iter().sum::<f64>() / n;
    let std_mse = (fold_mse.iter().map(|m| (m - mean_mse).powi(2)).sum::<f64>() / n).sqrt();
    let mean_r2 = fold_r2.iter().sum::<f64>() / n;
    CrossValidationResult {
        n_folds: scores.len(),
        fold_mse,
        fold_r2,
        mean_mse,
        std_mse,
        mean_r2,
        n_samples,
        n_features,
    }
}

/// Assign each value to one of `n_groups` quantile groups.
///
/// Group breaks are type-7 sample quantiles at `k / n_groups`. A value equal
/// to a break belongs to the lower group.
pub(crate) fn quantile_groups(values: &[f64], n_groups: usize) -> Vec<usize> {
    if values.is_empty() || n_groups <= 1 {
        return vec![0; values.len()];
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let breaks: Vec<f64> = (1..n_groups)
        .map(|k| type7_quantile(&sorted, k as f64 / n_groups as f64))
        .collect();

    values
        .iter()
        .map(|&v| breaks.partition_point(|&b| b < v))
        .collect()
}

fn type7_quantile(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaxFeatures;

    #[test]
    fn smooth_signal_cross_validates_well() {
        let features: Vec<Vec<f64>> = (0..120)
            .map(|i| vec![f64::from(i) / 12.0, f64::from(i % 3)])
            .collect();
        let targets: Vec<f64> = features.iter().map(|r| r[0] * r[0] - 4.0 * r[0]).collect();
        let names = vec!["t".to_string(), "phase".to_string()];
        let forest = RandomForestConfig::new(25)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_min_samples_leaf(2);

        let result = CrossValidation::new(4)
            .unwrap()
            .with_seed(8)
            .evaluate(&forest, &features, &targets, &names)
            .unwrap();
        assert_eq!((result.n_folds, result.n_samples, result.n_features), (4, 120, 2));
        assert_eq!(result.fold_r2.len(), 4);
        assert!(result.mean_r2 > 0.9, "mean r2 {}", result.mean_r2);
        assert!(result.std_mse >= 0.0);
    }

    #[test]
    fn every_fold_gets_every_bin() {
        let targets: Vec<f64> = (0..60).map(|i| f64::from(59 - i)).collect();
        let folds = CrossValidation::new(3)
            .unwrap()
            .with_groups(4)
            .with_seed(1)
            .fold_assignments(&targets)
            .unwrap();
        let bins = quantile_groups(&targets, 4);
        for fold in 0..3 {
            let members: Vec<usize> = (0..60).filter(|&row| folds[row] == fold).collect();
            assert_eq!(members.len(), 20);
            for bin in 0..4 {
                assert_eq!(
                    members.iter().filter(|&&row| bins[row] == bin).count(),
                    5,
                    "fold {fold} bin {bin}"
                );
            }
        }
    }

    #[test]
    fn seed_fixes_the_folds() {
        let targets: Vec<f64> = (0..41).map(|i| f64::from(i % 13)).collect();
        let cv = |seed| {
            CrossValidation::new(6)
                .unwrap()
                .with_seed(seed)
                .fold_assignments(&targets)
                .unwrap()
        };
        assert_eq!(cv(2), cv(2));
        assert_ne!(cv(2), cv(3));
    }

    #[test]
    fn quantile_bins() {
        let values: Vec<f64> = (1..=8).map(f64::from).collect();
        assert_eq!(quantile_groups(&values, 4), vec![0, 0, 1, 1, 2, 2, 3, 3]);
        assert_eq!(quantile_groups(&[2.5; 5], 3), vec![0; 5]);
        assert_eq!(quantile_groups(&values, 1), vec![0; 8]);
    }

    #[test]
    fn summary_statistics() {
        let scores = [
            FoldScore { mse: 1.0, r2: 0.5 },
            FoldScore { mse: 3.0, r2: 0.7 },
        ];
        let summary = summarize(&scores, 10, 2);
        assert!((summary.mean_mse - 2.0).abs() < 1e-12);
        assert!((summary.std_mse - 1.0).abs() < 1e-12);
        assert!((summary.mean_r2 - 0.6).abs() < 1e-12);
    }

    #[test]
    fn fold_count_limits() {
        assert!(matches!(
            CrossValidation::new(1),
            Err(RfError::InvalidFoldCount { n_folds: 1 })
        ));
        let err = CrossValidation::new(4)
            .unwrap()
            .evaluate(
                &RandomForestConfig::new(2).unwrap(),
                &[vec![0.0], vec![1.0]],
                &[0.0, 1.0],
                &["x".to_string()],
            )
            .unwrap_err();
        assert!(matches!(err, RfError::TooFewSamplesForFolds { count: 2, n_folds: 4 }));
    }
}
