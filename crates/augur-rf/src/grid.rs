//! Cross-validated grid search over random forest hyperparameters.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{MaxFeatures, OobMode, RandomForestConfig};
use crate::data::validate_training_data;
use crate::error::RfError;
use crate::eval::{CrossValidation, FoldScore, score_fold, summarize};
use crate::result::RandomForestResult;
use crate::split::SplitMethod;

/// One point of the hyperparameter grid.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HyperParams {
    /// Features considered per split.
    pub max_features: MaxFeatures,
    /// Split-finding strategy.
    pub split_method: SplitMethod,
    /// Minimum samples in each leaf.
    pub min_samples_leaf: usize,
    /// Maximum tree depth, `None` for unlimited.
    #[serde(default)]
    pub max_depth: Option<usize>,
}

impl HyperParams {
    /// Build a forest config for this grid point.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn to_config(&self, n_trees: usize, seed: u64) -> Result<RandomForestConfig, RfError> {
        Ok(RandomForestConfig::new(n_trees)?
            .with_max_features(self.max_features)
            .with_split_method(self.split_method)
            .with_min_samples_leaf(self.min_samples_leaf)
            .with_max_depth(self.max_depth)
            .with_seed(seed))
    }

    fn validate(&self, n_features: usize) -> Result<(), RfError> {
        self.max_features.resolve(n_features)?;
        if self.min_samples_leaf < 1 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        if self.max_depth == Some(0) {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        Ok(())
    }
}

impl std::fmt::Display for HyperParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "max_features={} split={} min_samples_leaf={}",
            self.max_features, self.split_method, self.min_samples_leaf
        )?;
        if let Some(depth) = self.max_depth {
            write!(f, " max_depth={depth}")?;
        }
        Ok(())
    }
}

/// Cross-validated score of one grid point.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GridScore {
    /// The evaluated hyperparameters.
    pub params: HyperParams,
    /// Mean held-out MSE across folds.
    pub mean_mse: f64,
    /// Population standard deviation of the fold MSEs.
    pub std_mse: f64,
    /// Mean held-out R² across folds.
    pub mean_r2: f64,
}

/// Grid search over [`HyperParams`] with k-fold cross-validation.
///
/// # Defaults
///
/// | Parameter  | Default |
/// |------------|---------|
/// | `n_folds`  | 5       |
/// | `seed`     | 42      |
/// | `n_groups` | 5       |
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: Vec<HyperParams>,
    n_trees: usize,
    n_folds: usize,
    seed: u64,
    n_groups: usize,
}

/// Outcome of a grid search: every score plus the refitted best model.
#[derive(Debug)]
pub struct GridSearchResult {
    scores: Vec<GridScore>,
    best_index: usize,
    model: RandomForestResult,
}

impl GridSearchResult {
    /// Scores in grid order.
    #[must_use]
    pub fn scores(&self) -> &[GridScore] {
        &self.scores
    }

    /// Index of the selected grid point.
    #[must_use]
    pub fn best_index(&self) -> usize {
        self.best_index
    }

    /// The selected hyperparameters.
    #[must_use]
    pub fn best_params(&self) -> HyperParams {
        self.scores[self.best_index].params
    }

    /// The model refitted on the full training set.
    #[must_use]
    pub fn model(&self) -> &RandomForestResult {
        &self.model
    }

    /// Consume the search result and return the refitted model.
    #[must_use]
    pub fn into_model(self) -> RandomForestResult {
        self.model
    }
}

impl GridSearch {
    /// Create a grid search.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyGrid`] | `grid` is empty |
    /// | [`RfError::InvalidTreeCount`] | `n_trees` is zero |
    pub fn new(grid: Vec<HyperParams>, n_trees: usize) -> Result<Self, RfError> {
        if grid.is_empty() {
            return Err(RfError::EmptyGrid);
        }
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            grid,
            n_trees,
            n_folds: 5,
            seed: 42,
            n_groups: 5,
        })
    }

    /// Set the number of CV folds. Validated in [`GridSearch::fit`].
    #[must_use]
    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    /// Set the seed used for fold assignment and every forest fit.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of outcome quantile groups for fold stratification.
    #[must_use]
    pub fn with_groups(mut self, n_groups: usize) -> Self {
        self.n_groups = n_groups;
        self
    }

    /// Score every grid point by k-fold CV, pick the lowest mean MSE, and
    /// refit it on all samples with OOB evaluation enabled.
    ///
    /// Every (grid point, fold) pair is an independent job on the rayon
    /// pool. Fold `k` always trains with seed `seed + k`, so the scores do
    /// not depend on the number of worker threads. Exact ties go to the
    /// earlier grid point.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::InvalidFoldCount`] | fewer than 2 folds |
    /// | [`RfError::TooFewSamplesForFolds`] | fewer samples than folds |
    /// | [`RfError::InvalidMaxFeatures`] | a grid point resolves outside [1, n_features] |
    /// | [`RfError::InvalidMinSamplesLeaf`] | a grid point has `min_samples_leaf == 0` |
    /// | [`RfError::InvalidMaxDepth`] | a grid point has `max_depth == Some(0)` |
    /// | Other RF errors | input validation and training |
    #[instrument(skip_all, fields(
        grid_size = self.grid.len(),
        n_folds = self.n_folds,
        n_samples = features.len(),
    ))]
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<GridSearchResult, RfError> {
        let (n_samples, n_features) = validate_training_data(features, targets)?;
        for params in &self.grid {
            params.validate(n_features)?;
        }

        let cv = CrossValidation::new(self.n_folds)?
            .with_seed(self.seed)
            .with_groups(self.n_groups);
        let assignments = cv.fold_assignments(targets)?;

        info!(
            grid_size = self.grid.len(),
            n_folds = self.n_folds,
            n_trees = self.n_trees,
            "starting grid search"
        );

        let jobs: Vec<(usize, usize)> = (0..self.grid.len())
            .flat_map(|point| (0..self.n_folds).map(move |fold| (point, fold)))
            .collect();

        let fold_scores: Vec<FoldScore> = jobs
            .into_par_iter()
            .map(|(point, fold)| {
                let config = self.grid[point]
                    .to_config(self.n_trees, self.seed.wrapping_add(fold as u64))?;
                let score = score_fold(&config, features, targets, feature_names, &assignments, fold)?;
                debug!(point, fold, mse = score.mse, "grid job complete");
                Ok(score)
            })
            .collect::<Result<_, RfError>>()?;

        let scores: Vec<GridScore> = self
            .grid
            .iter()
            .zip(fold_scores.chunks(self.n_folds))
            .map(|(&params, chunk)| {
                let cv_result = summarize(chunk, n_samples, n_features);
                GridScore {
                    params,
                    mean_mse: cv_result.mean_mse,
                    std_mse: cv_result.std_mse,
                    mean_r2: cv_result.mean_r2,
                }
            })
            .collect();

        let best_index = select_best(&scores);
        let best = &scores[best_index];
        info!(
            best_index,
            params = %best.params,
            mean_mse = best.mean_mse,
            mean_r2 = best.mean_r2,
            "grid search selected hyperparameters"
        );

        let model = best
            .params
            .to_config(self.n_trees, self.seed)?
            .with_oob_mode(OobMode::Enabled)
            .fit(features, targets, feature_names)?;

        Ok(GridSearchResult {
            scores,
            best_index,
            model,
        })
    }
}

/// Index of the lowest mean MSE; the first one wins on exact ties.
fn select_best(scores: &[GridScore]) -> usize {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate().skip(1) {
        if score.mean_mse < scores[best].mean_mse {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(max_features: MaxFeatures, min_samples_leaf: usize) -> HyperParams {
        HyperParams {
            max_features,
            split_method: SplitMethod::Exact,
            min_samples_leaf,
            max_depth: None,
        }
    }

    fn make_data() -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
        let features: Vec<Vec<f64>> = (0..80)
            .map(|i| vec![i as f64, ((i * 13) % 7) as f64])
            .collect();
        let targets: Vec<f64> = features.iter().map(|r| 0.5 * r[0]).collect();
        let names = vec!["signal".to_string(), "noise".to_string()];
        (features, targets, names)
    }

    fn score(mean_mse: f64) -> GridScore {
        GridScore {
            params: params(MaxFeatures::All, 1),
            mean_mse,
            std_mse: 0.0,
            mean_r2: 0.0,
        }
    }

    #[test]
    fn tie_goes_to_first_point() {
        assert_eq!(select_best(&[score(2.0), score(1.0), score(1.0)]), 1);
        assert_eq!(select_best(&[score(1.0), score(1.0)]), 0);
    }

    #[test]
    fn empty_grid_rejected() {
        assert!(matches!(GridSearch::new(vec![], 10), Err(RfError::EmptyGrid)));
    }

    #[test]
    fn invalid_point_rejected_before_training() {
        let (features, targets, names) = make_data();
        let search = GridSearch::new(vec![params(MaxFeatures::Fixed(5), 1)], 5).unwrap();
        let err = search.fit(&features, &targets, &names).unwrap_err();
        assert!(matches!(err, RfError::InvalidMaxFeatures { .. }));
    }

    #[test]
    fn selects_lowest_mse_and_refits_with_oob() {
        let (features, targets, names) = make_data();
        let grid = vec![params(MaxFeatures::All, 1), params(MaxFeatures::All, 30)];
        let result = GridSearch::new(grid, 15)
            .unwrap()
            .with_folds(4)
            .with_seed(7)
            .fit(&features, &targets, &names)
            .unwrap();

        assert_eq!(result.scores().len(), 2);
        assert_eq!(result.best_index(), 0);
        assert!(result.scores()[0].mean_mse < result.scores()[1].mean_mse);
        assert!(result.model().oob_score().is_some());
        assert_eq!(result.model().metadata().n_trees, 15);
    }

    #[test]
    fn scores_independent_of_thread_count() {
        let (features, targets, names) = make_data();
        let search = GridSearch::new(
            vec![params(MaxFeatures::All, 2), params(MaxFeatures::Fixed(1), 2)],
            8,
        )
        .unwrap()
        .with_folds(3);

        let run = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| search.fit(&features, &targets, &names).unwrap())
        };
        let single = run(1);
        let multi = run(4);
        for (a, b) in single.scores().iter().zip(multi.scores()) {
            assert_eq!(a.mean_mse, b.mean_mse);
        }
    }
}
