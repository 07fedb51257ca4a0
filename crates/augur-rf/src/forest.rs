//! Bagged regression trees grown in parallel.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{OobMode, RandomForestConfig};
use crate::data::validate_training_data;
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::oob::compute_oob;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{RegressionTree, RegressionTreeConfig};

/// A fitted ensemble; predictions are the mean of its trees.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<RegressionTree>,
    pub(crate) n_features: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Rows drawn (with replacement) for one tree, and the rows it never saw.
struct Bootstrap {
    drawn: Vec<usize>,
    out_of_bag: Vec<usize>,
}

impl Bootstrap {
    fn draw(n_rows: usize, draws: usize, rng: &mut ChaCha8Rng) -> Self {
        let drawn: Vec<usize> = (0..draws).map(|_| rng.gen_range(0..n_rows)).collect();
        let mut seen = vec![false; n_rows];
        for &row in &drawn {
            seen[row] = true;
        }
        let out_of_bag = seen
            .iter()
            .enumerate()
            .filter_map(|(row, &hit)| (!hit).then_some(row))
            .collect();
        Self { drawn, out_of_bag }
    }
}

/// Grow one tree on its own bootstrap. Everything random flows from `seed`.
fn grow(
    tree_config: &RegressionTreeConfig,
    seed: u64,
    draws: usize,
    features: &[Vec<f64>],
    targets: &[f64],
) -> Result<(RegressionTree, Vec<usize>), RfError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let bootstrap = Bootstrap::draw(features.len(), draws, &mut rng);
    let rows: Vec<Vec<f64>> = bootstrap.drawn.iter().map(|&i| features[i].clone()).collect();
    let ys: Vec<f64> = bootstrap.drawn.iter().map(|&i| targets[i]).collect();
    let tree = tree_config.clone().with_seed(rng.r#gen()).fit(&rows, &ys)?;
    Ok((tree, bootstrap.out_of_bag))
}

/// Mean and population variance.
fn moments(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, variance)
}

#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    targets: &[f64],
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    let (n_samples, n_features) = validate_training_data(features, targets)?;
    let max_features_resolved = config.checked_max_features(n_features)?;
    let draws = (n_samples as f64 * config.bootstrap_fraction).ceil() as usize;

    info!(
        n_features,
        max_features = max_features_resolved,
        split_method = %config.split_method,
        min_samples_leaf = config.min_samples_leaf,
        draws,
        "fitting forest"
    );

    let tree_config = RegressionTreeConfig::new()
        .with_split_method(config.split_method)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved));

    // All tree seeds are drawn up front, so the rayon schedule cannot change
    // which tree gets which seed.
    let mut master = ChaCha8Rng::seed_from_u64(config.seed);
    let seeds: Vec<u64> = (0..config.n_trees).map(|_| master.r#gen()).collect();
    let grown: Vec<(RegressionTree, Vec<usize>)> = seeds
        .into_par_iter()
        .map(|seed| grow(&tree_config, seed, draws, features, targets))
        .collect::<Result<_, RfError>>()?;
    let (trees, out_of_bag): (Vec<_>, Vec<_>) = grown.into_iter().unzip();
    debug!(n_trees = trees.len(), "trees grown");

    let per_tree: Vec<Vec<f64>> = trees.iter().map(RegressionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree, feature_names);

    let oob_score = match config.oob_mode {
        OobMode::Enabled => Some(compute_oob(&trees, features, targets, &out_of_bag)?),
        OobMode::Disabled => None,
    };

    let (mean_tree_depth, mean_tree_leaves) = TrainingMetadata::tree_shape(&trees);
    let (target_mean, target_variance) = moments(targets);
    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_samples,
        max_features_resolved,
        split_method: config.split_method,
        min_samples_leaf: config.min_samples_leaf,
        max_depth: config.max_depth,
        seed: config.seed,
        target_mean,
        target_variance,
        mean_tree_depth,
        mean_tree_leaves,
    };

    info!(
        oob_mse = oob_score.as_ref().map(|s| s.mse),
        oob_r2 = oob_score.as_ref().map(|s| s.r2),
        mean_tree_depth,
        "forest fitted"
    );

    let forest = RandomForest {
        trees,
        n_features,
        feature_names: feature_names.to_vec(),
    };
    Ok(RandomForestResult::new(forest, importances, oob_score, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaxFeatures;
    use crate::metrics::r2_score;
    use crate::split::SplitMethod;

    /// A step in `x` plus a small slope; `noise` is a periodic nuisance column.
    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
        let features: Vec<Vec<f64>> = (0..80)
            .map(|i| vec![f64::from(i) / 8.0, f64::from(i % 5)])
            .collect();
        let targets: Vec<f64> = features
            .iter()
            .map(|r| (if r[0] < 5.0 { 2.0 } else { 10.0 }) + 0.1 * r[0])
            .collect();
        (features, targets, vec!["x".to_string(), "noise".to_string()])
    }

    fn config(n_trees: usize) -> RandomForestConfig {
        RandomForestConfig::new(n_trees)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .with_seed(3)
    }

    #[test]
    fn bootstrap_partitions_rows() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let bootstrap = Bootstrap::draw(50, 50, &mut rng);
        assert_eq!(bootstrap.drawn.len(), 50);
        assert!(!bootstrap.out_of_bag.is_empty());
        for row in &bootstrap.out_of_bag {
            assert!(!bootstrap.drawn.contains(row));
        }
        for row in 0..50 {
            assert!(bootstrap.drawn.contains(&row) || bootstrap.out_of_bag.contains(&row));
        }
    }

    #[test]
    fn fits_a_step() {
        let (features, targets, names) = step_data();
        for method in [SplitMethod::Exact, SplitMethod::ExtraTrees] {
            let result = config(40)
                .with_min_samples_leaf(1)
                .with_split_method(method)
                .fit(&features, &targets, &names)
                .unwrap();
            let predictions = result.forest().predict_batch(&features).unwrap();
            let r2 = r2_score(&targets, &predictions);
            assert!(r2 > 0.9, "{method}: r2 = {r2}");
        }
    }

    #[test]
    fn out_of_bag_score_on_request() {
        let (features, targets, names) = step_data();
        let plain = config(30).fit(&features, &targets, &names).unwrap();
        assert!(plain.oob_score().is_none());

        let scored = config(30)
            .with_oob_mode(OobMode::Enabled)
            .fit(&features, &targets, &names)
            .unwrap();
        let oob = scored.oob_score().unwrap();
        assert!(oob.r2 > 0.8, "oob r2 = {}", oob.r2);
        assert!(oob.n_oob_samples > 0 && oob.n_oob_samples <= 80);
    }

    #[test]
    fn step_feature_ranks_first() {
        let (features, targets, names) = step_data();
        let result = config(20).fit(&features, &targets, &names).unwrap();
        let ranked = result.importances();
        assert_eq!(ranked[0].name, "x");
        assert_eq!(ranked[0].rank, 1);
        let total: f64 = ranked.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10);
    }

    #[test]
    fn seed_fixes_every_prediction() {
        let (features, targets, names) = step_data();
        let fit = |seed| {
            RandomForestConfig::new(8)
                .unwrap()
                .with_seed(seed)
                .fit(&features, &targets, &names)
                .unwrap()
                .into_forest()
                .predict_batch(&features)
                .unwrap()
        };
        assert_eq!(fit(17), fit(17));
    }

    #[test]
    fn rejects_bad_input_before_growing() {
        assert!(matches!(
            config(4).fit(&[], &[], &[]),
            Err(RfError::EmptyDataset)
        ));
        let (features, targets, names) = step_data();
        assert!(matches!(
            config(4)
                .with_bootstrap_fraction(0.0)
                .fit(&features, &targets, &names),
            Err(RfError::InvalidBootstrapFraction { .. })
        ));
    }

    #[test]
    fn moments_of_targets() {
        let (mean, variance) = moments(&[1.0, 3.0, 5.0, 7.0]);
        assert!((mean - 4.0).abs() < 1e-12);
        assert!((variance - 5.0).abs() < 1e-12);
    }
}
