//! Accuracy regression tests for augur-rf.
//!
//! These tests verify that algorithmic changes do not degrade random forest
//! regression accuracy on a deterministic synthetic dataset.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use augur_rf::{
    CrossValidation, GridSearch, HyperParams, MaxFeatures, OobMode, RandomForest,
    RandomForestConfig, SplitMethod,
};

// ---------------------------------------------------------------------------
// Helper: deterministic synthetic regression dataset
// ---------------------------------------------------------------------------

/// Generate a 300-sample, 8-feature regression dataset.
///
/// `y = 4·f0 + 2·f1² − 3·f2 + noise`, features uniform in [0, 1],
/// noise uniform in [−0.1, 0.1]. Features 3-7 are pure noise.
fn make_regression() -> (Vec<Vec<f64>>, Vec<f64>, Vec<String>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let n_samples = 300;
    let n_features = 8;

    let mut features = Vec::with_capacity(n_samples);
    let mut targets = Vec::with_capacity(n_samples);
    for _ in 0..n_samples {
        let row: Vec<f64> = (0..n_features).map(|_| rng.r#gen::<f64>()).collect();
        let noise = (rng.r#gen::<f64>() - 0.5) * 0.2;
        targets.push(4.0 * row[0] + 2.0 * row[1] * row[1] - 3.0 * row[2] + noise);
        features.push(row);
    }
    let names: Vec<String> = (0..n_features).map(|f| format!("f{f}")).collect();
    (features, targets, names)
}

// ---------------------------------------------------------------------------
// a) cv_r2_above_threshold
// ---------------------------------------------------------------------------

/// 5-fold cross-validation mean R² must exceed 0.75.
#[test]
fn cv_r2_above_threshold() {
    let (features, targets, names) = make_regression();
    let rf_config = RandomForestConfig::new(100)
        .unwrap()
        .with_max_features(MaxFeatures::Fraction(0.5))
        .with_seed(42);
    let cv = CrossValidation::new(5).unwrap().with_seed(42);
    let result = cv.evaluate(&rf_config, &features, &targets, &names).unwrap();

    assert!(result.mean_r2 > 0.75, "cv mean_r2 {} <= 0.75", result.mean_r2);
}

// ---------------------------------------------------------------------------
// b) oob_r2_above_threshold
// ---------------------------------------------------------------------------

/// OOB R² with 100 trees must exceed 0.7.
#[test]
fn oob_r2_above_threshold() {
    let (features, targets, names) = make_regression();
    let rf_config = RandomForestConfig::new(100)
        .unwrap()
        .with_max_features(MaxFeatures::Fraction(0.5))
        .with_seed(42)
        .with_oob_mode(OobMode::Enabled);
    let result = rf_config.fit(&features, &targets, &names).unwrap();

    let oob = result.oob_score().expect("OOB was enabled");
    assert!(oob.r2 > 0.7, "oob r2 {} <= 0.7", oob.r2);
}

// ---------------------------------------------------------------------------
// c) informative_features_rank_first
// ---------------------------------------------------------------------------

/// The three informative features must hold the top three impurity ranks.
#[test]
fn informative_features_rank_first() {
    let (features, targets, names) = make_regression();
    let result = RandomForestConfig::new(100)
        .unwrap()
        .with_max_features(MaxFeatures::All)
        .with_seed(42)
        .fit(&features, &targets, &names)
        .unwrap();

    let mut top: Vec<&str> = result.importances()[..3]
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    top.sort_unstable();
    assert_eq!(top, vec!["f0", "f1", "f2"]);
}

// ---------------------------------------------------------------------------
// d) grid_search_end_to_end
// ---------------------------------------------------------------------------

/// Grid search scores every point and the refitted model round-trips.
#[test]
fn grid_search_end_to_end() {
    let (features, targets, names) = make_regression();
    let grid = vec![
        HyperParams {
            max_features: MaxFeatures::Third,
            split_method: SplitMethod::Exact,
            min_samples_leaf: 5,
            max_depth: None,
        },
        HyperParams {
            max_features: MaxFeatures::Fraction(0.5),
            split_method: SplitMethod::ExtraTrees,
            min_samples_leaf: 5,
            max_depth: None,
        },
    ];
    let result = GridSearch::new(grid, 30)
        .unwrap()
        .with_folds(3)
        .with_seed(65948)
        .fit(&features, &targets, &names)
        .unwrap();
    assert_eq!(result.scores().len(), 2);
    assert!(result.scores().iter().all(|s| s.mean_mse.is_finite()));

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("model.bin");
    let forest = result.into_model().into_forest();
    forest.save(&path).unwrap();
    let loaded = RandomForest::load(&path).unwrap();
    assert_eq!(
        forest.predict_batch(&features).unwrap(),
        loaded.predict_batch(&features).unwrap()
    );
}
