//! Hyperparameters of a forest fit.

use crate::error::RfError;
use crate::result::RandomForestResult;
use crate::split::SplitMethod;

/// How many candidate features each split draws.
///
/// Serialized in kebab case (`"sqrt"`, `"third"`, `{ fraction = 0.5 }`) so it
/// can be written directly in a run config.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaxFeatures {
    /// `ceil(sqrt(p))`.
    Sqrt,
    /// `ceil(log2(p))`, at least one.
    Log2,
    /// `floor(p / 3)`, at least one.
    Third,
    /// `ceil(p * f)` for `f` in `(0, 1]`.
    Fraction(f64),
    /// Exactly this many.
    Fixed(usize),
    /// Every feature, which turns the forest into plain bagging.
    All,
}

impl MaxFeatures {
    /// Candidate count for `n_features` columns.
    ///
    /// # Errors
    ///
    /// [`RfError::InvalidMaxFeatures`] if the count is zero or larger than
    /// `n_features`.
    pub fn resolve(self, n_features: usize) -> Result<usize, RfError> {
        let p = n_features as f64;
        let count = match self {
            Self::Sqrt => p.sqrt().ceil() as usize,
            Self::Log2 => p.log2().ceil().max(1.0) as usize,
            Self::Third => (p / 3.0).floor().max(1.0) as usize,
            Self::Fraction(f) => (p * f).ceil() as usize,
            Self::Fixed(count) => count,
            Self::All => n_features,
        };
        if (1..=n_features).contains(&count) {
            Ok(count)
        } else {
            Err(RfError::InvalidMaxFeatures {
                max_features: count,
                n_features,
            })
        }
    }
}

impl std::fmt::Display for MaxFeatures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqrt => f.write_str("sqrt"),
            Self::Log2 => f.write_str("log2"),
            Self::Third => f.write_str("third"),
            Self::Fraction(frac) => write!(f, "fraction({frac})"),
            Self::Fixed(count) => write!(f, "{count}"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Whether a fit also scores each row with the trees that never saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobMode {
    Enabled,
    Disabled,
}

/// Settings for [`RandomForestConfig::fit`].
///
/// | Setting              | Default     | Valid range              |
/// |----------------------|-------------|--------------------------|
/// | `n_trees`            | (required)  | >= 1                     |
/// | `max_features`       | `Third`     | resolves to `1..=p`      |
/// | `max_depth`          | unlimited   | `None` or >= 1           |
/// | `min_samples_split`  | 2           | >= 2                     |
/// | `min_samples_leaf`   | 5           | >= 1                     |
/// | `split_method`       | `Exact`     |                          |
/// | `seed`               | 42          |                          |
/// | `oob_mode`           | `Disabled`  |                          |
/// | `bootstrap_fraction` | 1.0         | `(0, 1]`                 |
///
/// Ranges other than `n_trees` are checked when fitting, since
/// `max_features` can only be resolved against the data.
#[derive(Debug, Clone)]
pub struct RandomForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) max_features: MaxFeatures,
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    pub(crate) split_method: SplitMethod,
    pub(crate) seed: u64,
    pub(crate) oob_mode: OobMode,
    pub(crate) bootstrap_fraction: f64,
}

impl RandomForestConfig {
    /// # Errors
    ///
    /// [`RfError::InvalidTreeCount`] when `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, RfError> {
        if n_trees == 0 {
            return Err(RfError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            max_features: MaxFeatures::Third,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 5,
            split_method: SplitMethod::Exact,
            seed: 42,
            oob_mode: OobMode::Disabled,
            bootstrap_fraction: 1.0,
        })
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// `None` grows every tree until the leaf-size limits stop it.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = min_samples_split;
        self
    }

    /// Splits leaving fewer rows than this on either side are skipped.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    #[must_use]
    pub fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

    /// Master seed; every tree seed is drawn from it before any tree is grown.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Each tree's bootstrap draws `ceil(n * fraction)` rows with replacement.
    #[must_use]
    pub fn with_bootstrap_fraction(mut self, bootstrap_fraction: f64) -> Self {
        self.bootstrap_fraction = bootstrap_fraction;
        self
    }

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    #[must_use]
    pub fn max_features(&self) -> MaxFeatures {
        self.max_features
    }

    #[must_use]
    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    #[must_use]
    pub fn split_method(&self) -> SplitMethod {
        self.split_method
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check every range in the table above against `n_features` columns and
    /// return the resolved candidate count.
    pub(crate) fn checked_max_features(&self, n_features: usize) -> Result<usize, RfError> {
        let resolved = self.max_features.resolve(n_features)?;
        if self.min_samples_leaf == 0 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: self.min_samples_leaf,
            });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if let Some(0) = self.max_depth {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if !(self.bootstrap_fraction > 0.0 && self.bootstrap_fraction <= 1.0) {
            return Err(RfError::InvalidBootstrapFraction {
                fraction: self.bootstrap_fraction,
            });
        }
        Ok(resolved)
    }

    /// Fit a forest on row-major `features`, one target and one name per
    /// row and column respectively.
    ///
    /// # Errors
    ///
    /// Data problems ([`RfError::EmptyDataset`], [`RfError::ZeroFeatures`],
    /// [`RfError::TargetCountMismatch`], [`RfError::FeatureCountMismatch`],
    /// [`RfError::NonFiniteValue`], [`RfError::NonFiniteTarget`]), any
    /// setting outside its range, and [`RfError::OobEvaluationFailed`] when
    /// OOB scoring is on but every row landed in every bootstrap.
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        feature_names: &[String],
    ) -> Result<RandomForestResult, RfError> {
        crate::forest::train(self, features, targets, feature_names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_counts_for_twelve_features() {
        let counts: Vec<usize> = [
            MaxFeatures::Sqrt,
            MaxFeatures::Log2,
            MaxFeatures::Third,
            MaxFeatures::Fraction(0.25),
            MaxFeatures::Fixed(7),
            MaxFeatures::All,
        ]
        .into_iter()
        .map(|m| m.resolve(12).unwrap())
        .collect();
        assert_eq!(counts, vec![4, 4, 4, 3, 7, 12]);
    }

    #[test]
    fn third_never_drops_to_zero() {
        assert_eq!(MaxFeatures::Third.resolve(1).unwrap(), 1);
        assert_eq!(MaxFeatures::Log2.resolve(1).unwrap(), 1);
    }

    #[test]
    fn counts_outside_the_columns_fail() {
        assert!(matches!(
            MaxFeatures::Fixed(4).resolve(3),
            Err(RfError::InvalidMaxFeatures { max_features: 4, n_features: 3 })
        ));
        assert!(MaxFeatures::Fixed(0).resolve(3).is_err());
        assert!(MaxFeatures::Fraction(0.0).resolve(3).is_err());
    }

    #[test]
    fn at_least_one_tree() {
        assert!(matches!(
            RandomForestConfig::new(0),
            Err(RfError::InvalidTreeCount { n_trees: 0 })
        ));
    }

    #[test]
    fn settings_checked_against_the_data() {
        let base = RandomForestConfig::new(3).unwrap();
        assert_eq!(base.checked_max_features(9).unwrap(), 3);

        let leaf = base.clone().with_min_samples_leaf(0);
        assert!(matches!(
            leaf.checked_max_features(9),
            Err(RfError::InvalidMinSamplesLeaf { .. })
        ));
        let split = base.clone().with_min_samples_split(1);
        assert!(matches!(
            split.checked_max_features(9),
            Err(RfError::InvalidMinSamplesSplit { .. })
        ));
        let depth = base.clone().with_max_depth(Some(0));
        assert!(matches!(
            depth.checked_max_features(9),
            Err(RfError::InvalidMaxDepth { max_depth: 0 })
        ));
        let fraction = base.with_bootstrap_fraction(1.5);
        assert!(matches!(
            fraction.checked_max_features(9),
            Err(RfError::InvalidBootstrapFraction { .. })
        ));
    }

    #[test]
    fn setters_chain() {
        let config = RandomForestConfig::new(25)
            .unwrap()
            .with_max_features(MaxFeatures::Log2)
            .with_split_method(SplitMethod::ExtraTrees)
            .with_min_samples_leaf(3)
            .with_seed(11);
        assert_eq!(config.n_trees(), 25);
        assert_eq!(config.max_features(), MaxFeatures::Log2);
        assert_eq!(config.split_method(), SplitMethod::ExtraTrees);
        assert_eq!(config.min_samples_leaf(), 3);
        assert_eq!(config.seed(), 11);
        assert_eq!(config.max_features().to_string(), "log2");
    }
}
