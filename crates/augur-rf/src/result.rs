//! What a forest fit returns besides the forest itself.

use crate::forest::RandomForest;
use crate::importance::RankedFeature;
use crate::oob::OobScore;
use crate::split::SplitMethod;
use crate::tree::RegressionTree;

/// Settings and shape of a finished fit, suitable for reports.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingMetadata {
    pub n_trees: usize,
    pub n_features: usize,
    pub n_samples: usize,
    /// Features drawn per split after resolving `max_features`.
    pub max_features_resolved: usize,
    pub split_method: SplitMethod,
    pub min_samples_leaf: usize,
    pub max_depth: Option<usize>,
    pub seed: u64,
    /// Mean of the training targets.
    pub target_mean: f64,
    /// Population variance of the training targets; an OOB MSE near this
    /// value means the forest explains little.
    pub target_variance: f64,
    /// Average depth over the trees.
    pub mean_tree_depth: f64,
    /// Average leaf count over the trees.
    pub mean_tree_leaves: f64,
}

impl TrainingMetadata {
    pub(crate) fn tree_shape(trees: &[RegressionTree]) -> (f64, f64) {
        if trees.is_empty() {
            return (0.0, 0.0);
        }
        let n = trees.len() as f64;
        let depth = trees.iter().map(|t| t.depth() as f64).sum::<f64>() / n;
        let leaves = trees.iter().map(|t| t.n_leaves() as f64).sum::<f64>() / n;
        (depth, leaves)
    }
}

/// A fitted forest together with its impurity importances, optional
/// out-of-bag score and [`TrainingMetadata`].
#[derive(Debug)]
pub struct RandomForestResult {
    forest: RandomForest,
    importances: Vec<RankedFeature>,
    oob_score: Option<OobScore>,
    metadata: TrainingMetadata,
}

impl RandomForestResult {
    pub(crate) fn new(
        forest: RandomForest,
        importances: Vec<RankedFeature>,
        oob_score: Option<OobScore>,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            forest,
            importances,
            oob_score,
            metadata,
        }
    }

    #[must_use]
    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    #[must_use]
    pub fn into_forest(self) -> RandomForest {
        self.forest
    }

    /// Mean decrease in impurity per feature, most important first.
    #[must_use]
    pub fn importances(&self) -> &[RankedFeature] {
        &self.importances
    }

    /// `None` unless the fit ran with [`OobMode::Enabled`](crate::OobMode::Enabled).
    #[must_use]
    pub fn oob_score(&self) -> Option<&OobScore> {
        self.oob_score.as_ref()
    }

    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }
}
