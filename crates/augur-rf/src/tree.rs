//! Single CART regression trees, used both inside forests and as global
//! surrogates.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, instrument};

use crate::{
    RfError,
    data::{to_columns, validate_training_data},
    node::{Node, NodeIndex},
    split::{SplitMethod, SplitSearch, TargetStats},
};

/// Growth limits and randomness for one tree.
///
/// Unlike a forest, a lone tree defaults to `min_samples_leaf = 1` and
/// considers every feature at each node.
#[derive(Debug, Clone)]
pub struct RegressionTreeConfig {
    pub(crate) split_method: SplitMethod,
    /// Root is depth 0; `None` is unlimited.
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) min_samples_leaf: usize,
    /// `None` is every feature.
    pub(crate) max_features: Option<usize>,
    pub(crate) seed: u64,
}

impl Default for RegressionTreeConfig {
    fn default() -> Self {
        Self {
            split_method: SplitMethod::Exact,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

impl RegressionTreeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_split_method(mut self, split_method: SplitMethod) -> Self {
        self.split_method = split_method;
        self
    }

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

    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }

    #[must_use]
    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn check(&self, n_features: usize) -> Result<usize, RfError> {
        if let Some(0) = self.max_depth {
            return Err(RfError::InvalidMaxDepth { max_depth: 0 });
        }
        if self.min_samples_split < 2 {
            return Err(RfError::InvalidMinSamplesSplit {
                min_samples_split: self.min_samples_split,
            });
        }
        if self.min_samples_leaf == 0 {
            return Err(RfError::InvalidMinSamplesLeaf {
                min_samples_leaf: 0,
            });
        }
        match self.max_features.unwrap_or(n_features) {
            m if (1..=n_features).contains(&m) => Ok(m),
            max_features => Err(RfError::InvalidMaxFeatures {
                max_features,
                n_features,
            }),
        }
    }

    /// Grow a tree on row-major `features`.
    ///
    /// # Errors
    ///
    /// [`RfError::EmptyDataset`] and the other data errors for malformed
    /// input, plus the `Invalid*` variant for any limit out of range.
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<RegressionTree, RfError> {
        let (n_samples, n_features) = validate_training_data(features, targets)?;
        let max_features = self.check(n_features)?;

        let columns = to_columns(features, n_features);
        let mut grower = Grower {
            search: SplitSearch {
                columns: &columns,
                targets,
                method: self.split_method,
                max_features,
                min_samples_leaf: self.min_samples_leaf,
            },
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            rng: ChaCha8Rng::seed_from_u64(self.seed),
            nodes: Vec::new(),
        };
        let rows: Vec<usize> = (0..n_samples).collect();
        grower.grow(&rows, 0);

        debug!(n_nodes = grower.nodes.len(), max_features, "tree grown");
        Ok(RegressionTree {
            nodes: grower.nodes,
            n_features,
        })
    }
}

/// Depth-first arena construction. A node's children always come after it.
struct Grower<'a> {
    search: SplitSearch<'a>,
    max_depth: Option<usize>,
    min_samples_split: usize,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
}

impl Grower<'_> {
    fn grow(&mut self, rows: &[usize], depth: usize) -> NodeIndex {
        let stats = TargetStats::from_indices(self.search.targets, rows);
        let at = NodeIndex::new(self.nodes.len());
        self.nodes.push(Node::leaf(&stats));

        let stop = stats.n < self.min_samples_split
            || stats.impurity().is_pure()
            || self.max_depth.is_some_and(|limit| depth >= limit);
        if stop {
            return at;
        }
        let Some(split) = self.search.best(rows, &mut self.rng) else {
            return at;
        };

        let left = self.grow(&split.left, depth + 1);
        let right = self.grow(&split.right, depth + 1);
        self.nodes[at.index()] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            impurity: stats.impurity(),
            n_samples: stats.n,
            mean: stats.mean(),
            impurity_decrease: split.impurity_decrease,
        };
        at
    }
}

/// A fitted regression tree, stored as a flat node arena rooted at
/// [`NodeIndex::ROOT`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegressionTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) n_features: usize,
}

impl RegressionTree {
    /// # Errors
    ///
    /// [`RfError::PredictionFeatureMismatch`] for a row of the wrong width.
    pub fn predict(&self, sample: &[f64]) -> Result<f64, RfError> {
        let leaf = self.apply(sample)?;
        Ok(self.nodes[leaf.index()].mean())
    }

    /// The leaf `sample` lands in.
    ///
    /// # Errors
    ///
    /// [`RfError::PredictionFeatureMismatch`] for a row of the wrong width.
    pub fn apply(&self, sample: &[f64]) -> Result<NodeIndex, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }
        let mut at = NodeIndex::ROOT;
        while let Some(next) = self.nodes[at.index()].route(sample) {
            at = next;
        }
        Ok(at)
    }

    /// Share of the tree's total squared-error reduction credited to each
    /// feature. All zeros for a single-leaf tree.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut credit = vec![0.0f64; self.n_features];
        for node in &self.nodes {
            if let Node::Split {
                feature,
                impurity_decrease,
                ..
            } = node
            {
                credit[feature.index()] += impurity_decrease;
            }
        }
        let total: f64 = credit.iter().sum();
        if total > 0.0 {
            for c in &mut credit {
                *c /= total;
            }
        }
        credit
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Longest root-to-leaf path in edges; 0 for a lone leaf.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(NodeIndex::ROOT, 0usize)];
        while let Some((at, d)) = pending.pop() {
            let Some(node) = self.nodes.get(at.index()) else {
                continue;
            };
            match node.children() {
                Some((left, right)) => pending.extend([(left, d + 1), (right, d + 1)]),
                None => deepest = deepest.max(d),
            }
        }
        deepest
    }

    /// First broken link in the arena, if any: a split on a column past
    /// `n_features`, or a child that is out of range or not after its
    /// parent. Grown trees always pass; decoded ones may not.
    pub(crate) fn broken_link(&self) -> Option<String> {
        self.nodes.iter().enumerate().find_map(|(at, node)| match node {
            Node::Split {
                feature,
                left,
                right,
                ..
            } => {
                if feature.index() >= self.n_features {
                    return Some(format!("node {at} splits on missing feature {feature}"));
                }
                [*left, *right]
                    .into_iter()
                    .find(|child| child.index() <= at || child.index() >= self.nodes.len())
                    .map(|child| format!("node {at} links to node {}", child.index()))
            }
            Node::Leaf { .. } => None,
        })
    }
}
