use std::fmt;

use crate::split::TargetStats;

/// Column position of a feature in the training rows.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Zero-based column position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Position of a node in a tree's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// The root of every tree.
    pub const ROOT: NodeIndex = NodeIndex(0);

    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Zero-based arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Mean squared deviation of the targets that reached a node.
#[derive(
    Debug, Clone, Copy, PartialEq, PartialOrd,
    serde::Serialize, serde::Deserialize,
)]
pub struct Impurity(f64);

impl Impurity {
    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Raw variance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// `true` when every target at the node is (numerically) equal.
    #[must_use]
    pub fn is_pure(self) -> bool {
        self.0 <= f64::EPSILON
    }
}

impl fmt::Display for Impurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

/// A node in a regression tree arena.
///
/// Children are referenced by [`NodeIndex`], so a tree is a flat
/// `Vec<Node>` with the root at [`NodeIndex::ROOT`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Node {
    /// An interior node routing on one feature.
    Split {
        /// Feature tested at this node.
        feature: FeatureIndex,
        /// Rows with `x[feature] <= threshold` go left.
        threshold: f64,
        /// Left child.
        left: NodeIndex,
        /// Right child.
        right: NodeIndex,
        /// Target variance before the split.
        impurity: Impurity,
        /// Training rows that reached this node.
        n_samples: usize,
        /// Mean target of those rows.
        mean: f64,
        /// Reduction in summed squared error achieved by the split.
        impurity_decrease: f64,
    },
    /// A terminal node predicting a constant.
    Leaf {
        /// Mean target of the rows in the leaf.
        value: f64,
        /// Target variance in the leaf.
        impurity: Impurity,
        /// Training rows in the leaf.
        n_samples: usize,
    },
}

impl Node {
    /// A leaf summarising `stats`.
    pub(crate) fn leaf(stats: &TargetStats) -> Self {
        Node::Leaf {
            value: stats.mean(),
            impurity: stats.impurity(),
            n_samples: stats.n,
        }
    }

    /// Target variance at this node (before splitting, for interior nodes).
    #[must_use]
    pub fn impurity(&self) -> Impurity {
        match self {
            Node::Split { impurity, .. } | Node::Leaf { impurity, .. } => *impurity,
        }
    }

    /// Training rows that reached this node.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        match self {
            Node::Split { n_samples, .. } | Node::Leaf { n_samples, .. } => *n_samples,
        }
    }

    /// Mean training target at this node; the prediction for a leaf.
    #[must_use]
    pub fn mean(&self) -> f64 {
        match self {
            Node::Split { mean, .. } => *mean,
            Node::Leaf { value, .. } => *value,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Left and right children of a split node.
    #[must_use]
    pub fn children(&self) -> Option<(NodeIndex, NodeIndex)> {
        match self {
            Node::Split { left, right, .. } => Some((*left, *right)),
            Node::Leaf { .. } => None,
        }
    }

    /// The child `sample` moves to, or `None` at a leaf.
    ///
    /// `sample` must be at least as wide as the tree's feature count.
    pub(crate) fn route(&self, sample: &[f64]) -> Option<NodeIndex> {
        match self {
            Node::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => Some(if sample[feature.index()] <= *threshold {
                *left
            } else {
                *right
            }),
            Node::Leaf { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split() -> Node {
        Node::Split {
            feature: FeatureIndex::new(1),
            threshold: 3.5,
            left: NodeIndex::new(1),
            right: NodeIndex::new(2),
            impurity: Impurity::new(4.0),
            n_samples: 20,
            mean: 1.5,
            impurity_decrease: 60.0,
        }
    }

    #[test]
    fn leaf_from_stats() {
        let stats = TargetStats::from_indices(&[1.0, 2.0, 3.0, 4.0], &[0, 1, 2, 3]);
        let leaf = Node::leaf(&stats);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.n_samples(), 4);
        assert!((leaf.mean() - 2.5).abs() < 1e-12);
        assert!((leaf.impurity().value() - 1.25).abs() < 1e-12);
        assert_eq!(leaf.children(), None);
        assert_eq!(leaf.route(&[0.0, 0.0]), None);
    }

    #[test]
    fn split_routes_on_threshold() {
        let node = split();
        assert_eq!(node.children(), Some((NodeIndex::new(1), NodeIndex::new(2))));
        assert_eq!(node.route(&[9.0, 3.5]), Some(NodeIndex::new(1)));
        assert_eq!(node.route(&[-9.0, 3.6]), Some(NodeIndex::new(2)));
        assert!((node.mean() - 1.5).abs() < f64::EPSILON);
        assert_eq!(node.n_samples(), 20);
    }

    #[test]
    fn impurity_purity_and_display() {
        assert!(Impurity::new(0.0).is_pure());
        assert!(!Impurity::new(0.01).is_pure());
        assert_eq!(Impurity::new(0.333333).to_string(), "0.333333");
        assert_eq!(FeatureIndex::new(7).to_string(), "x7");
        assert_eq!(NodeIndex::ROOT.index(), 0);
    }
}
