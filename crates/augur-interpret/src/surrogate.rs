//! Global surrogate: a shallow regression tree fitted to the model's predictions.

use augur_rf::{Node, RegressionTree, RegressionTreeConfig, r2_score};
use tracing::{info, instrument};

use crate::error::InterpretError;
use crate::method::Method;
use crate::model::Model;
use crate::predictor::Predictor;

/// Surrogate tree configuration.
///
/// # Defaults
///
/// | Parameter          | Default |
/// |--------------------|---------|
/// | `max_depth`        | 2       |
/// | `min_samples_leaf` | 1       |
#[derive(Debug, Clone)]
pub struct GlobalSurrogate {
    max_depth: usize,
    min_samples_leaf: usize,
}

/// One side of a split on the path to a leaf.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Condition {
    /// Feature name.
    pub feature: String,
    /// `true` for `feature <= threshold`, `false` for `feature > threshold`.
    pub at_most: bool,
    /// Split threshold.
    pub threshold: f64,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = if self.at_most { "<=" } else { ">" };
        write!(f, "{} {op} {:.4}", self.feature, self.threshold)
    }
}

/// A terminal node of the surrogate tree.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SurrogateLeaf {
    /// Human-readable rule, conditions joined by `&`.
    pub rule: String,
    /// Conditions from root to leaf.
    pub conditions: Vec<Condition>,
    /// Rows that fall in this leaf.
    pub n_samples: usize,
    /// Mean model prediction of those rows.
    pub mean: f64,
}

/// Result of [`GlobalSurrogate`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct TreeSurrogate {
    /// Depth limit used.
    pub max_depth: usize,
    /// R² of the tree's predictions against the model's predictions.
    pub r_squared: f64,
    /// Leaves in depth-first, left-first order.
    pub leaves: Vec<SurrogateLeaf>,
    /// The fitted tree.
    #[serde(skip)]
    pub tree: RegressionTree,
}

impl GlobalSurrogate {
    /// Create a config with the given depth limit.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            min_samples_leaf: 1,
        }
    }

    /// Set the minimum rows per leaf.
    #[must_use]
    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.min_samples_leaf = min_samples_leaf;
        self
    }
}

impl Default for GlobalSurrogate {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Method for GlobalSurrogate {
    type Output = TreeSurrogate;

    fn name(&self) -> &'static str {
        "surrogate"
    }

    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InterpretError::InvalidMaxDepth`] | `max_depth` is zero |
    /// | [`InterpretError::Surrogate`] | the tree cannot be fitted |
    /// | [`InterpretError::Prediction`] | model failure |
    #[instrument(skip_all, fields(max_depth = self.max_depth))]
    fn evaluate<M: Model>(&self, predictor: &Predictor<M>) -> Result<TreeSurrogate, InterpretError> {
        if self.max_depth == 0 {
            return Err(InterpretError::InvalidMaxDepth { max_depth: 0 });
        }
        let targets = predictor.predict_data()?;
        let tree = RegressionTreeConfig::new()
            .with_max_depth(Some(self.max_depth))
            .with_min_samples_leaf(self.min_samples_leaf)
            .fit(predictor.rows(), &targets)
            .map_err(|source| InterpretError::Surrogate { source })?;

        let fitted = tree
            .predict_batch(predictor.rows())
            .map_err(|source| InterpretError::Surrogate { source })?;
        let r_squared = r2_score(&targets, &fitted);

        let mut leaves = Vec::new();
        collect_leaves(&tree, predictor.feature_names(), 0, &mut Vec::new(), &mut leaves);

        info!(r_squared, n_leaves = leaves.len(), "surrogate tree fitted");
        Ok(TreeSurrogate {
            max_depth: self.max_depth,
            r_squared,
            leaves,
            tree,
        })
    }
}

fn collect_leaves(
    tree: &RegressionTree,
    names: &[String],
    idx: usize,
    path: &mut Vec<Condition>,
    out: &mut Vec<SurrogateLeaf>,
) {
    match &tree.nodes()[idx] {
        Node::Leaf {
            value, n_samples, ..
        } => {
            let rule = if path.is_empty() {
                "all".to_string()
            } else {
                path.iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" & ")
            };
            out.push(SurrogateLeaf {
                rule,
                conditions: path.clone(),
                n_samples: *n_samples,
                mean: *value,
            });
        }
        Node::Split {
            feature,
            threshold,
            left,
            right,
            ..
        } => {
            for (child, at_most) in [(left, true), (right, false)] {
                path.push(Condition {
                    feature: names[feature.index()].clone(),
                    at_most,
                    threshold: *threshold,
                });
                collect_leaves(tree, names, child.index(), path, out);
                path.pop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FnModel;

    fn step_predictor() -> Predictor<FnModel<impl Fn(&[f64]) -> f64 + Sync>> {
        let rows: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 4) as f64]).collect();
        let labels = vec![0.0; rows.len()];
        Predictor::new(
            FnModel::new(2, |r: &[f64]| if r[0] < 20.0 { 1.0 } else { 5.0 }),
            vec!["x".into(), "noise".into()],
            rows,
            labels,
        )
        .unwrap()
    }

    #[test]
    fn step_function_recovered_exactly() {
        let result = GlobalSurrogate::new(1).evaluate(&step_predictor()).unwrap();
        assert!((result.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(result.leaves.len(), 2);
        assert_eq!(result.leaves[0].conditions[0].feature, "x");
        assert!(result.leaves[0].conditions[0].at_most);
        assert_eq!(result.leaves[0].n_samples, 20);
        assert_eq!(result.leaves[0].mean, 1.0);
        assert_eq!(result.leaves[1].mean, 5.0);
        assert!(result.leaves[1].rule.starts_with("x > "));
    }

    #[test]
    fn depth_bounds_leaves_and_r2() {
        let rows: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64, ((i * 7) % 11) as f64]).collect();
        let labels = vec![0.0; rows.len()];
        let p = Predictor::new(
            FnModel::new(2, |r: &[f64]| r[0].sin() + r[1]),
            vec!["a".into(), "b".into()],
            rows,
            labels,
        )
        .unwrap();
        let result = GlobalSurrogate::new(2).evaluate(&p).unwrap();
        assert!(result.leaves.len() <= 4);
        assert!(result.tree.depth() <= 2);
        assert!(result.r_squared <= 1.0);
        let covered: usize = result.leaves.iter().map(|l| l.n_samples).sum();
        assert_eq!(covered, 50);
    }

    #[test]
    fn zero_depth_rejected() {
        assert!(matches!(
            GlobalSurrogate::new(0).evaluate(&step_predictor()),
            Err(InterpretError::InvalidMaxDepth { max_depth: 0 })
        ));
    }
}
