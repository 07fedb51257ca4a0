//! Scoring each training row with only the trees that never drew it.

use crate::error::RfError;
use crate::metrics::{mean_squared_error, r2_score};
use crate::tree::RegressionTree;

/// Out-of-bag error of a forest.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OobScore {
    pub mse: f64,
    pub r2: f64,
    /// Rows left out of at least one bootstrap; only these are scored.
    pub n_oob_samples: usize,
}

/// `out_of_bag[t]` lists the rows tree `t` never saw.
pub(crate) fn compute_oob(
    trees: &[RegressionTree],
    features: &[Vec<f64>],
    targets: &[f64],
    out_of_bag: &[Vec<usize>],
) -> Result<OobScore, RfError> {
    let mut votes = vec![(0.0f64, 0usize); features.len()];
    for (tree, rows) in trees.iter().zip(out_of_bag) {
        for &row in rows {
            let (sum, count) = &mut votes[row];
            *sum += tree.predict(&features[row])?;
            *count += 1;
        }
    }

    let (observed, predicted): (Vec<f64>, Vec<f64>) = votes
        .iter()
        .zip(targets)
        .filter(|((_, count), _)| *count > 0)
        .map(|(&(sum, count), &y)| (y, sum / count as f64))
        .unzip();
    if observed.is_empty() {
        return Err(RfError::OobEvaluationFailed {
            reason: "every row was drawn by every tree".to_string(),
        });
    }
    Ok(OobScore {
        mse: mean_squared_error(&observed, &predicted),
        r2: r2_score(&observed, &predicted),
        n_oob_samples: observed.len(),
    })
}
