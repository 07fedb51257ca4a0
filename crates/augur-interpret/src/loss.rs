//! Loss functions and comparison modes for permutation importance.

/// Loss between observed outcomes and predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Loss {
    /// Mean squared error.
    Mse,
    /// Root mean squared error.
    Rmse,
    /// Mean absolute error.
    Mae,
}

impl Loss {
    /// Evaluate the loss. Returns 0.0 for empty input.
    #[must_use]
    pub fn compute(self, observed: &[f64], predicted: &[f64]) -> f64 {
        if observed.is_empty() {
            return 0.0;
        }
        let n = observed.len() as f64;
        let pairs = observed.iter().zip(predicted);
        match self {
            Loss::Mse => pairs.map(|(y, p)| (y - p).powi(2)).sum::<f64>() / n,
            Loss::Rmse => (pairs.map(|(y, p)| (y - p).powi(2)).sum::<f64>() / n).sqrt(),
            Loss::Mae => pairs.map(|(y, p)| (y - p).abs()).sum::<f64>() / n,
        }
    }
}

impl std::fmt::Display for Loss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Loss::Mse => "mse",
            Loss::Rmse => "rmse",
            Loss::Mae => "mae",
        })
    }
}

/// How a permuted loss is compared with the original loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compare {
    /// `permuted - original`; 0 means no effect.
    Difference,
    /// `permuted / original`; 1 means no effect.
    Ratio,
}

impl Compare {
    pub(crate) fn apply(self, permuted: f64, original: f64) -> f64 {
        match self {
            Compare::Difference => permuted - original,
            Compare::Ratio => {
                if original == 0.0 {
                    if permuted == 0.0 { 1.0 } else { f64::INFINITY }
                } else {
                    permuted / original
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn losses() {
        let y = [1.0, 2.0, 3.0];
        let p = [1.0, 4.0, 3.0];
        assert!((Loss::Mse.compute(&y, &p) - 4.0 / 3.0).abs() < 1e-12);
        assert!((Loss::Rmse.compute(&y, &p) - (4.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((Loss::Mae.compute(&y, &p) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn compare_modes() {
        assert_eq!(Compare::Difference.apply(3.0, 1.0), 2.0);
        assert_eq!(Compare::Ratio.apply(3.0, 1.5), 2.0);
        assert_eq!(Compare::Ratio.apply(0.0, 0.0), 1.0);
    }
}
