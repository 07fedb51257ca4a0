//! Weighted least squares via the normal equations.

use crate::error::InterpretError;

/// Relative pivot size below which the system is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Weighted least-squares fit with intercept.
#[derive(Debug, Clone)]
pub(crate) struct WlsFit {
    pub(crate) intercept: f64,
    pub(crate) coefficients: Vec<f64>,
    /// Weighted residual sum of squares.
    pub(crate) sse: f64,
}

/// Fit `y ≈ b0 + Σ bⱼ·x[cols[j]]` minimising `Σ wᵢ·residualᵢ²`.
pub(crate) fn weighted_least_squares(
    rows: &[Vec<f64>],
    cols: &[usize],
    y: &[f64],
    weights: &[f64],
) -> Result<WlsFit, InterpretError> {
    let m = cols.len() + 1;
    let design = |row: &[f64], a: usize| if a == 0 { 1.0 } else { row[cols[a - 1]] };

    let mut xtwx = vec![vec![0.0f64; m]; m];
    let mut xtwy = vec![0.0f64; m];
    for ((row, &yi), &w) in rows.iter().zip(y).zip(weights) {
        for a in 0..m {
            let xa = design(row, a);
            xtwy[a] += w * xa * yi;
            for b in a..m {
                xtwx[a][b] += w * xa * design(row, b);
            }
        }
    }
    for a in 0..m {
        for b in 0..a {
            xtwx[a][b] = xtwx[b][a];
        }
    }

    let beta = solve(xtwx, xtwy)?;
    let sse = rows
        .iter()
        .zip(y)
        .zip(weights)
        .map(|((row, &yi), &w)| {
            let fitted: f64 = (0..m).map(|a| beta[a] * design(row, a)).sum();
            w * (yi - fitted).powi(2)
        })
        .sum();

    Ok(WlsFit {
        intercept: beta[0],
        coefficients: beta[1..].to_vec(),
        sse,
    })
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, InterpretError> {
    let n = b.len();
    let scale = a
        .iter()
        .flatten()
        .fold(0.0f64, |acc, v| acc.max(v.abs()))
        .max(f64::MIN_POSITIVE);

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() <= PIVOT_TOLERANCE * scale {
            return Err(InterpretError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0f64; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_linear_fit() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, (i * i) as f64]).collect();
        let y: Vec<f64> = rows.iter().map(|r| 1.0 + 2.0 * r[0] - 0.5 * r[1]).collect();
        let fit = weighted_least_squares(&rows, &[0, 1], &y, &[1.0; 10]).unwrap();
        assert!((fit.intercept - 1.0).abs() < 1e-8);
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-8);
        assert!((fit.coefficients[1] + 0.5).abs() < 1e-8);
        assert!(fit.sse < 1e-12);
    }

    #[test]
    fn weights_pick_the_heavy_points() {
        let rows = vec![vec![0.0], vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![0.0, 1.0, 2.0, 100.0];
        let fit = weighted_least_squares(&rows, &[0], &y, &[1.0, 1.0, 1.0, 0.0]).unwrap();
        assert!((fit.coefficients[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn constant_column_is_singular() {
        let rows = vec![vec![3.0], vec![3.0], vec![3.0]];
        let err = weighted_least_squares(&rows, &[0], &[1.0, 2.0, 3.0], &[1.0; 3]).unwrap_err();
        assert!(matches!(err, InterpretError::Singular));
    }
}
