//! Regression metrics.

/// Mean squared error. Returns 0.0 for empty input.
#[must_use]
pub fn mean_squared_error(observed: &[f64], predicted: &[f64]) -> f64 {
    if observed.is_empty() {
        return 0.0;
    }
    observed
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum::<f64>()
        / observed.len() as f64
}

/// Coefficient of determination, `1 - SSE / SST`.
///
/// When the observed values are constant (SST = 0) returns 1.0 for a
/// perfect fit and 0.0 otherwise.
#[must_use]
pub fn r2_score(observed: &[f64], predicted: &[f64]) -> f64 {
    if observed.is_empty() {
        return 0.0;
    }
    let mean = observed.iter().sum::<f64>() / observed.len() as f64;
    let sst: f64 = observed.iter().map(|y| (y - mean).powi(2)).sum();
    let sse: f64 = observed
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).powi(2))
        .sum();
    if sst == 0.0 {
        return if sse == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - sse / sst
}
