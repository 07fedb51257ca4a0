//! Outcome-stratified train/test splitting.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, instrument};

use crate::domain::Dataset;
use crate::error::DataError;

/// Train and test partitions of a dataset, disjoint by row.
#[derive(Debug, Clone)]
pub struct Split {
    /// Rows used for fitting.
    pub train: Dataset,
    /// Held-out rows.
    pub test: Dataset,
}

/// Splits rows into train and test, stratified on outcome quantile groups.
///
/// Within each group the rows are shuffled and the first
/// `ceil(fraction · group_size)` go to train. Each side keeps the input's
/// row order.
///
/// # Defaults
///
/// | Parameter  | Default |
/// |------------|---------|
/// | `seed`     | 42      |
/// | `n_groups` | 5       |
#[derive(Debug, Clone)]
pub struct Splitter {
    outcome: String,
    fraction: f64,
    seed: u64,
    n_groups: usize,
}

impl Splitter {
    /// Create a splitter for the given outcome column and train fraction.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::InvalidSplitFraction`] unless `0 < fraction < 1`.
    pub fn new(outcome: impl Into<String>, fraction: f64) -> Result<Self, DataError> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(DataError::InvalidSplitFraction { fraction });
        }
        Ok(Self {
            outcome: outcome.into(),
            fraction,
            seed: 42,
            n_groups: 5,
        })
    }

    /// Set the shuffle seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of outcome quantile groups. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_groups(mut self, n_groups: usize) -> Self {
        self.n_groups = n_groups.max(1);
        self
    }

    /// Split the dataset.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::UnknownColumn`] | outcome column absent |
    /// | [`DataError::NonNumericColumn`] | outcome column holds text |
    /// | [`DataError::MissingValues`] | outcome column has missing cells |
    /// | [`DataError::EmptySplit`] | train or test would be empty |
    #[instrument(skip_all, fields(outcome = %self.outcome, fraction = self.fraction, seed = self.seed))]
    pub fn split(&self, dataset: &Dataset) -> Result<Split, DataError> {
        let outcome = dataset
            .column(&self.outcome)
            .ok_or_else(|| DataError::UnknownColumn {
                name: self.outcome.clone(),
            })?
            .numeric_values()?;

        let groups = quantile_groups(&outcome, self.n_groups);
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); self.n_groups];
        for (row, &g) in groups.iter().enumerate() {
            members[g].push(row);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut in_train = vec![false; outcome.len()];
        for (group, rows) in members.iter_mut().enumerate() {
            if rows.is_empty() {
                continue;
            }
            rows.shuffle(&mut rng);
            let n_train = train_count(self.fraction, rows.len());
            for &row in &rows[..n_train] {
                in_train[row] = true;
            }
            debug!(group, size = rows.len(), n_train, "group split");
        }

        let (train_rows, test_rows): (Vec<usize>, Vec<usize>) =
            (0..outcome.len()).partition(|&r| in_train[r]);
        if train_rows.is_empty() || test_rows.is_empty() {
            return Err(DataError::EmptySplit {
                n_train: train_rows.len(),
                n_test: test_rows.len(),
            });
        }

        info!(n_train = train_rows.len(), n_test = test_rows.len(), "dataset split");
        Ok(Split {
            train: dataset.select_rows(&train_rows),
            test: dataset.select_rows(&test_rows),
        })
    }
}

/// Assign each value to a quantile group using type-7 sample quantile
/// breaks at `k / n_groups`. A value equal to a break joins the lower group.
/// `ceil(fraction * n)`, ignoring float error that lands just above an
/// integer (`0.07 * 100` is `7.000000000000001`).
fn train_count(fraction: f64, n: usize) -> usize {
    let exact = fraction * n as f64;
    let nearest = exact.round();
    let count = if (exact - nearest).abs() < 1e-9 { nearest } else { exact.ceil() };
    (count as usize).min(n)
}

fn quantile_groups(values: &[f64], n_groups: usize) -> Vec<usize> {
    if values.is_empty() || n_groups <= 1 {
        return vec![0; values.len()];
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = sorted.len() - 1;
    let breaks: Vec<f64> = (1..n_groups)
        .map(|k| {
            let h = last as f64 * k as f64 / n_groups as f64;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(last);
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        })
        .collect();
    values
        .iter()
        .map(|&v| breaks.partition_point(|&b| b < v))
        .collect()
}
