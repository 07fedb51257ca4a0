use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// How a node picks thresholds for its candidate features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitMethod {
    /// Try the midpoint between every pair of adjacent distinct values.
    Exact,
    /// Try one threshold drawn uniformly between the feature's extremes.
    ExtraTrees,
}

impl std::fmt::Display for SplitMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Exact => "exact",
            Self::ExtraTrees => "extra-trees",
        })
    }
}

/// Count, sum and sum of squares of a set of targets; enough to get the
/// mean and squared error without revisiting the rows.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TargetStats {
    pub(crate) n: usize,
    sum: f64,
    sum_sq: f64,
}

impl TargetStats {
    pub(crate) fn from_indices(targets: &[f64], indices: &[usize]) -> Self {
        indices.iter().fold(Self::default(), |mut stats, &row| {
            stats.push(targets[row]);
            stats
        })
    }

    fn push(&mut self, y: f64) {
        self.n += 1;
        self.sum += y;
        self.sum_sq += y * y;
    }

    fn pop(&mut self, y: f64) {
        self.n -= 1;
        self.sum -= y;
        self.sum_sq -= y * y;
    }

    pub(crate) fn mean(&self) -> f64 {
        match self.n {
            0 => 0.0,
            n => self.sum / n as f64,
        }
    }

    /// Squared error around the mean. Cancellation can push the raw value
    /// slightly below zero, so it is clamped.
    pub(crate) fn sse(&self) -> f64 {
        match self.n {
            0 => 0.0,
            n => (self.sum_sq - self.sum * self.sum / n as f64).max(0.0),
        }
    }

    pub(crate) fn impurity(&self) -> Impurity {
        Impurity::new(match self.n {
            0 => 0.0,
            n => self.sse() / n as f64,
        })
    }
}

/// The winning split of a node, with its rows already partitioned.
#[derive(Debug, Clone)]
pub(crate) struct CandidateSplit {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// Parent squared error minus the children's.
    pub(crate) impurity_decrease: f64,
    pub(crate) left: Vec<usize>,
    pub(crate) right: Vec<usize>,
}

/// Everything a node's split search needs besides its rows and the RNG.
///
/// `columns` is column-major: `columns[feature][row]`.
pub(crate) struct SplitSearch<'a> {
    pub(crate) columns: &'a [Vec<f64>],
    pub(crate) targets: &'a [f64],
    pub(crate) method: SplitMethod,
    pub(crate) max_features: usize,
    pub(crate) min_samples_leaf: usize,
}

impl SplitSearch<'_> {
    /// Best split of `rows` over `max_features` features drawn without
    /// replacement. `None` when every drawn feature is constant on `rows`
    /// or every threshold leaves a side under `min_samples_leaf`.
    ///
    /// The first feature drawn wins ties.
    pub(crate) fn best(&self, rows: &[usize], rng: &mut impl Rng) -> Option<CandidateSplit> {
        if rows.len() < 2 || self.columns.is_empty() {
            return None;
        }
        let parent = TargetStats::from_indices(self.targets, rows);

        let mut winner: Option<(FeatureIndex, f64, f64)> = None;
        for feature in draw_features(self.columns.len(), self.max_features, rng) {
            let column = &self.columns[feature];
            let scored = match self.method {
                SplitMethod::Exact => self.scan(column, rows, parent),
                SplitMethod::ExtraTrees => self.draw(column, rows, parent.sse(), rng),
            };
            if let Some((threshold, decrease)) = scored
                && winner.is_none_or(|(_, _, best)| decrease > best)
            {
                winner = Some((FeatureIndex::new(feature), threshold, decrease));
            }
        }

        let (feature, threshold, impurity_decrease) = winner?;
        let column = &self.columns[feature.index()];
        let (left, right): (Vec<usize>, Vec<usize>) =
            rows.iter().partition(|&&row| column[row] <= threshold);
        Some(CandidateSplit {
            feature,
            threshold,
            impurity_decrease,
            left,
            right,
        })
    }

    /// Sweep the rows in value order, moving one target at a time from the
    /// right side to the left, and keep the best midpoint.
    fn scan(&self, column: &[f64], rows: &[usize], parent: TargetStats) -> Option<(f64, f64)> {
        let mut ordered: Vec<(f64, f64)> = rows
            .iter()
            .map(|&row| (column[row], self.targets[row]))
            .collect();
        ordered.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        let parent_sse = parent.sse();
        let mut left = TargetStats::default();
        let mut right = parent;
        let mut best: Option<(f64, f64)> = None;
        for pair in ordered.windows(2) {
            let ((value, y), (next, _)) = (pair[0], pair[1]);
            left.push(y);
            right.pop(y);
            if value == next || left.n < self.min_samples_leaf || right.n < self.min_samples_leaf
            {
                continue;
            }
            let decrease = parent_sse - left.sse() - right.sse();
            if best.is_none_or(|(_, d)| decrease > d) {
                best = Some((0.5 * (value + next), decrease));
            }
        }
        best
    }

    fn draw(
        &self,
        column: &[f64],
        rows: &[usize],
        parent_sse: f64,
        rng: &mut impl Rng,
    ) -> Option<(f64, f64)> {
        let (lo, hi) = rows
            .iter()
            .map(|&row| column[row])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if lo >= hi {
            return None;
        }
        let threshold = rng.gen_range(lo..hi);

        let (mut left, mut right) = (TargetStats::default(), TargetStats::default());
        for &row in rows {
            let side = if column[row] <= threshold { &mut left } else { &mut right };
            side.push(self.targets[row]);
        }
        if left.n < self.min_samples_leaf || right.n < self.min_samples_leaf {
            return None;
        }
        Some((threshold, parent_sse - left.sse() - right.sse()))
    }
}

/// `take` distinct features out of `n_features`, in draw order
/// (partial Fisher-Yates).
fn draw_features(n_features: usize, take: usize, rng: &mut impl Rng) -> Vec<usize> {
    let take = take.min(n_features);
    let mut order: Vec<usize> = (0..n_features).collect();
    for i in 0..take {
        order.swap(i, rng.gen_range(i..n_features));
    }
    order.truncate(take);
    order
}
