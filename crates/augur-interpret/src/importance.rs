//! Permutation feature importance.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::error::InterpretError;
use crate::loss::{Compare, Loss};
use crate::method::Method;
use crate::model::Model;
use crate::predictor::Predictor;
use crate::stats::{mean, quantile};

/// Permutation importance configuration.
///
/// # Defaults
///
/// | Parameter     | Default      |
/// |---------------|--------------|
/// | `loss`        | `Mse`        |
/// | `repetitions` | 5            |
/// | `compare`     | `Difference` |
/// | `seed`        | 42           |
#[derive(Debug, Clone)]
pub struct PermutationImportance {
    loss: Loss,
    repetitions: usize,
    compare: Compare,
    seed: u64,
}

/// Importance of one feature.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FeatureImportanceEntry {
    /// Feature name.
    pub feature: String,
    /// Mean comparison value over repetitions.
    pub importance: f64,
    /// 5th percentile over repetitions.
    pub lower: f64,
    /// 95th percentile over repetitions.
    pub upper: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Result of [`PermutationImportance`]: features sorted by importance.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FeatureImportance {
    /// Loss used.
    pub loss: Loss,
    /// Comparison mode used.
    pub compare: Compare,
    /// Loss of the unpermuted data.
    pub original_loss: f64,
    /// Entries sorted by descending importance.
    pub features: Vec<FeatureImportanceEntry>,
}

impl PermutationImportance {
    /// Create a config with the defaults above.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loss: Loss::Mse,
            repetitions: 5,
            compare: Compare::Difference,
            seed: 42,
        }
    }

    /// Set the loss function.
    #[must_use]
    pub fn with_loss(mut self, loss: Loss) -> Self {
        self.loss = loss;
        self
    }

    /// Set the number of shuffles per feature.
    #[must_use]
    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    /// Set the comparison mode.
    #[must_use]
    pub fn with_compare(mut self, compare: Compare) -> Self {
        self.compare = compare;
        self
    }

    /// Set the shuffle seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for PermutationImportance {
    fn default() -> Self {
        Self::new()
    }
}

impl Method for PermutationImportance {
    type Output = FeatureImportance;

    fn name(&self) -> &'static str {
        "importance"
    }

    /// Shuffle each feature column `repetitions` times and compare the
    /// resulting loss with the original loss.
    ///
    /// Features run in parallel; feature `j` shuffles with seed `seed + j`,
    /// so results do not depend on the thread count.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`InterpretError::InvalidRepetitions`] | `repetitions` is zero |
    /// | [`InterpretError::Prediction`] | model failure |
    #[instrument(skip_all, fields(loss = %self.loss, repetitions = self.repetitions))]
    fn evaluate<M: Model>(&self, predictor: &Predictor<M>) -> Result<FeatureImportance, InterpretError> {
        if self.repetitions == 0 {
            return Err(InterpretError::InvalidRepetitions {
                repetitions: self.repetitions,
            });
        }
        let labels = predictor.labels();
        let original_loss = self.loss.compute(labels, &predictor.predict_data()?);

        let mut features: Vec<FeatureImportanceEntry> = (0..predictor.n_features())
            .into_par_iter()
            .map(|j| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(j as u64));
                let mut column = predictor.column(j);
                let mut rows = predictor.rows().to_vec();
                let mut scores = Vec::with_capacity(self.repetitions);
                for _ in 0..self.repetitions {
                    column.shuffle(&mut rng);
                    for (row, &v) in rows.iter_mut().zip(&column) {
                        row[j] = v;
                    }
                    let permuted_loss = self.loss.compute(labels, &predictor.predict(&rows)?);
                    scores.push(self.compare.apply(permuted_loss, original_loss));
                }
                let entry = FeatureImportanceEntry {
                    feature: predictor.feature_names()[j].clone(),
                    importance: mean(&scores),
                    lower: quantile(&scores, 0.05),
                    upper: quantile(&scores, 0.95),
                    rank: 0,
                };
                debug!(feature = %entry.feature, importance = entry.importance, "feature permuted");
                Ok(entry)
            })
            .collect::<Result<_, InterpretError>>()?;

        // Stable sort keeps column order among ties.
        features.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        for (i, entry) in features.iter_mut().enumerate() {
            entry.rank = i + 1;
        }

        info!(
            original_loss,
            top = features.first().map(|f| f.feature.as_str()),
            "permutation importance complete"
        );
        Ok(FeatureImportance {
            loss: self.loss,
            compare: self.compare,
            original_loss,
            features,
        })
    }
}
