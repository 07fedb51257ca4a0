//! Column dropping and missing-row removal.

use tracing::{info, instrument, warn};

use crate::domain::{Dataset, RowId};
use crate::error::DataError;

/// What [`FeatureFilter::apply`] removed and noticed.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FilterReport {
    /// Columns removed by name or pattern, in header order.
    pub dropped_columns: Vec<String>,
    /// Drop-list names that were not in the dataset.
    pub unknown_drop_names: Vec<String>,
    /// Rows removed because they had a missing cell.
    pub removed_rows: Vec<RowId>,
    /// Numeric columns left after filtering that are (nearly) constant.
    pub near_constant_columns: Vec<String>,
}

/// Drops columns by exact name or substring, then rows with missing cells.
///
/// Substring patterns are case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct FeatureFilter {
    drop_columns: Vec<String>,
    drop_patterns: Vec<String>,
}

impl FeatureFilter {
    /// Create a filter that drops nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the exact column names to drop.
    #[must_use]
    pub fn with_drop_columns(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.drop_columns = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the substrings; any column whose name contains one is dropped.
    #[must_use]
    pub fn with_drop_patterns(
        mut self,
        patterns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.drop_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    fn drops(&self, name: &str) -> bool {
        self.drop_columns.iter().any(|d| d == name)
            || self.drop_patterns.iter().any(|p| name.contains(p.as_str()))
    }

    /// Apply the filter.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::NoColumnsAfterFilter`] | every column was dropped |
    /// | [`DataError::EmptyAfterFilter`] | every row had a missing cell |
    #[instrument(skip_all, fields(n_rows = dataset.n_rows(), n_columns = dataset.n_columns()))]
    pub fn apply(&self, dataset: &Dataset) -> Result<(Dataset, FilterReport), DataError> {
        let mut report = FilterReport::default();

        for name in &self.drop_columns {
            if dataset.column(name).is_none() {
                warn!(column = %name, "drop-list column not present in dataset");
                report.unknown_drop_names.push(name.clone());
            }
        }

        let mut narrowed = dataset.clone();
        narrowed.retain_columns(|c| {
            let drop = self.drops(c.name());
            if drop {
                report.dropped_columns.push(c.name().to_string());
            }
            !drop
        });
        if narrowed.n_columns() == 0 {
            return Err(DataError::NoColumnsAfterFilter);
        }

        let (keep, removed): (Vec<usize>, Vec<usize>) =
            (0..narrowed.n_rows()).partition(|&r| !narrowed.row_has_missing(r));
        report.removed_rows = removed.iter().map(|&r| narrowed.row_ids()[r]).collect();
        if keep.is_empty() {
            return Err(DataError::EmptyAfterFilter {
                n_rows_before: narrowed.n_rows(),
            });
        }
        let filtered = narrowed.select_rows(&keep);

        for column in filtered.columns() {
            if let Some(cells) = column.as_numeric() {
                let values: Vec<f64> = cells.iter().flatten().copied().collect();
                if is_near_constant(&values) {
                    warn!(column = column.name(), "near-constant column kept");
                    report.near_constant_columns.push(column.name().to_string());
                }
            }
        }

        info!(
            dropped_columns = report.dropped_columns.len(),
            removed_rows = report.removed_rows.len(),
            n_rows = filtered.n_rows(),
            n_columns = filtered.n_columns(),
            "filter applied"
        );
        Ok((filtered, report))
    }
}

/// Near-zero-variance rule: a single distinct value, or the most common
/// value is more than 19 times as frequent as the runner-up while distinct
/// values make up under 10% of the rows.
fn is_near_constant(values: &[f64]) -> bool {
    if values.is_empty() {
        return false;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut counts: Vec<usize> = Vec::new();
    let mut prev: Option<f64> = None;
    for &v in &sorted {
        if prev == Some(v) {
            if let Some(last) = counts.last_mut() {
                *last += 1;
            }
        } else {
            counts.push(1);
            prev = Some(v);
        }
    }
    if counts.len() == 1 {
        return true;
    }
    counts.sort_unstable_by(|a, b| b.cmp(a));
    let freq_ratio = counts[0] as f64 / counts[1] as f64;
    let percent_unique = 100.0 * counts.len() as f64 / values.len() as f64;
    freq_ratio > 19.0 && percent_unique < 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Column, ColumnData};

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                Column::new("id".into(), ColumnData::Text(vec![Some("a".into()), Some("b".into()), Some("c".into())])),
                Column::new("LemasSwornFT".into(), ColumnData::Numeric(vec![None, None, Some(1.0)])),
                Column::new("x".into(), ColumnData::Numeric(vec![Some(1.0), None, Some(3.0)])),
                Column::new("flat".into(), ColumnData::Numeric(vec![Some(7.0), Some(7.0), Some(7.0)])),
                Column::new("y".into(), ColumnData::Numeric(vec![Some(0.1), Some(0.2), Some(0.3)])),
            ],
            (0..3).map(RowId::new).collect(),
        )
    }

    #[test]
    fn drops_names_patterns_and_missing_rows() {
        let filter = FeatureFilter::new()
            .with_drop_columns(["id", "ghost"])
            .with_drop_patterns(["Lemas"]);
        let (filtered, report) = filter.apply(&dataset()).unwrap();

        assert_eq!(filtered.column_names(), vec!["x", "flat", "y"]);
        assert_eq!(report.dropped_columns, vec!["id", "LemasSwornFT"]);
        assert_eq!(report.unknown_drop_names, vec!["ghost"]);
        assert_eq!(report.removed_rows, vec![RowId::new(1)]);
        assert_eq!(filtered.row_ids(), &[RowId::new(0), RowId::new(2)]);
        assert_eq!(report.near_constant_columns, vec!["flat"]);
    }

    #[test]
    fn patterns_are_case_sensitive() {
        let filter = FeatureFilter::new().with_drop_patterns(["lemas"]);
        let (filtered, _) = filter.apply(&dataset()).unwrap();
        assert!(filtered.column("LemasSwornFT").is_some());
    }

    #[test]
    fn everything_dropped() {
        let filter = FeatureFilter::new().with_drop_patterns([""]);
        assert!(matches!(
            filter.apply(&dataset()),
            Err(DataError::NoColumnsAfterFilter)
        ));
    }

    #[test]
    fn every_row_missing() {
        let ds = Dataset::new(
            vec![
                Column::new("a".into(), ColumnData::Numeric(vec![None, Some(1.0)])),
                Column::new("b".into(), ColumnData::Numeric(vec![Some(1.0), None])),
            ],
            (0..2).map(RowId::new).collect(),
        );
        assert!(matches!(
            FeatureFilter::new().apply(&ds),
            Err(DataError::EmptyAfterFilter { n_rows_before: 2 })
        ));
    }

    #[test]
    fn near_constant_rule() {
        assert!(is_near_constant(&[2.0; 5]));
        let mut mostly_zero = vec![0.0; 100];
        mostly_zero[0] = 1.0;
        assert!(is_near_constant(&mostly_zero));
        assert!(!is_near_constant(&[1.0, 2.0, 3.0, 4.0]));
    }
}
