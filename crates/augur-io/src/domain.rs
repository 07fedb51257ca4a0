//! Domain types for augur-io.

use crate::error::{DataError, WriteError};

/// Stable identity of a row: its zero-based position in the input file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
)]
pub struct RowId(usize);

impl RowId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based row position in the input file.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`WriteError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, WriteError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(WriteError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cell storage of one column. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// Every non-missing cell parsed as a finite float.
    Numeric(Vec<Option<f64>>),
    /// At least one non-missing cell is not a number.
    Text(Vec<Option<String>>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
        }
    }

    fn select(&self, rows: &[usize]) -> Self {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&r| v[r]).collect()),
            ColumnData::Text(v) => {
                ColumnData::Text(rows.iter().map(|&r| v[r].clone()).collect())
            }
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub(crate) fn new(name: String, data: ColumnData) -> Self {
        Self { name, data }
    }

    /// Column name from the header.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the cells.
    #[must_use]
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// `true` when the column was inferred as numeric.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    /// Number of missing cells.
    #[must_use]
    pub fn n_missing(&self) -> usize {
        (0..self.data.len()).filter(|&r| self.data.is_missing(r)).count()
    }

    /// Numeric cells, or `None` for a text column.
    #[must_use]
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    /// Complete numeric values.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::NonNumericColumn`] | the column holds text |
    /// | [`DataError::MissingValues`] | any cell is missing |
    pub fn numeric_values(&self) -> Result<Vec<f64>, DataError> {
        let cells = self.as_numeric().ok_or_else(|| DataError::NonNumericColumn {
            name: self.name.clone(),
        })?;
        let values: Vec<f64> = cells.iter().flatten().copied().collect();
        if values.len() != cells.len() {
            return Err(DataError::MissingValues {
                name: self.name.clone(),
                count: cells.len() - values.len(),
            });
        }
        Ok(values)
    }
}

/// Rows × named columns, column-major, with a [`RowId`] per row.
///
/// Produced by [`DatasetReader`](crate::DatasetReader); narrowed by
/// [`FeatureFilter`](crate::FeatureFilter) and [`Splitter`](crate::Splitter).
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_ids: Vec<RowId>,
}

/// Model-ready numeric view of a [`Dataset`].
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Feature column names in dataset order, outcome excluded.
    pub feature_names: Vec<String>,
    /// Row-major feature values: `rows[sample][feature]`.
    pub rows: Vec<Vec<f64>>,
    /// Outcome value per row.
    pub targets: Vec<f64>,
    /// Identity of each row.
    pub row_ids: Vec<RowId>,
}

impl Dataset {
    pub(crate) fn new(columns: Vec<Column>, row_ids: Vec<RowId>) -> Self {
        debug_assert!(columns.iter().all(|c| c.data.len() == row_ids.len()));
        Self { columns, row_ids }
    }

    /// Borrow all columns in header order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by exact name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in header order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Row identities in row order.
    #[must_use]
    pub fn row_ids(&self) -> &[RowId] {
        &self.row_ids
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    /// Number of columns.
    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// `true` if any cell of row position `row` is missing.
    pub(crate) fn row_has_missing(&self, row: usize) -> bool {
        self.columns.iter().any(|c| c.data.is_missing(row))
    }

    /// Keep the rows at the given positions, in the given order.
    pub(crate) fn select_rows(&self, positions: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.select(positions)))
                .collect(),
            row_ids: positions.iter().map(|&p| self.row_ids[p]).collect(),
        }
    }

    /// Keep only the columns for which `keep` returns `true`.
    pub(crate) fn retain_columns(&mut self, mut keep: impl FnMut(&Column) -> bool) {
        self.columns.retain(|c| keep(c));
    }

    /// Split into a feature matrix (every column except `outcome`) and
    /// the outcome vector.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DataError::UnknownColumn`] | `outcome` is not a column |
    /// | [`DataError::NonNumericColumn`] | any used column holds text |
    /// | [`DataError::MissingValues`] | any used cell is missing |
    /// | [`DataError::NoColumnsAfterFilter`] | no feature column besides the outcome |
    pub fn feature_matrix(&self, outcome: &str) -> Result<FeatureMatrix, DataError> {
        let targets = self
            .column(outcome)
            .ok_or_else(|| DataError::UnknownColumn {
                name: outcome.to_string(),
            })?
            .numeric_values()?;

        let feature_columns: Vec<&Column> =
            self.columns.iter().filter(|c| c.name != outcome).collect();
        if feature_columns.is_empty() {
            return Err(DataError::NoColumnsAfterFilter);
        }
        let values = feature_columns
            .iter()
            .map(|c| c.numeric_values())
            .collect::<Result<Vec<_>, _>>()?;

        let rows = (0..self.n_rows())
            .map(|r| values.iter().map(|col| col[r]).collect())
            .collect();

        Ok(FeatureMatrix {
            feature_names: feature_columns.iter().map(|c| c.name.clone()).collect(),
            rows,
            targets,
            row_ids: self.row_ids.clone(),
        })
    }
}
