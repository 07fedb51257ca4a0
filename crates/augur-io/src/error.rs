//! Error types for augur-io.

use std::path::PathBuf;

/// Errors from reading and parsing the input file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The input file is missing or cannot be opened.
    #[error("cannot open {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A record the CSV reader cannot parse, or a quoted field that is
    /// never closed.
    #[error("malformed CSV in {path} at line {line} (byte {offset}): {reason}")]
    CsvParse {
        /// Path to the input file.
        path: PathBuf,
        /// 1-based line of the bad record.
        line: u64,
        /// Byte position of the bad record.
        offset: u64,
        /// What is wrong with it.
        reason: String,
        /// Underlying CSV error, when the csv reader raised one.
        source: Option<csv::Error>,
    },

    /// A data row wider or narrower than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} fields, expected {expected}")]
    InconsistentRowLength {
        /// Path to the input file.
        path: PathBuf,
        /// Data row, counted from 0 after the header.
        row_index: usize,
        /// Expected number of fields (from header).
        expected: usize,
        /// Actual number of fields in this row.
        got: usize,
    },

    /// The header is empty or names a column with only whitespace.
    #[error("unusable header in {path}: no columns or a blank column name")]
    EmptyHeader {
        /// Path to the input file.
        path: PathBuf,
    },

    /// Two header fields share a name.
    #[error("duplicate column \"{name}\" in {path}: positions {first} and {second}")]
    DuplicateColumn {
        /// Path to the input file.
        path: PathBuf,
        /// The duplicated name.
        name: String,
        /// Zero-based position of the first occurrence.
        first: usize,
        /// Zero-based position of the second occurrence.
        second: usize,
    },

    /// A header with nothing under it.
    #[error("{path} has a header but no data rows")]
    EmptyDataset {
        /// Path to the input file.
        path: PathBuf,
    },
}

/// Errors from filtering, splitting, and matrix extraction.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Missing-value removal dropped every row.
    #[error("no rows left after filtering ({n_rows_before} rows before)")]
    EmptyAfterFilter {
        /// Row count before missing-value removal.
        n_rows_before: usize,
    },

    /// Every column was excluded or dropped.
    #[error("no columns left after filtering")]
    NoColumnsAfterFilter,

    /// Train fractions must leave rows on both sides.
    #[error("split fraction must be in (0, 1), got {fraction}")]
    InvalidSplitFraction {
        /// The rejected fraction.
        fraction: f64,
    },

    /// A configured column name the dataset does not have.
    #[error("unknown column \"{name}\"")]
    UnknownColumn {
        /// The requested column name.
        name: String,
    },

    /// The target or a predictor holds text.
    #[error("column \"{name}\" is not numeric")]
    NonNumericColumn {
        /// The offending column name.
        name: String,
    },

    /// The target column still has gaps.
    #[error("column \"{name}\" has {count} missing values")]
    MissingValues {
        /// The offending column name.
        name: String,
        /// Number of missing cells.
        count: usize,
    },

    /// Rounding left no rows on one side of the split.
    #[error("split produced an empty side: {n_train} train rows, {n_test} test rows")]
    EmptySplit {
        /// Rows assigned to train.
        n_train: usize,
        /// Rows assigned to test.
        n_test: usize,
    },
}

/// Errors from writing result artifacts.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Experiment names become file-name prefixes, so only ASCII letters,
    /// digits, `_` and `-` are accepted.
    #[error("experiment name \"{name}\" may only use letters, digits, '_' and '-'")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    #[error("cannot create {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    #[error("cannot encode {path} as JSON")]
    Serialize {
        /// Destination path.
        path: PathBuf,
        /// Underlying encoder error.
        source: serde_json::Error,
    },

    #[error("cannot write {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
