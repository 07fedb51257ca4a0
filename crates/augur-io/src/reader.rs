//! Delimited-file reader with column type inference.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::domain::{Column, ColumnData, Dataset, RowId};
use crate::error::LoadError;

/// Reads a delimited text file with a header row into a [`Dataset`].
///
/// A column is numeric when every non-missing cell parses as a finite
/// float, text otherwise. Cells that are empty or equal to the missing
/// token (after trimming) are missing.
///
/// # Defaults
///
/// | Parameter   | Default |
/// |-------------|---------|
/// | `delimiter` | `,`     |
/// | `quote`     | `"`     |
/// | `na_token`  | `?`     |
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`LoadError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`LoadError::CsvParse`] | Malformed record or an unclosed quoted field |
/// | [`LoadError::EmptyHeader`] | Header has no columns or a blank name |
/// | [`LoadError::DuplicateColumn`] | Same column name appears twice |
/// | [`LoadError::InconsistentRowLength`] | Row has a different field count than the header |
/// | [`LoadError::EmptyDataset`] | Zero data rows after header |
#[derive(Debug, Clone)]
pub struct DatasetReader {
    path: PathBuf,
    delimiter: u8,
    quote: u8,
    na_token: String,
}

impl DatasetReader {
    /// Create a new reader for the given file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            delimiter: b',',
            quote: b'"',
            na_token: "?".to_string(),
        }
    }

    /// Set the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote character.
    #[must_use]
    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    /// Set the missing-value token.
    #[must_use]
    pub fn with_na_token(mut self, na_token: impl Into<String>) -> Self {
        self.na_token = na_token.into();
        self
    }

    fn csv_error(&self, e: csv::Error) -> LoadError {
        LoadError::CsvParse {
            path: self.path.clone(),
            line: e.position().map_or(0, csv::Position::line),
            offset: e.position().map_or(0, csv::Position::byte),
            reason: e.to_string(),
            source: Some(e),
        }
    }

    /// Read the file and infer column types.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, LoadError> {
        let bytes = std::fs::read(&self.path).map_err(|e| LoadError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // The csv reader runs an open quoted field to end of input without
        // complaint, swallowing every later row into one cell.
        if let Some(open) = unterminated_quote(&bytes, self.delimiter, self.quote) {
            return Err(LoadError::CsvParse {
                path: self.path.clone(),
                line: open.line,
                offset: open.offset,
                reason: format!("quoted field opened on line {} is never closed", open.line),
                source: None,
            });
        }

        // flexible(true) lets our InconsistentRowLength check fire instead of
        // a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .from_reader(bytes.as_slice());

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let names: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();
        if names.is_empty() || names.iter().any(String::is_empty) {
            return Err(LoadError::EmptyHeader {
                path: self.path.clone(),
            });
        }
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (position, name) in names.iter().enumerate() {
            if let Some(&first) = seen.get(name.as_str()) {
                return Err(LoadError::DuplicateColumn {
                    path: self.path.clone(),
                    name: name.clone(),
                    first,
                    second: position,
                });
            }
            seen.insert(name.as_str(), position);
        }
        debug!(n_columns = names.len(), "read header");

        let mut raw: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;
            if record.len() != names.len() {
                return Err(LoadError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected: names.len(),
                    got: record.len(),
                });
            }
            for (cells, field) in raw.iter_mut().zip(record.iter()) {
                let field = field.trim();
                cells.push((!field.is_empty() && field != self.na_token).then(|| field.to_string()));
            }
        }

        let n_rows = raw.first().map_or(0, Vec::len);
        if n_rows == 0 {
            return Err(LoadError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let columns: Vec<Column> = names
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| Column::new(name, infer_column(cells)))
            .collect();
        let n_numeric = columns.iter().filter(|c| c.is_numeric()).count();

        info!(
            n_rows,
            n_columns = columns.len(),
            n_numeric,
            n_text = columns.len() - n_numeric,
            "dataset loaded"
        );

        Ok(Dataset::new(columns, (0..n_rows).map(RowId::new).collect()))
    }
}

/// Where an unclosed quoted field starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenQuote {
    line: u64,
    offset: u64,
}

/// Find a quoted field still open at end of input.
///
/// Follows the csv reader's rules: a quote only opens a field when it is the
/// field's first byte, and inside a quoted field a doubled quote is a literal.
fn unterminated_quote(bytes: &[u8], delimiter: u8, quote: u8) -> Option<OpenQuote> {
    let mut line = 1u64;
    let mut field_start = true;
    let mut open: Option<OpenQuote> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\n' {
            line += 1;
        }
        if open.is_some() {
            if b == quote {
                if bytes.get(i + 1) == Some(&quote) {
                    i += 1;
                } else {
                    open = None;
                }
            }
        } else if b == quote && field_start {
            open = Some(OpenQuote {
                line,
                offset: i as u64,
            });
            field_start = false;
        } else {
            field_start = b == delimiter || b == b'\n' || b == b'\r';
        }
        i += 1;
    }
    open
}

/// Numeric when every present cell parses as a finite float.
fn infer_column(cells: Vec<Option<String>>) -> ColumnData {
    let parsed: Option<Vec<Option<f64>>> = cells
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(s) => s.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some),
        })
        .collect();
    match parsed {
        Some(values) => ColumnData::Numeric(values),
        None => ColumnData::Text(cells),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn infers_numeric_and_text() {
        let f = write_csv("name,x,y\nalpha,1.5,2\nbeta,?,3\n\"gamma, inc\",2.5,\n");
        let ds = DatasetReader::new(f.path()).read().unwrap();
        assert_eq!(ds.n_rows(), 3);
        assert_eq!(ds.column_names(), vec!["name", "x", "y"]);
        assert!(!ds.column("name").unwrap().is_numeric());
        assert_eq!(
            ds.column("x").unwrap().as_numeric().unwrap(),
            &[Some(1.5), None, Some(2.5)]
        );
        assert_eq!(ds.column("y").unwrap().n_missing(), 1);
        assert_eq!(ds.row_ids()[2].index(), 2);
    }

    #[test]
    fn custom_delimiter_and_na_token() {
        let f = write_csv("a;b\n1;NA\n2;4\n");
        let ds = DatasetReader::new(f.path())
            .with_delimiter(b';')
            .with_na_token("NA")
            .read()
            .unwrap();
        assert_eq!(ds.column("b").unwrap().as_numeric().unwrap(), &[None, Some(4.0)]);
    }

    #[test]
    fn non_finite_cell_makes_text_column() {
        let f = write_csv("a\n1.0\ninf\n");
        let ds = DatasetReader::new(f.path()).read().unwrap();
        assert!(!ds.column("a").unwrap().is_numeric());
    }

    #[test]
    fn error_file_not_found() {
        let result = DatasetReader::new(Path::new("/nonexistent/file.csv")).read();
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_csv("a,b,c\n");
        let result = DatasetReader::new(f.path()).read();
        assert!(matches!(result, Err(LoadError::EmptyDataset { .. })));
    }

    #[test]
    fn error_inconsistent_row_length() {
        let f = write_csv("a,b,c\n1,2,3\n1,2\n");
        let result = DatasetReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(LoadError::InconsistentRowLength { row_index: 1, expected: 3, got: 2, .. })
        ));
    }

    #[test]
    fn error_unclosed_quote() {
        let f = write_csv("a,b\n1,\"2\n3,4\n5,6\n");
        let result = DatasetReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(LoadError::CsvParse { line: 2, offset: 6, source: None, .. })
        ));
    }

    #[test]
    fn quote_scan_follows_csv_rules() {
        let scan = |s: &str| unterminated_quote(s.as_bytes(), b',', b'"');
        assert_eq!(scan("a,b\n\"x, \"\"y\"\"\",2\n"), None);
        assert_eq!(scan("a,b\n\"multi\nline\",2\n"), None);
        // A quote inside an unquoted field is literal.
        assert_eq!(scan("a,b\n5\" pipe,2\n"), None);
        assert_eq!(
            scan("a,b\n1,2\n\"open,3\n"),
            Some(OpenQuote { line: 3, offset: 8 })
        );
        assert_eq!(scan("a\n\"x\"\"\n"), Some(OpenQuote { line: 2, offset: 2 }));
    }

    #[test]
    fn error_blank_header_name() {
        let f = write_csv("a,,c\n1,2,3\n");
        let result = DatasetReader::new(f.path()).read();
        assert!(matches!(result, Err(LoadError::EmptyHeader { .. })));
    }

    #[test]
    fn error_duplicate_column() {
        let f = write_csv("a,b,a\n1,2,3\n");
        let result = DatasetReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(LoadError::DuplicateColumn { first: 0, second: 2, .. })
        ));
    }
}
