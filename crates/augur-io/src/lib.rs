//! File I/O, filtering, and splitting for the augur pipeline.

mod domain;
mod error;
mod filter;
mod reader;
mod split;
mod writer;

pub use domain::{Column, ColumnData, Dataset, ExperimentName, FeatureMatrix, RowId};
pub use error::{DataError, LoadError, WriteError};
pub use filter::{FeatureFilter, FilterReport};
pub use reader::DatasetReader;
pub use split::{Split, Splitter};
pub use writer::ResultWriter;
