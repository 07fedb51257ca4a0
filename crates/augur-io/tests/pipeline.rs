//! Integration tests: CSV -> filter -> split -> feature matrix -> JSON.

use std::fs;
use std::path::Path;

use augur_io::{
    DataError, DatasetReader, ExperimentName, FeatureFilter, ResultWriter, Splitter,
};
use tempfile::TempDir;

fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn standard_filter() -> FeatureFilter {
    FeatureFilter::new()
        .with_drop_columns(["communityname", "state", "fold"])
        .with_drop_patterns(["Lemas", "Polic"])
}

#[test]
fn load_filter_split_round_trip() {
    let dataset = DatasetReader::new(&fixture_path("communities_sample.csv"))
        .read()
        .expect("fixture should parse");
    assert_eq!(dataset.n_rows(), 40);
    assert_eq!(dataset.n_columns(), 9);
    assert!(!dataset.column("communityname").unwrap().is_numeric());
    assert_eq!(dataset.column("LemasSwornFT").unwrap().n_missing(), 26);

    let (filtered, report) = standard_filter().apply(&dataset).unwrap();
    assert_eq!(
        filtered.column_names(),
        vec!["population", "PctKids2Par", "PctIlleg", "medIncome", "ViolentCrimesPerPop"]
    );
    assert_eq!(report.unknown_drop_names, vec!["fold"]);
    // Row 5 has "?" income, row 11 an empty PctKids2Par cell.
    let removed: Vec<usize> = report.removed_rows.iter().map(|r| r.index()).collect();
    assert_eq!(removed, vec![5, 11]);
    assert_eq!(filtered.n_rows(), 38);

    let split = Splitter::new("ViolentCrimesPerPop", 0.8)
        .unwrap()
        .with_seed(49043)
        .split(&filtered)
        .unwrap();
    assert_eq!(split.train.n_rows() + split.test.n_rows(), 38);
    assert!(split.train.n_rows() >= 30);

    let matrix = split.train.feature_matrix("ViolentCrimesPerPop").unwrap();
    assert_eq!(matrix.feature_names.len(), 4);
    assert_eq!(matrix.rows.len(), split.train.n_rows());
    assert!(matrix.rows.iter().all(|r| r.len() == 4));

    let dir = TempDir::new().unwrap();
    let writer =
        ResultWriter::new(dir.path(), ExperimentName::new("fixture".into()).unwrap()).unwrap();
    let path = writer.write_json("filter", &report).unwrap();
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(content["removed_rows"].as_array().unwrap().len(), 2);
    assert_eq!(content["dropped_columns"][0], "communityname");
}

#[test]
fn split_is_reproducible_across_loads() {
    let load = || {
        let ds = DatasetReader::new(&fixture_path("communities_sample.csv"))
            .read()
            .unwrap();
        let (filtered, _) = standard_filter().apply(&ds).unwrap();
        Splitter::new("ViolentCrimesPerPop", 0.8)
            .unwrap()
            .with_seed(49043)
            .split(&filtered)
            .unwrap()
    };
    assert_eq!(load().train.row_ids(), load().train.row_ids());
}

#[test]
fn unfiltered_text_column_blocks_matrix() {
    let ds = DatasetReader::new(&fixture_path("communities_sample.csv"))
        .read()
        .unwrap();
    let err = ds.feature_matrix("ViolentCrimesPerPop").unwrap_err();
    assert!(matches!(err, DataError::NonNumericColumn { .. }));
}
