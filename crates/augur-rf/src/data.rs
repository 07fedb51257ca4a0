use crate::error::RfError;

/// Check a row-major training set and return `(n_samples, n_features)`.
///
/// The first row fixes the width. Problems are reported in the order
/// emptiness, width, target count, then row by row.
pub(crate) fn validate_training_data(
    features: &[Vec<f64>],
    targets: &[f64],
) -> Result<(usize, usize), RfError> {
    let Some(first) = features.first() else {
        return Err(RfError::EmptyDataset);
    };
    let (n_samples, n_features) = (features.len(), first.len());
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    if targets.len() != n_samples {
        return Err(RfError::TargetCountMismatch {
            samples: n_samples,
            targets: targets.len(),
        });
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    match targets.iter().position(|y| !y.is_finite()) {
        Some(sample_index) => Err(RfError::NonFiniteTarget { sample_index }),
        None => Ok((n_samples, n_features)),
    }
}

/// `columns[feature][row]` from `rows[row][feature]`.
pub(crate) fn to_columns(rows: &[Vec<f64>], n_features: usize) -> Vec<Vec<f64>> {
    let mut columns = vec![Vec::with_capacity(rows.len()); n_features];
    for row in rows {
        for (column, &value) in columns.iter_mut().zip(row) {
            column.push(value);
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_of_a_clean_table() {
        let rows = vec![vec![0.1, 0.2, 0.3]; 4];
        assert_eq!(validate_training_data(&rows, &[1.0; 4]).unwrap(), (4, 3));
    }

    #[test]
    fn first_problem_wins() {
        let ragged = vec![vec![1.0, 2.0], vec![f64::NAN]];
        assert!(matches!(
            validate_training_data(&ragged, &[0.0, 0.0]),
            Err(RfError::FeatureCountMismatch { expected: 2, got: 1, sample_index: 1 })
        ));
        assert!(matches!(
            validate_training_data(&[vec![], vec![]], &[0.0, 0.0]),
            Err(RfError::ZeroFeatures)
        ));
        assert!(matches!(
            validate_training_data(&[vec![1.0]], &[0.0, 1.0]),
            Err(RfError::TargetCountMismatch { samples: 1, targets: 2 })
        ));
    }

    #[test]
    fn non_finite_cells() {
        let rows = vec![vec![1.0, 2.0], vec![3.0, f64::NEG_INFINITY]];
        assert!(matches!(
            validate_training_data(&rows, &[0.0, 0.0]),
            Err(RfError::NonFiniteValue { sample_index: 1, feature_index: 1 })
        ));
        let rows = vec![vec![1.0], vec![2.0]];
        assert!(matches!(
            validate_training_data(&rows, &[f64::NAN, 0.0]),
            Err(RfError::NonFiniteTarget { sample_index: 0 })
        ));
    }

    #[test]
    fn transposes_rows_into_columns() {
        let rows = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        assert_eq!(
            to_columns(&rows, 2),
            vec![vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]]
        );
    }
}
