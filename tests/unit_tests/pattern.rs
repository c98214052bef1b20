use fenris_lor::error::AssemblyError;
use fenris_lor::pattern::{ElementValues, LocalSparsityPattern};
use nalgebra::DMatrix;

fn tridiagonal_pattern() -> LocalSparsityPattern {
    LocalSparsityPattern::try_from_packed(3, 3, &[-1, 0, 1, 0, 1, 2, 1, 2, -1]).unwrap()
}

#[test]
fn pattern_lookup() {
    let pattern = tridiagonal_pattern();
    assert_eq!(pattern.nnz_per_row(), 3);
    assert_eq!(pattern.nnz(), 7);
    assert_eq!(pattern.row(0), &[None, Some(0), Some(1)]);
    assert_eq!(pattern.column(2, 1), Some(2));
    assert_eq!(pattern.find_slot(2, 1), Some(0));
    assert_eq!(pattern.find_slot(0, 2), None);
}

#[test]
fn dense_pattern_couples_everything() {
    let pattern = LocalSparsityPattern::dense(3);
    assert_eq!(pattern.nnz(), 9);
    for row in 0..3 {
        for col in 0..3 {
            assert_eq!(pattern.find_slot(row, col), Some(col));
        }
    }
}

#[test]
fn invalid_patterns_are_rejected() {
    assert!(matches!(
        LocalSparsityPattern::try_new(2, 2, vec![Some(0), Some(2), Some(1), None]),
        Err(AssemblyError::InvalidPattern(_))
    ));
    assert!(matches!(
        LocalSparsityPattern::try_new(2, 2, vec![Some(0), Some(0), Some(1), None]),
        Err(AssemblyError::InvalidPattern(_))
    ));
    assert!(matches!(
        LocalSparsityPattern::try_new(2, 2, vec![Some(0)]),
        Err(AssemblyError::DimensionMismatch { expected: 4, actual: 1, .. })
    ));
}

#[test]
fn element_values_layout() {
    let values: Vec<f64> = (0..18u32).map(f64::from).collect();
    let element_values = ElementValues::try_new(3, 3, 2, values).unwrap();
    assert_eq!(element_values.num_elements(), 2);
    // Slot fastest, then row, then element
    assert_eq!(*element_values.get(1, 2, 1), 16.0);

    assert!(matches!(
        ElementValues::try_new(3, 3, 2, vec![0.0; 17]),
        Err(AssemblyError::DimensionMismatch { expected: 18, actual: 17, .. })
    ));
}

#[test]
fn dense_element_matrices_roundtrip_through_pattern() {
    let pattern = tridiagonal_pattern();
    #[rustfmt::skip]
    let matrix = DMatrix::from_row_slice(3, 3, &[
        1.0, 2.0, 3.0,
        4.0, 5.0, 6.0,
        7.0, 8.0, 9.0,
    ]);
    let values = ElementValues::from_dense_element_matrices(&pattern, &[matrix]).unwrap();
    // Entries outside the pattern are dropped
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        1.0, 2.0, 0.0,
        4.0, 5.0, 6.0,
        0.0, 8.0, 9.0,
    ]);
    assert_eq!(values.element_matrix(&pattern, 0), expected);

    let wrong_size = DMatrix::<f64>::zeros(2, 2);
    assert!(ElementValues::from_dense_element_matrices(&pattern, &[wrong_size]).is_err());
}
