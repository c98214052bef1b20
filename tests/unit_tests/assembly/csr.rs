use fenris_lor::assembly::CsrParts;
use fenris_lor::error::AssemblyError;
use nalgebra::DMatrix;
use nalgebra_sparse::CsrMatrix;

/// A 2x3 matrix whose first row is stored out of column order.
fn unsorted() -> CsrParts<f64> {
    CsrParts::try_from_parts(2, 3, vec![0, 2, 3], vec![2, 0, 1], vec![1.0, 2.0, 3.0]).unwrap()
}

#[test]
fn try_from_parts_validates_structure() {
    assert!(matches!(
        CsrParts::try_from_parts(2, 3, vec![0, 2], vec![0, 1], vec![1.0, 2.0]),
        Err(AssemblyError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        CsrParts::try_from_parts(2, 3, vec![0, 2, 1], vec![0], vec![1.0]),
        Err(AssemblyError::SparseFormat(_))
    ));
    assert!(matches!(
        CsrParts::try_from_parts(1, 3, vec![0, 1], vec![3], vec![1.0]),
        Err(AssemblyError::SparseFormat(_))
    ));
    assert!(matches!(
        CsrParts::try_from_parts(1, 3, vec![0, 2], vec![0, 1], vec![1.0]),
        Err(AssemblyError::DimensionMismatch { .. })
    ));
}

#[test]
fn entry_access() {
    let matrix = unsorted();
    assert_eq!(matrix.nnz(), 3);
    assert_eq!(matrix.row(0), (&[2, 0][..], &[1.0, 2.0][..]));
    assert_eq!(matrix.get_entry(0, 0), Some(&2.0));
    assert_eq!(matrix.get_entry(1, 0), None);
    let triplets: Vec<_> = matrix.triplet_iter().map(|(i, j, v)| (i, j, *v)).collect();
    assert_eq!(triplets, vec![(0, 2, 1.0), (0, 0, 2.0), (1, 1, 3.0)]);

    let pattern = matrix.pattern();
    assert!(pattern.contains(0, 2));
    assert!(!pattern.contains(1, 2));
    assert_eq!(pattern.row_columns(1), &[1]);
}

#[test]
fn sorting_permutes_values_along_with_columns() {
    let mut matrix = unsorted();
    matrix.sort_column_indices();
    assert_eq!(matrix.col_indices(), &[0, 2, 1]);
    assert_eq!(matrix.values(), &[2.0, 1.0, 3.0]);
}

#[test]
fn conversion_to_csr_matrix() {
    let csr = unsorted().into_csr_matrix().unwrap();
    let expected = DMatrix::from_row_slice(2, 3, &[2.0, 0.0, 1.0, 0.0, 3.0, 0.0]);
    assert_eq!(DMatrix::from(&csr), expected);

    let roundtrip = CsrParts::from_csr_matrix(csr);
    assert_eq!(roundtrip.to_dense(), expected);
}

#[test]
fn duplicate_columns_are_summed_densely_but_rejected_by_csr_matrix() {
    let duplicates = CsrParts::try_from_parts(1, 2, vec![0, 2], vec![1, 1], vec![1.0, 2.0]).unwrap();
    assert_eq!(duplicates.to_dense(), DMatrix::from_row_slice(1, 2, &[0.0, 3.0]));
    assert!(matches!(duplicates.into_csr_matrix(), Err(AssemblyError::SparseFormat(_))));
}

#[test]
fn rows_can_be_mutated_independently() {
    let mut matrix = CsrParts::from_csr_matrix(CsrMatrix::<f64>::identity(3));
    let (pattern, rows) = matrix.pattern_and_rows_mut();
    assert_eq!(rows.len(), 3);
    assert!(pattern.contains(2, 2));
    for mut row in rows {
        let scale = row.row_index() as f64 + 1.0;
        row.values_mut().iter_mut().for_each(|v| *v *= scale);
    }
    assert_eq!(matrix.values(), &[1.0, 2.0, 3.0]);
}

#[test]
fn empty_matrix() {
    let matrix = CsrParts::<f64>::empty(3, 2);
    assert_eq!(matrix.row_offsets(), &[0, 0, 0, 0]);
    assert_eq!(matrix.to_dense(), DMatrix::zeros(3, 2));
}
