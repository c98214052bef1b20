use fenris_lor::assembly::{assemble_csr, BatchedCsrAssembler};
use fenris_lor::dof::SignedDof;
use fenris_lor::error::AssemblyError;
use fenris_lor::pattern::{ElementValues, LocalSparsityPattern};
use fenris_lor::restriction::{ElementRestriction, VectorOrdering};
use matrixcompare::assert_matrix_eq;
use nalgebra::DMatrix;
use util::{chain_element_matrix, chain_gather_map, dense_reference_assembly};

mod csr;

fn chain_restriction(num_elements: usize) -> ElementRestriction {
    let gather_map = chain_gather_map(num_elements, 1)
        .into_iter()
        .map(SignedDof::positive)
        .collect();
    ElementRestriction::try_from_gather_map(num_elements + 1, 2, gather_map).unwrap()
}

fn chain_values(num_elements: usize, pattern: &LocalSparsityPattern) -> ElementValues<f64> {
    let matrices = vec![chain_element_matrix(); num_elements];
    ElementValues::from_dense_element_matrices(pattern, &matrices).unwrap()
}

#[test]
fn two_element_chain_with_dense_pattern() {
    let restriction = chain_restriction(2);
    let pattern = LocalSparsityPattern::dense(2);
    let values = chain_values(2, &pattern);

    let matrix = assemble_csr(&restriction, &pattern, &values).unwrap();
    assert_eq!(matrix.nrows(), 3);
    assert_eq!(matrix.ncols(), 3);
    assert_eq!(matrix.nnz(), 7);
    assert_eq!(matrix.row_offsets(), &[0, 2, 5, 7]);

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
         2.0, -1.0,  0.0,
        -1.0,  4.0, -1.0,
         0.0, -1.0,  2.0,
    ]);
    assert_eq!(matrix.to_dense(), expected);
    // Shared entries are emitted once, so no row holds duplicate columns
    assert_eq!(matrix.get_entry(1, 1), Some(&4.0));
}

#[test]
fn count_pass_matches_assembled_offsets() {
    let restriction = chain_restriction(4);
    let pattern = LocalSparsityPattern::dense(2);
    let offsets = BatchedCsrAssembler::new()
        .count_row_entries(&restriction, &pattern)
        .unwrap();
    assert_eq!(offsets, vec![0, 2, 5, 8, 11, 13]);
}

#[test]
fn fill_pass_detects_row_count_mismatch() {
    let restriction = chain_restriction(2);
    let pattern = LocalSparsityPattern::dense(2);
    let values = chain_values(2, &pattern);

    let mut cols = vec![0; 7];
    let mut data = vec![0.0; 7];
    let result = BatchedCsrAssembler::new().fill_columns_and_values(
        &restriction,
        &pattern,
        &values,
        &[0, 1, 5, 7],
        &mut cols,
        &mut data,
    );
    assert!(matches!(result, Err(AssemblyError::RowCountMismatch { row: 0, .. })));
}

#[test]
fn orientations_negate_entries_between_opposite_dofs() {
    let gather_map = [(0, false), (1, false), (1, true), (2, false)];
    let restriction = ElementRestriction::try_from_gather_map(
        3,
        2,
        gather_map
            .iter()
            .map(|&(dof, flipped)| SignedDof::new(dof, flipped))
            .collect(),
    )
    .unwrap();
    let matrices = vec![
        DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]),
        DMatrix::from_row_slice(2, 2, &[5.0, 6.0, 7.0, 8.0]),
    ];
    let pattern = LocalSparsityPattern::dense(2);
    let values = ElementValues::from_dense_element_matrices(&pattern, &matrices).unwrap();

    let matrix = assemble_csr(&restriction, &pattern, &values).unwrap();
    let expected = dense_reference_assembly(3, &gather_map, &matrices);
    assert_matrix_eq!(matrix.to_dense(), expected);
    assert_eq!(expected[(1, 2)], -6.0);
    assert_eq!(expected[(1, 1)], 9.0);
}

#[test]
fn tridiagonal_pattern_with_unused_slots() {
    // Elements of order 2 on a chain, with local couplings only between neighboring DOFs
    let gather_map = chain_gather_map(2, 2).into_iter().map(SignedDof::positive).collect();
    let restriction = ElementRestriction::try_from_gather_map(5, 3, gather_map).unwrap();
    let pattern = LocalSparsityPattern::try_from_packed(3, 3, &[-1, 0, 1, 0, 1, 2, 1, 2, -1]).unwrap();
    #[rustfmt::skip]
    let element = DMatrix::from_row_slice(3, 3, &[
         1.0, -1.0,  0.0,
        -1.0,  2.0, -1.0,
         0.0, -1.0,  1.0,
    ]);
    let values = ElementValues::from_dense_element_matrices(&pattern, &[element.clone(), element]).unwrap();

    let matrix = assemble_csr(&restriction, &pattern, &values).unwrap();
    assert_eq!(matrix.nnz(), 13);
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(5, 5, &[
         1.0, -1.0,  0.0,  0.0,  0.0,
        -1.0,  2.0, -1.0,  0.0,  0.0,
         0.0, -1.0,  2.0, -1.0,  0.0,
         0.0,  0.0, -1.0,  2.0, -1.0,
         0.0,  0.0,  0.0, -1.0,  1.0,
    ]);
    assert_eq!(matrix.to_dense(), expected);
}

#[test]
fn inconsistent_pattern_is_reported() {
    // Two bilinear quadrilaterals sharing the edge with DOFs 1 and 4
    let gather_map = [0, 1, 3, 4, 1, 2, 4, 5]
        .into_iter()
        .map(SignedDof::positive)
        .collect();
    let restriction = ElementRestriction::try_from_gather_map(6, 4, gather_map).unwrap();
    // Local row 1 couples to local column 3, but not the other way around for the shared edge
    let pattern = LocalSparsityPattern::try_new(
        2,
        4,
        vec![Some(0), None, Some(1), Some(3), Some(2), None, Some(3), Some(1)],
    )
    .unwrap();
    let values = ElementValues::<f64>::zeros(&pattern, 2);

    let result = assemble_csr(&restriction, &pattern, &values);
    assert!(matches!(
        result,
        Err(AssemblyError::InconsistentPattern { element: 1, .. })
    ));
}

#[test]
fn parallel_granularity_does_not_change_result() {
    let restriction = chain_restriction(50);
    let pattern = LocalSparsityPattern::dense(2);
    let values = chain_values(50, &pattern);

    let fine = BatchedCsrAssembler::new()
        .with_min_parallel_len(1)
        .assemble(&restriction, &pattern, &values)
        .unwrap();
    let coarse = BatchedCsrAssembler::new()
        .with_min_parallel_len(10_000)
        .assemble(&restriction, &pattern, &values)
        .unwrap();
    assert_eq!(fine.row_offsets(), coarse.row_offsets());
    assert_eq!(fine.to_dense(), coarse.to_dense());
    assert_eq!(BatchedCsrAssembler::new().with_min_parallel_len(0).min_parallel_len(), 1);
}

#[test]
fn unreferenced_dofs_have_empty_rows() {
    let gather_map = vec![SignedDof::positive(0), SignedDof::positive(2)];
    let restriction = ElementRestriction::try_from_gather_map(3, 2, gather_map).unwrap();
    let pattern = LocalSparsityPattern::dense(2);
    let values = chain_values(1, &pattern);

    let matrix = assemble_csr(&restriction, &pattern, &values).unwrap();
    assert_eq!(matrix.row_offsets(), &[0, 2, 2, 4]);
    assert_eq!(matrix.row(1).0, &[] as &[usize]);
}

#[test]
fn empty_restriction_gives_empty_matrix() {
    let restriction = ElementRestriction::try_from_gather_map(0, 4, Vec::new()).unwrap();
    let pattern = LocalSparsityPattern::dense(4);
    let values = ElementValues::<f64>::zeros(&pattern, 0);
    let matrix = assemble_csr(&restriction, &pattern, &values).unwrap();
    assert_eq!(matrix.nrows(), 0);
    assert_eq!(matrix.nnz(), 0);
}

#[test]
fn invalid_inputs_are_rejected() {
    let pattern = LocalSparsityPattern::dense(2);
    let values = chain_values(2, &pattern);

    let vector_restriction = chain_restriction(2)
        .with_vector_dimension(2, VectorOrdering::ByNodes)
        .unwrap();
    assert!(matches!(
        assemble_csr(&vector_restriction, &pattern, &values),
        Err(AssemblyError::VectorDimensionUnsupported(2))
    ));

    let wrong_pattern = LocalSparsityPattern::dense(3);
    assert!(matches!(
        BatchedCsrAssembler::new().count_row_entries(&chain_restriction(2), &wrong_pattern),
        Err(AssemblyError::DimensionMismatch { expected: 2, actual: 3, .. })
    ));

    let too_few_values = chain_values(1, &pattern);
    assert!(matches!(
        assemble_csr(&chain_restriction(2), &pattern, &too_few_values),
        Err(AssemblyError::DimensionMismatch { expected: 2, actual: 1, .. })
    ));
}
