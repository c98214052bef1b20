use fenris_lor::assembly::CsrParts;
use fenris_lor::distributed::{is_identity_prolongation, ParCsrMatrix, RowPartition, SerialTransport};
use fenris_lor::error::AssemblyError;
use nalgebra::DMatrix;
use nalgebra_sparse::CsrMatrix;


fn csr(dense: &DMatrix<f64>) -> CsrParts<f64> {
    CsrParts::from_csr_matrix(dense.into())
}

#[test]
fn row_partition_ownership() {
    let partition = RowPartition::from_local_sizes(&[2, 0, 3]);
    assert_eq!(partition.offsets(), &[0, 2, 2, 5]);
    assert_eq!(partition.num_partitions(), 3);
    assert_eq!(partition.global_size(), 5);
    assert_eq!(partition.range(2), 2..5);
    assert_eq!(partition.local_size(1), 0);
    assert_eq!(partition.owner(0), Some(0));
    assert_eq!(partition.owner(1), Some(0));
    // Empty partitions never own rows
    assert_eq!(partition.owner(2), Some(2));
    assert_eq!(partition.owner(4), Some(2));
    assert_eq!(partition.owner(5), None);

    assert_eq!(RowPartition::single(4), RowPartition::try_from_offsets(vec![0, 4]).unwrap());
}

#[test]
#[should_panic]
fn row_partition_range_panics_for_unknown_rank() {
    RowPartition::from_local_sizes(&[2, 3]).range(2);
}

#[test]
fn invalid_row_partitions() {
    assert!(RowPartition::try_from_offsets(vec![0]).is_err());
    assert!(RowPartition::try_from_offsets(vec![1, 2]).is_err());
    assert!(RowPartition::try_from_offsets(vec![0, 3, 2]).is_err());
}

#[test]
fn identity_prolongation_detection() {
    let partition = RowPartition::from_local_sizes(&[2, 1]);
    let identity_rows = CsrMatrix::try_from_csr_data(1, 3, vec![0, 1], vec![2], vec![1.0]).unwrap();
    assert!(is_identity_prolongation(&identity_rows, &partition, 1));
    assert!(!is_identity_prolongation(&identity_rows, &partition, 0));

    let scaled = CsrMatrix::try_from_csr_data(1, 3, vec![0, 1], vec![2], vec![2.0]).unwrap();
    assert!(!is_identity_prolongation(&scaled, &partition, 1));
    assert!(!is_identity_prolongation(&identity_rows, &partition, 5));
}

#[test]
fn block_diagonal_requires_square_local_block() {
    let local = csr(&DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]));
    let partition = RowPartition::from_local_sizes(&[2, 3]);

    let matrix = ParCsrMatrix::square_block_diagonal(0, partition.clone(), local.clone()).unwrap();
    assert!(matrix.is_block_diagonal());
    assert_eq!(matrix.owned_rows(), 0..2);
    assert_eq!(matrix.global_size(), 5);
    assert!(matrix.col_map_offd().is_empty());

    let global_rows = matrix.to_global_rows();
    assert_eq!(global_rows.ncols(), 5);
    assert_eq!(global_rows.get_entry(1, 0), Some(&-1.0));

    assert!(matches!(
        ParCsrMatrix::square_block_diagonal(1, partition.clone(), local.clone()),
        Err(AssemblyError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        ParCsrMatrix::square_block_diagonal(2, partition, local),
        Err(AssemblyError::Transport(_))
    ));
}

#[test]
fn single_partition_galerkin_product() {
    let local = csr(&DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]));
    let matrix = ParCsrMatrix::square_block_diagonal(0, RowPartition::single(2), local).unwrap();
    // Both local DOFs are copies of a single true DOF
    let prolongation = CsrMatrix::try_from_csr_data(2, 1, vec![0, 1, 2], vec![0, 0], vec![1.0, 1.0]).unwrap();

    let transport = SerialTransport::new();
    let product = matrix
        .pt_a_p(&prolongation, &RowPartition::single(1), &transport)
        .unwrap();
    assert_eq!(product.num_local_rows(), 1);
    assert!(product.is_block_diagonal());
    assert_eq!(product.diag().to_dense(), DMatrix::from_element(1, 1, 2.0));
}

#[test]
fn galerkin_product_validates_prolongation() {
    let local = csr(&DMatrix::identity(2, 2));
    let matrix = ParCsrMatrix::square_block_diagonal(0, RowPartition::single(2), local).unwrap();
    let transport = SerialTransport::new();

    let wrong_rows = CsrMatrix::<f64>::identity(3);
    assert!(matches!(
        matrix.pt_a_p(&wrong_rows, &RowPartition::single(3), &transport),
        Err(AssemblyError::InvalidProlongation(_))
    ));

    let wrong_cols = CsrMatrix::<f64>::identity(2);
    assert!(matches!(
        matrix.pt_a_p(&wrong_cols, &RowPartition::single(3), &transport),
        Err(AssemblyError::InvalidProlongation(_))
    ));
}

#[test]
fn serial_elimination_sets_unit_diagonal() {
    let local = csr(&DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0]));
    let mut matrix = ParCsrMatrix::square_block_diagonal(0, RowPartition::single(2), local).unwrap();
    matrix
        .eliminate_essential_rows_and_columns(&[1], &SerialTransport::new())
        .unwrap();
    assert_eq!(
        matrix.diag().to_dense(),
        DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 1.0])
    );
    assert!(matches!(
        matrix.eliminate_essential_rows_and_columns(&[2], &SerialTransport::new()),
        Err(AssemblyError::EssentialDofOutOfBounds { dof: 2, num_rows: 2 })
    ));
}
