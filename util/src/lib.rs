//! Fixtures shared by the tests.
use nalgebra::{DMatrix, Scalar};
use num::Zero;

/// An oriented DOF of a test connectivity, `(index, flipped)`.
pub type OrientedDof = (usize, bool);

/// Assembles element matrices into a dense global matrix by plain summation.
///
/// `gather_map[e * n + a]` is the oriented global DOF of local DOF `a` in element `e`. Entries
/// coupling DOFs with opposite orientations are negated.
pub fn dense_reference_assembly(
    num_dofs: usize,
    gather_map: &[OrientedDof],
    element_matrices: &[DMatrix<f64>],
) -> DMatrix<f64> {
    let mut global = DMatrix::zeros(num_dofs, num_dofs);
    let mut begin = 0;
    for matrix in element_matrices {
        let n = matrix.nrows();
        let dofs = &gather_map[begin..begin + n];
        for (a, &(i, flip_i)) in dofs.iter().enumerate() {
            for (b, &(j, flip_j)) in dofs.iter().enumerate() {
                let sign = if flip_i != flip_j { -1.0 } else { 1.0 };
                global[(i, j)] += sign * matrix[(a, b)];
            }
        }
        begin += n;
    }
    global
}

/// Applies symmetric elimination of the given DOFs to a dense matrix.
///
/// Rows and columns are zeroed, and the diagonal entry is set to `diagonal`, or kept if `None`.
pub fn dense_reference_elimination(matrix: &DMatrix<f64>, essential: &[usize], diagonal: Option<f64>) -> DMatrix<f64> {
    let mut result = matrix.clone();
    for &i in essential {
        let kept = result[(i, i)];
        result.row_mut(i).fill(0.0);
        result.column_mut(i).fill(0.0);
        result[(i, i)] = diagonal.unwrap_or(kept);
    }
    result
}

/// The gather map of a chain of segment elements of the given order.
pub fn chain_gather_map(num_elements: usize, order: usize) -> Vec<usize> {
    (0..num_elements)
        .flat_map(|e| (0..=order).map(move |a| e * order + a))
        .collect()
}

/// The element matrix `[[2, -1], [-1, 2]]` used by the chain scenarios.
pub fn chain_element_matrix() -> DMatrix<f64> {
    DMatrix::from_row_slice(2, 2, &[2.0, -1.0, -1.0, 2.0])
}

/// Stacks row blocks of equal width into a single matrix.
pub fn stack_rows<T: Scalar + Zero>(blocks: &[DMatrix<T>]) -> Option<DMatrix<T>> {
    let first = blocks.first()?;
    let ncols = first.ncols();
    let nrows = blocks.iter().map(DMatrix::nrows).sum();
    let mut output = DMatrix::zeros(nrows, ncols);
    let mut row = 0;
    for block in blocks {
        assert_eq!(block.ncols(), ncols, "All blocks must have the same number of columns.");
        output.rows_mut(row, block.nrows()).copy_from(block);
        row += block.nrows();
    }
    Some(output)
}
