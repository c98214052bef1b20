use crate::assembly::csr::CsrParts;
use crate::error::AssemblyError;
use nalgebra::RealField;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// What happens to the diagonal entry of an eliminated row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagonalPolicy {
    /// The assembled diagonal value is left untouched.
    Keep,
    /// The diagonal entry is replaced by one.
    One,
}

impl Default for DiagonalPolicy {
    fn default() -> Self {
        Self::Keep
    }
}

/// Symmetrically eliminates the rows and columns of essential DOFs from a square matrix.
///
/// For every essential DOF `i`, all off-diagonal entries `(i, j)` of its row are zeroed, along
/// with the symmetric counterpart `(j, i)` of every stored entry `(i, j)`. The diagonal entry
/// is treated according to `policy`. The sparsity pattern is not changed.
///
/// Rows are processed in parallel, and every task only writes to its own row.
pub fn eliminate_essential_dofs<T: RealField>(
    matrix: &mut CsrParts<T>,
    essential_dofs: &[usize],
    policy: DiagonalPolicy,
) -> Result<(), AssemblyError> {
    let num_rows = matrix.nrows();
    if matrix.ncols() != num_rows {
        return Err(AssemblyError::DimensionMismatch {
            what: "columns of square matrix",
            expected: num_rows,
            actual: matrix.ncols(),
        });
    }

    let mut is_essential = vec![false; num_rows];
    for &dof in essential_dofs {
        *is_essential
            .get_mut(dof)
            .ok_or(AssemblyError::EssentialDofOutOfBounds { dof, num_rows })? = true;
    }
    log::trace!("Eliminating {} essential DOFs with policy {:?}", essential_dofs.len(), policy);

    let (pattern, rows) = matrix.pattern_and_rows_mut();
    rows.into_par_iter().for_each(|mut row| {
        let r = row.row_index();
        let (cols, values) = row.cols_and_values_mut();
        if is_essential[r] {
            for (&c, value) in cols.iter().zip(values.iter_mut()) {
                if c != r {
                    *value = T::zero();
                } else if policy == DiagonalPolicy::One {
                    *value = T::one();
                }
            }
        } else {
            for (&c, value) in cols.iter().zip(values.iter_mut()) {
                if is_essential[c] && pattern.contains(c, r) {
                    *value = T::zero();
                }
            }
        }
    });
    Ok(())
}
