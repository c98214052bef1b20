//! Per-element sparsity patterns and values supplied by local kernels.
use crate::error::{check_len, AssemblyError};
use nalgebra::{DMatrix, RealField, Scalar};
use serde::{Deserialize, Serialize};

/// The nonzero pattern of the local matrix of a reference element.
///
/// Every local row has room for `nnz_per_row` nonzeros. Entry `(j, row)` is the local column of
/// the `j`-th nonzero of `row`, or `None` if that slot is unused. The pattern is shared by all
/// elements of the same reference shape.
///
/// Entries are stored with `j` running fastest, i.e. entry `(j, row)` lives at
/// `j + nnz_per_row * row`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSparsityPattern {
    nnz_per_row: usize,
    dofs_per_element: usize,
    columns: Vec<Option<usize>>,
}

impl LocalSparsityPattern {
    pub fn try_new(
        nnz_per_row: usize,
        dofs_per_element: usize,
        columns: Vec<Option<usize>>,
    ) -> Result<Self, AssemblyError> {
        check_len("local sparsity pattern", nnz_per_row * dofs_per_element, columns.len())?;

        let mut seen = vec![false; dofs_per_element];
        for row in 0..dofs_per_element {
            seen.iter_mut().for_each(|s| *s = false);
            let row_columns = &columns[nnz_per_row * row..nnz_per_row * (row + 1)];
            for &column in row_columns.iter().flatten() {
                if column >= dofs_per_element {
                    return Err(AssemblyError::InvalidPattern(format!(
                        "local row {} references column {}, but elements have {} DOFs",
                        row, column, dofs_per_element
                    )));
                }
                if seen[column] {
                    return Err(AssemblyError::InvalidPattern(format!(
                        "local row {} references column {} more than once",
                        row, column
                    )));
                }
                seen[column] = true;
            }
        }

        Ok(Self {
            nnz_per_row,
            dofs_per_element,
            columns,
        })
    }

    /// Constructs a pattern from the packed representation, in which negative entries mark
    /// unused slots.
    pub fn try_from_packed(nnz_per_row: usize, dofs_per_element: usize, packed: &[i64]) -> Result<Self, AssemblyError> {
        let columns = packed
            .iter()
            .map(|&column| usize::try_from(column).ok())
            .collect();
        Self::try_new(nnz_per_row, dofs_per_element, columns)
    }

    /// The pattern of a fully dense local matrix.
    pub fn dense(dofs_per_element: usize) -> Self {
        let columns = (0..dofs_per_element)
            .flat_map(|_| (0..dofs_per_element).map(Some))
            .collect();
        Self {
            nnz_per_row: dofs_per_element,
            dofs_per_element,
            columns,
        }
    }

    pub fn nnz_per_row(&self) -> usize {
        self.nnz_per_row
    }

    pub fn dofs_per_element(&self) -> usize {
        self.dofs_per_element
    }

    /// The local column of the `j`-th nonzero in `row`.
    #[inline]
    pub fn column(&self, j: usize, row: usize) -> Option<usize> {
        self.columns[j + self.nnz_per_row * row]
    }

    /// The slots of `row`, including unused ones.
    #[inline]
    pub fn row(&self, row: usize) -> &[Option<usize>] {
        &self.columns[self.nnz_per_row * row..self.nnz_per_row * (row + 1)]
    }

    /// Finds the nonzero slot of `row` that refers to `column`.
    #[inline]
    pub fn find_slot(&self, row: usize, column: usize) -> Option<usize> {
        self.row(row).iter().position(|&c| c == Some(column))
    }

    /// The number of used slots over all rows.
    pub fn nnz(&self) -> usize {
        self.columns.iter().flatten().count()
    }
}

/// Per-element values matching a [`LocalSparsityPattern`].
///
/// The value of the `j`-th nonzero of local row `row` in element `e` is stored at
/// `j + nnz_per_row * (row + dofs_per_element * e)`. Values in unused slots are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementValues<T: Scalar> {
    nnz_per_row: usize,
    dofs_per_element: usize,
    num_elements: usize,
    values: Vec<T>,
}

impl<T: Scalar> ElementValues<T> {
    pub fn try_new(
        nnz_per_row: usize,
        dofs_per_element: usize,
        num_elements: usize,
        values: Vec<T>,
    ) -> Result<Self, AssemblyError> {
        check_len(
            "element values",
            nnz_per_row * dofs_per_element * num_elements,
            values.len(),
        )?;
        Ok(Self {
            nnz_per_row,
            dofs_per_element,
            num_elements,
            values,
        })
    }

    pub fn nnz_per_row(&self) -> usize {
        self.nnz_per_row
    }

    pub fn dofs_per_element(&self) -> usize {
        self.dofs_per_element
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    #[inline]
    pub fn get(&self, j: usize, row: usize, element: usize) -> &T {
        &self.values[j + self.nnz_per_row * (row + self.dofs_per_element * element)]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }
}

impl<T: RealField> ElementValues<T> {
    pub fn zeros(pattern: &LocalSparsityPattern, num_elements: usize) -> Self {
        let len = pattern.nnz_per_row() * pattern.dofs_per_element() * num_elements;
        Self {
            nnz_per_row: pattern.nnz_per_row(),
            dofs_per_element: pattern.dofs_per_element(),
            num_elements,
            values: vec![T::zero(); len],
        }
    }

    /// Extracts the values of `pattern` from dense element matrices.
    pub fn from_dense_element_matrices(
        pattern: &LocalSparsityPattern,
        matrices: &[DMatrix<T>],
    ) -> Result<Self, AssemblyError> {
        let n = pattern.dofs_per_element();
        let mut values = Self::zeros(pattern, matrices.len());
        for (e, matrix) in matrices.iter().enumerate() {
            check_len("element matrix rows", n, matrix.nrows())?;
            check_len("element matrix columns", n, matrix.ncols())?;
            for row in 0..n {
                for (j, column) in pattern.row(row).iter().enumerate() {
                    if let Some(column) = column {
                        let index = j + values.nnz_per_row * (row + n * e);
                        values.values[index] = matrix[(row, *column)].clone();
                    }
                }
            }
        }
        Ok(values)
    }

    /// Reconstructs the dense local matrix of an element.
    pub fn element_matrix(&self, pattern: &LocalSparsityPattern, element: usize) -> DMatrix<T> {
        let n = self.dofs_per_element;
        let mut matrix = DMatrix::zeros(n, n);
        for row in 0..n {
            for (j, column) in pattern.row(row).iter().enumerate() {
                if let Some(column) = column {
                    matrix[(row, *column)] = self.get(j, row, element).clone();
                }
            }
        }
        matrix
    }
}
