use crate::error::{check_len, AssemblyError};
use itertools::{izip, Itertools};
use nalgebra::{DMatrix, RealField, Scalar};
use nalgebra_sparse::CsrMatrix;

/// Raw compressed sparse row storage.
///
/// Unlike [`CsrMatrix`], the column indices of a row are not required to be sorted: the batched
/// assembler claims slots within a row concurrently, so the order of the entries in a row is
/// not deterministic. Use [`sort_column_indices`](Self::sort_column_indices) or convert with
/// [`into_csr_matrix`](Self::into_csr_matrix) when sorted rows are needed.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrParts<T> {
    num_rows: usize,
    num_cols: usize,
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
    values: Vec<T>,
}

/// The structure of a [`CsrParts`] matrix, borrowed separately from its values.
#[derive(Debug, Copy, Clone)]
pub struct CsrPatternView<'a> {
    row_offsets: &'a [usize],
    col_indices: &'a [usize],
}

impl<'a> CsrPatternView<'a> {
    pub fn row_columns(&self, row: usize) -> &'a [usize] {
        &self.col_indices[self.row_offsets[row]..self.row_offsets[row + 1]]
    }

    /// Whether `(row, col)` is a stored entry.
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.row_columns(row).contains(&col)
    }
}

/// A mutable view of the values of a single row.
#[derive(Debug)]
pub struct CsrRowMut<'a, T> {
    row: usize,
    col_indices: &'a [usize],
    values: &'a mut [T],
}

impl<'a, T> CsrRowMut<'a, T> {
    pub fn row_index(&self) -> usize {
        self.row
    }

    pub fn col_indices(&self) -> &[usize] {
        self.col_indices
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        self.values
    }

    pub fn cols_and_values_mut(&mut self) -> (&[usize], &mut [T]) {
        (self.col_indices, self.values)
    }
}

impl<T: Scalar> CsrParts<T> {
    pub fn try_from_parts(
        num_rows: usize,
        num_cols: usize,
        row_offsets: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, AssemblyError> {
        check_len("row offsets", num_rows + 1, row_offsets.len())?;
        check_len("values", col_indices.len(), values.len())?;
        if row_offsets[0] != 0 || row_offsets.iter().tuple_windows().any(|(prev, next)| prev > next) {
            return Err(AssemblyError::SparseFormat(
                "row offsets must start at zero and be non-decreasing".to_string(),
            ));
        }
        check_len("last row offset", col_indices.len(), row_offsets[num_rows])?;
        if let Some(col) = col_indices.iter().find(|&&col| col >= num_cols) {
            return Err(AssemblyError::SparseFormat(format!(
                "column index {} out of bounds for {} columns",
                col, num_cols
            )));
        }
        Ok(Self {
            num_rows,
            num_cols,
            row_offsets,
            col_indices,
            values,
        })
    }

    /// Assembles the parts without validation. Used by the assemblers, whose output is valid by
    /// construction.
    pub(crate) fn from_parts_unchecked(
        num_rows: usize,
        num_cols: usize,
        row_offsets: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        debug_assert_eq!(row_offsets.len(), num_rows + 1);
        debug_assert_eq!(col_indices.len(), values.len());
        Self {
            num_rows,
            num_cols,
            row_offsets,
            col_indices,
            values,
        }
    }

    /// A matrix without stored entries.
    pub fn empty(num_rows: usize, num_cols: usize) -> Self {
        Self::from_parts_unchecked(num_rows, num_cols, vec![0; num_rows + 1], Vec::new(), Vec::new())
    }

    pub fn nrows(&self) -> usize {
        self.num_rows
    }

    pub fn ncols(&self) -> usize {
        self.num_cols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row_offsets(&self) -> &[usize] {
        &self.row_offsets
    }

    pub fn col_indices(&self) -> &[usize] {
        &self.col_indices
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn row(&self, row: usize) -> (&[usize], &[T]) {
        let range = self.row_offsets[row]..self.row_offsets[row + 1];
        (&self.col_indices[range.clone()], &self.values[range])
    }

    /// Looks up the first stored entry `(row, col)`.
    pub fn get_entry(&self, row: usize, col: usize) -> Option<&T> {
        let (cols, values) = self.row(row);
        cols.iter().position(|&c| c == col).map(|idx| &values[idx])
    }

    /// Iterates over all stored entries as `(row, col, value)`.
    pub fn triplet_iter(&self) -> impl '_ + Iterator<Item = (usize, usize, &T)> {
        self.row_offsets
            .iter()
            .tuple_windows()
            .enumerate()
            .flat_map(move |(row, (&begin, &end))| {
                izip!(&self.col_indices[begin..end], &self.values[begin..end]).map(move |(&col, v)| (row, col, v))
            })
    }

    pub fn pattern(&self) -> CsrPatternView<'_> {
        CsrPatternView {
            row_offsets: &self.row_offsets,
            col_indices: &self.col_indices,
        }
    }

    /// Splits the matrix into its structure and disjoint mutable rows, suitable for processing
    /// rows in parallel.
    pub fn pattern_and_rows_mut(&mut self) -> (CsrPatternView<'_>, Vec<CsrRowMut<'_, T>>) {
        let mut rows = Vec::with_capacity(self.num_rows);
        let mut remaining = self.values.as_mut_slice();
        for (row, (&begin, &end)) in self.row_offsets.iter().tuple_windows().enumerate() {
            let (values, rest) = std::mem::take(&mut remaining).split_at_mut(end - begin);
            remaining = rest;
            rows.push(CsrRowMut {
                row,
                col_indices: &self.col_indices[begin..end],
                values,
            });
        }
        let pattern = CsrPatternView {
            row_offsets: &self.row_offsets,
            col_indices: &self.col_indices,
        };
        (pattern, rows)
    }

    /// Sorts the entries of every row by column index.
    pub fn sort_column_indices(&mut self) {
        let mut permutation = Vec::new();
        let mut sorted_cols = Vec::new();
        let mut sorted_values = Vec::new();
        for (&begin, &end) in self.row_offsets.iter().tuple_windows() {
            let cols = &mut self.col_indices[begin..end];
            let values = &mut self.values[begin..end];
            if cols.iter().tuple_windows().all(|(a, b)| a <= b) {
                continue;
            }

            permutation.clear();
            permutation.extend(0..cols.len());
            permutation.sort_unstable_by_key(|&idx| cols[idx]);

            sorted_cols.clear();
            sorted_cols.extend(permutation.iter().map(|&idx| cols[idx]));
            sorted_values.clear();
            sorted_values.extend(permutation.iter().map(|&idx| values[idx].clone()));

            cols.copy_from_slice(&sorted_cols);
            values.clone_from_slice(&sorted_values);
        }
    }

    pub fn disassemble(self) -> (Vec<usize>, Vec<usize>, Vec<T>) {
        (self.row_offsets, self.col_indices, self.values)
    }
}

impl<T: RealField> CsrParts<T> {
    /// Converts to a [`CsrMatrix`], sorting the rows first.
    ///
    /// Fails if a row contains duplicate column indices.
    pub fn into_csr_matrix(mut self) -> Result<CsrMatrix<T>, AssemblyError> {
        self.sort_column_indices();
        let (num_rows, num_cols) = (self.num_rows, self.num_cols);
        let (offsets, indices, values) = self.disassemble();
        Ok(CsrMatrix::try_from_csr_data(num_rows, num_cols, offsets, indices, values)?)
    }

    pub fn from_csr_matrix(matrix: CsrMatrix<T>) -> Self {
        let (num_rows, num_cols) = (matrix.nrows(), matrix.ncols());
        let (offsets, indices, values) = matrix.disassemble();
        Self::from_parts_unchecked(num_rows, num_cols, offsets, indices, values)
    }

    /// Converts to a dense matrix. Duplicate entries are summed.
    pub fn to_dense(&self) -> DMatrix<T> {
        let mut dense = DMatrix::zeros(self.num_rows, self.num_cols);
        for (row, col, value) in self.triplet_iter() {
            dense[(row, col)] += value.clone();
        }
        dense
    }
}
