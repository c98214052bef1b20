use crate::assembly::csr::CsrParts;
use crate::assembly::parallel::DisjointSliceWriter;
use crate::assembly::sharing::{min_common_element, SharingList};
use crate::error::{check_len, AssemblyError};
use crate::pattern::{ElementValues, LocalSparsityPattern};
use crate::restriction::{exclusive_prefix_sum, ElementRestriction};
use nalgebra::RealField;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Assembles a global CSR matrix directly from per-element sparse values.
///
/// Assembly runs in two passes over all element slots `(e, a)`. The first pass counts the
/// entries of every global row, the second claims a slot in the row and writes the column
/// index and value. An entry `(i, j)` coupling two DOFs that are both shared by several
/// elements is emitted only by the element with the smallest index among the elements
/// containing both, which then sums the contributions of all common elements. Rows therefore
/// never contain duplicate columns as long as the local patterns are consistent with the
/// connectivity.
///
/// Both passes write through atomic counters, so the order of the entries within a row is not
/// deterministic.
#[derive(Debug, Clone)]
pub struct BatchedCsrAssembler {
    min_parallel_len: usize,
}

impl Default for BatchedCsrAssembler {
    fn default() -> Self {
        Self { min_parallel_len: 64 }
    }
}

/// The row and column DOF of an element-local entry, resolved against the connectivity.
struct EntryContext<'a> {
    row_sharing: &'a SharingList,
    col_sharing: SharingList,
    element: usize,
}

impl<'a> EntryContext<'a> {
    /// Whether the current element is responsible for emitting the entry.
    fn is_owner(&self) -> bool {
        let rows = self.row_sharing.as_slice();
        let cols = self.col_sharing.as_slice();
        rows.len() == 1
            || cols.len() == 1
            || min_common_element(self.row_sharing, &self.col_sharing) == Some(self.element)
    }

    fn needs_deduplication(&self) -> bool {
        self.row_sharing.as_slice().len() > 1 && self.col_sharing.as_slice().len() > 1
    }
}

impl BatchedCsrAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum number of element slots processed per rayon task.
    pub fn with_min_parallel_len(self, min_parallel_len: usize) -> Self {
        Self {
            min_parallel_len: min_parallel_len.max(1),
        }
    }

    pub fn min_parallel_len(&self) -> usize {
        self.min_parallel_len
    }

    /// Computes the row offsets of the assembled matrix.
    pub fn count_row_entries(
        &self,
        restriction: &ElementRestriction,
        pattern: &LocalSparsityPattern,
    ) -> Result<Vec<usize>, AssemblyError> {
        check_preconditions(restriction, pattern)?;
        let num_dofs = restriction.num_dofs();
        let counts: Vec<_> = (0..num_dofs).map(|_| AtomicUsize::new(0)).collect();

        let gather_map = restriction.gather_map();
        self.for_each_owned_entry(restriction, pattern, |position, _, _| {
            counts[gather_map[position].index()].fetch_add(1, Ordering::Relaxed);
            Ok(())
        })?;

        let mut counts: Vec<usize> = counts.into_iter().map(AtomicUsize::into_inner).collect();
        counts.push(0);
        Ok(exclusive_prefix_sum(counts))
    }

    /// Writes the column indices and values of all entries, given the row offsets computed by
    /// [`count_row_entries`](Self::count_row_entries).
    pub fn fill_columns_and_values<T: RealField>(
        &self,
        restriction: &ElementRestriction,
        pattern: &LocalSparsityPattern,
        values: &ElementValues<T>,
        row_offsets: &[usize],
        col_indices: &mut [usize],
        data: &mut [T],
    ) -> Result<(), AssemblyError> {
        check_preconditions(restriction, pattern)?;
        check_values(restriction, pattern, values)?;
        let num_dofs = restriction.num_dofs();
        check_len("row offsets", num_dofs + 1, row_offsets.len())?;
        let nnz = row_offsets[num_dofs];
        check_len("column indices", nnz, col_indices.len())?;
        check_len("values", nnz, data.len())?;

        let next_slot: Vec<_> = row_offsets[..num_dofs].iter().copied().map(AtomicUsize::new).collect();
        let col_writer = DisjointSliceWriter::new(col_indices);
        let data_writer = DisjointSliceWriter::new(data);
        let gather_map = restriction.gather_map();
        let dofs_per_element = restriction.dofs_per_element();

        self.for_each_owned_entry(restriction, pattern, |position, j, context| {
            let row_dof = gather_map[position];
            let row = row_dof.index();
            let local_row = position % dofs_per_element;
            let local_col = pattern.column(j, local_row).ok_or_else(|| {
                AssemblyError::InvalidPattern(format!("empty slot {} in local row {}", j, local_row))
            })?;
            let col_dof = gather_map[context.element * dofs_per_element + local_col];

            let value = if context.needs_deduplication() {
                deduplicated_value(pattern, values, context)?
            } else {
                let value = values.get(j, local_row, context.element).clone();
                if row_dof.relative_flip(&col_dof) {
                    -value
                } else {
                    value
                }
            };

            let slot = next_slot[row].fetch_add(1, Ordering::Relaxed);
            if slot >= row_offsets[row + 1] {
                return Err(AssemblyError::RowCountMismatch {
                    row,
                    expected: row_offsets[row + 1] - row_offsets[row],
                    actual: slot + 1 - row_offsets[row],
                });
            }
            // SAFETY: every slot is handed out exactly once by the atomic counter of its row
            unsafe {
                col_writer.write(slot, col_dof.index());
                data_writer.write(slot, value);
            }
            Ok(())
        })?;

        for (row, next) in next_slot.into_iter().enumerate() {
            let next = next.into_inner();
            if next != row_offsets[row + 1] {
                return Err(AssemblyError::RowCountMismatch {
                    row,
                    expected: row_offsets[row + 1] - row_offsets[row],
                    actual: next - row_offsets[row],
                });
            }
        }
        Ok(())
    }

    /// Assembles the global matrix in both passes.
    pub fn assemble<T: RealField>(
        &self,
        restriction: &ElementRestriction,
        pattern: &LocalSparsityPattern,
        values: &ElementValues<T>,
    ) -> Result<CsrParts<T>, AssemblyError> {
        check_values(restriction, pattern, values)?;
        let row_offsets = self.count_row_entries(restriction, pattern)?;
        let num_dofs = restriction.num_dofs();
        let nnz = row_offsets[num_dofs];
        log::debug!(
            "Batched assembly of {} elements into {} rows with {} nonzeros",
            restriction.num_elements(),
            num_dofs,
            nnz
        );

        let mut col_indices = vec![usize::MAX; nnz];
        let mut data = vec![T::zero(); nnz];
        self.fill_columns_and_values(restriction, pattern, values, &row_offsets, &mut col_indices, &mut data)?;
        Ok(CsrParts::from_parts_unchecked(
            num_dofs,
            num_dofs,
            row_offsets,
            col_indices,
            data,
        ))
    }

    /// Calls `f(position, j, context)` once for every global entry, in the element that owns it.
    ///
    /// `position` is the element slot of the row DOF and `j` the pattern slot of the entry in
    /// that local row.
    fn for_each_owned_entry<F>(
        &self,
        restriction: &ElementRestriction,
        pattern: &LocalSparsityPattern,
        f: F,
    ) -> Result<(), AssemblyError>
    where
        F: Sync + Fn(usize, usize, &EntryContext) -> Result<(), AssemblyError>,
    {
        let dofs_per_element = restriction.dofs_per_element();
        let gather_map = restriction.gather_map();
        (0..gather_map.len())
            .into_par_iter()
            .with_min_len(self.min_parallel_len)
            .try_for_each(|position| {
                let element = position / dofs_per_element;
                let local_row = position % dofs_per_element;
                let row = gather_map[position].index();
                let row_sharing = SharingList::gather(restriction, row);
                for (j, local_col) in pattern.row(local_row).iter().enumerate() {
                    let Some(local_col) = *local_col else { continue };
                    let col = gather_map[element * dofs_per_element + local_col].index();
                    let context = EntryContext {
                        row_sharing: &row_sharing,
                        col_sharing: SharingList::gather(restriction, col),
                        element,
                    };
                    if context.is_owner() {
                        f(position, j, &context)?;
                    }
                }
                Ok(())
            })
    }
}

/// Sums the contributions to an entry of all elements containing both the row and column DOF.
fn deduplicated_value<T: RealField>(
    pattern: &LocalSparsityPattern,
    values: &ElementValues<T>,
    context: &EntryContext,
) -> Result<T, AssemblyError> {
    let mut sum = T::zero();
    for row_occ in context.row_sharing.as_slice() {
        for col_occ in context.col_sharing.as_slice() {
            if row_occ.element != col_occ.element {
                continue;
            }
            let (local_row, local_col) = (row_occ.slot.index(), col_occ.slot.index());
            let j = pattern
                .find_slot(local_row, local_col)
                .ok_or(AssemblyError::InconsistentPattern {
                    element: row_occ.element,
                    local_row,
                    local_column: local_col,
                })?;
            let value = values.get(j, local_row, row_occ.element).clone();
            if row_occ.slot.relative_flip(&col_occ.slot) {
                sum -= value;
            } else {
                sum += value;
            }
        }
    }
    Ok(sum)
}

fn check_preconditions(restriction: &ElementRestriction, pattern: &LocalSparsityPattern) -> Result<(), AssemblyError> {
    if restriction.vdim() != 1 {
        return Err(AssemblyError::VectorDimensionUnsupported(restriction.vdim()));
    }
    check_len(
        "DOFs per element in local pattern",
        restriction.dofs_per_element(),
        pattern.dofs_per_element(),
    )
}

fn check_values<T: RealField>(
    restriction: &ElementRestriction,
    pattern: &LocalSparsityPattern,
    values: &ElementValues<T>,
) -> Result<(), AssemblyError> {
    check_len("nonzeros per row of element values", pattern.nnz_per_row(), values.nnz_per_row())?;
    check_len(
        "DOFs per element of element values",
        pattern.dofs_per_element(),
        values.dofs_per_element(),
    )?;
    check_len("elements of element values", restriction.num_elements(), values.num_elements())
}
