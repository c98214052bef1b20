use crate::assembly::CsrParts;
use crate::distributed::par_csr::ParCsrMatrix;
use crate::distributed::partition::RowPartition;
use crate::distributed::transport::{Transport, PTAP_ROWS_TAG};
use crate::error::{check_len, AssemblyError};
use nalgebra::RealField;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Whether the partition's rows of the prolongation are the identity onto its owned true DOFs.
pub fn is_identity_prolongation<T: RealField>(
    prolongation: &CsrMatrix<T>,
    true_partition: &RowPartition,
    rank: usize,
) -> bool {
    if rank >= true_partition.num_partitions() || prolongation.ncols() != true_partition.global_size() {
        return false;
    }
    let owned = true_partition.range(rank);
    prolongation.nrows() == owned.len()
        && prolongation.row_iter().enumerate().all(|(i, row)| {
            row.col_indices() == [owned.start + i] && row.values().iter().all(|v| *v == T::one())
        })
}

impl<T: RealField> ParCsrMatrix<T> {
    /// Forms the Galerkin product `Pᵗ A P` of a block-diagonal operator `A`.
    ///
    /// `prolongation` holds this partition's rows of `P`, mapping the partition's local DOFs to
    /// the global true DOFs described by `true_partition`. Every partition computes its
    /// contribution `P_pᵗ A_p P_p`, sends each resulting row to the partition owning it, and
    /// sums the rows it receives.
    pub fn pt_a_p(
        &self,
        prolongation: &CsrMatrix<T>,
        true_partition: &RowPartition,
        transport: &impl Transport,
    ) -> Result<ParCsrMatrix<T>, AssemblyError> {
        if !self.is_block_diagonal() {
            return Err(AssemblyError::NonBlockDiagonal);
        }
        check_len("partitions of true DOFs", true_partition.num_partitions(), transport.size())?;
        check_len("rank of transport", self.rank(), transport.rank())?;
        if prolongation.nrows() != self.num_local_rows() {
            return Err(AssemblyError::InvalidProlongation(format!(
                "prolongation has {} rows, but the operator has {} local rows",
                prolongation.nrows(),
                self.num_local_rows()
            )));
        }
        if prolongation.ncols() != true_partition.global_size() {
            return Err(AssemblyError::InvalidProlongation(format!(
                "prolongation has {} columns, but there are {} true DOFs",
                prolongation.ncols(),
                true_partition.global_size()
            )));
        }

        let local = self.diag().clone().into_csr_matrix()?;
        let product = &prolongation.transpose() * &(&local * prolongation);

        let mut outgoing: Vec<Vec<(usize, usize, T)>> = vec![Vec::new(); transport.size()];
        for (row, row_entries) in product.row_iter().enumerate() {
            if row_entries.nnz() == 0 {
                continue;
            }
            let owner = true_partition.owner(row).ok_or_else(|| {
                AssemblyError::InvalidProlongation(format!("true DOF {} has no owner", row))
            })?;
            outgoing[owner].extend(
                row_entries
                    .col_indices()
                    .iter()
                    .zip(row_entries.values())
                    .map(|(&col, value)| (row, col, value.clone())),
            );
        }
        log::debug!(
            "Rank {} sends {} Galerkin product entries to {} partitions",
            self.rank(),
            product.nnz(),
            outgoing.iter().filter(|entries| !entries.is_empty()).count()
        );

        let received = transport.all_to_all(PTAP_ROWS_TAG, outgoing)?;
        let owned = true_partition.range(self.rank());
        let mut coo = CooMatrix::new(owned.len(), true_partition.global_size());
        for (row, col, value) in received.into_iter().flatten() {
            if !owned.contains(&row) {
                return Err(AssemblyError::Transport(format!(
                    "received row {} which is not owned by rank {}",
                    row,
                    self.rank()
                )));
            }
            coo.push(row - owned.start, col, value);
        }
        let summed = CsrParts::from_csr_matrix(CsrMatrix::from(&coo));
        log::trace!("Rank {} owns {} rows of the Galerkin product", self.rank(), owned.len());

        ParCsrMatrix::from_global_rows(self.rank(), true_partition.clone(), summed, transport)
    }
}
