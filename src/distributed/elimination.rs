use crate::assembly::{eliminate_essential_dofs, DiagonalPolicy};
use crate::distributed::par_csr::ParCsrMatrix;
use crate::distributed::transport::{Transport, ESSENTIAL_MARKERS_TAG};
use crate::error::{check_len, AssemblyError};
use nalgebra::RealField;
use rayon::prelude::*;

impl<T: RealField> ParCsrMatrix<T> {
    /// Eliminates the rows and columns of essential true DOFs across partitions.
    ///
    /// `essential_local_rows` are owned rows in local numbering. The diagonal entries of
    /// eliminated rows are set to one. Columns referring to essential rows of other partitions
    /// are zeroed in the off-diagonal block once the markers of the owning partitions have been
    /// received, so every partition holding a cross-partition reference must take part.
    pub fn eliminate_essential_rows_and_columns(
        &mut self,
        essential_local_rows: &[usize],
        transport: &impl Transport,
    ) -> Result<(), AssemblyError> {
        check_len("rank of transport", self.rank(), transport.rank())?;
        let num_rows = self.num_local_rows();
        let mut is_essential = vec![false; num_rows];
        for &dof in essential_local_rows {
            *is_essential
                .get_mut(dof)
                .ok_or(AssemblyError::EssentialDofOutOfBounds { dof, num_rows })? = true;
        }

        // Send first, so that neighbors can proceed while the local blocks are processed
        for (neighbor, rows) in self.comm_pkg().send_neighbors() {
            let markers: Vec<bool> = rows.iter().map(|&row| is_essential[row]).collect();
            transport.send(*neighbor, ESSENTIAL_MARKERS_TAG, markers)?;
        }

        eliminate_essential_dofs(self.diag_mut(), essential_local_rows, DiagonalPolicy::One)?;

        let (_, offd_rows) = self.offd_mut().pattern_and_rows_mut();
        offd_rows
            .into_par_iter()
            .filter(|row| is_essential[row.row_index()])
            .for_each(|mut row| row.values_mut().iter_mut().for_each(|v| *v = T::zero()));

        let mut is_marked_column = vec![false; self.col_map_offd().len()];
        for (neighbor, range) in self.comm_pkg().recv_neighbors().to_vec() {
            let markers: Vec<bool> = transport.receive(neighbor, ESSENTIAL_MARKERS_TAG)?;
            check_len("essential markers", range.len(), markers.len())?;
            is_marked_column[range].copy_from_slice(&markers);
        }
        let num_marked = is_marked_column.iter().filter(|&&marked| marked).count();
        log::debug!(
            "Rank {} eliminated {} essential rows and {} remote columns",
            self.rank(),
            essential_local_rows.len(),
            num_marked
        );
        if num_marked == 0 {
            return Ok(());
        }

        let (_, offd_rows) = self.offd_mut().pattern_and_rows_mut();
        offd_rows.into_par_iter().for_each(|mut row| {
            let (cols, values) = row.cols_and_values_mut();
            for (&col, value) in cols.iter().zip(values.iter_mut()) {
                if is_marked_column[col] {
                    *value = T::zero();
                }
            }
        });
        Ok(())
    }
}
