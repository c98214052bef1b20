use crate::assembly::CsrParts;
use crate::distributed::partition::RowPartition;
use crate::distributed::transport::{Transport, COMM_PKG_TAG};
use crate::error::{check_len, AssemblyError};
use nalgebra::RealField;
use std::ops::Range;

/// The communication pattern of a distributed matrix.
///
/// Partition `p` needs the values of the rows that its off-diagonal columns refer to. Since
/// `col_map_offd` is sorted and partitions own contiguous row ranges, the off-diagonal columns
/// owned by one remote partition form a contiguous range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommPkg {
    send: Vec<(usize, Vec<usize>)>,
    recv: Vec<(usize, Range<usize>)>,
}

impl CommPkg {
    /// The partitions that need data from this partition, each with the (local) rows it needs.
    pub fn send_neighbors(&self) -> &[(usize, Vec<usize>)] {
        &self.send
    }

    /// The partitions this partition needs data from, each with the range of off-diagonal
    /// columns it provides.
    pub fn recv_neighbors(&self) -> &[(usize, Range<usize>)] {
        &self.recv
    }

    /// Builds the communication package from the sorted off-diagonal column map.
    ///
    /// Every partition tells every other partition which of its rows it needs, in one all-to-all
    /// exchange.
    pub fn build(
        col_map_offd: &[usize],
        partition: &RowPartition,
        transport: &impl Transport,
    ) -> Result<Self, AssemblyError> {
        check_len("partitions of transport", partition.num_partitions(), transport.size())?;
        let rank = transport.rank();
        partition.check_rank(rank)?;

        let mut recv: Vec<(usize, Range<usize>)> = Vec::new();
        for (idx, &col) in col_map_offd.iter().enumerate() {
            let owner = partition.owner(col).ok_or_else(|| {
                AssemblyError::InvalidConnectivity(format!(
                    "off-diagonal column {} is out of bounds for {} global columns",
                    col,
                    partition.global_size()
                ))
            })?;
            if owner == rank {
                return Err(AssemblyError::InvalidConnectivity(format!(
                    "off-diagonal column {} is owned by the partition itself",
                    col
                )));
            }
            match recv.last_mut() {
                Some((last_owner, range)) if *last_owner == owner => range.end = idx + 1,
                _ => recv.push((owner, idx..idx + 1)),
            }
        }

        let mut requests = vec![Vec::new(); transport.size()];
        for (owner, range) in &recv {
            let owner_start = partition.range(*owner).start;
            requests[*owner] = col_map_offd[range.clone()]
                .iter()
                .map(|col| col - owner_start)
                .collect();
        }

        let received: Vec<Vec<usize>> = transport.all_to_all(COMM_PKG_TAG, requests)?;
        let send = received
            .into_iter()
            .enumerate()
            .filter(|(_, rows)| !rows.is_empty())
            .collect();
        Ok(Self { send, recv })
    }
}

/// The rows of a square distributed matrix owned by a single partition.
///
/// The owned rows are split into a diagonal block, whose columns are the owned columns in local
/// numbering, and an off-diagonal block, whose column `k` is the global column
/// `col_map_offd[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParCsrMatrix<T> {
    rank: usize,
    partition: RowPartition,
    diag: CsrParts<T>,
    offd: CsrParts<T>,
    col_map_offd: Vec<usize>,
    comm_pkg: CommPkg,
}

impl<T: RealField> ParCsrMatrix<T> {
    /// Takes ownership of `local` as the diagonal block of a block-diagonal operator.
    pub fn square_block_diagonal(
        rank: usize,
        partition: RowPartition,
        local: CsrParts<T>,
    ) -> Result<Self, AssemblyError> {
        partition.check_rank(rank)?;
        let local_size = partition.local_size(rank);
        check_len("rows of diagonal block", local_size, local.nrows())?;
        check_len("columns of diagonal block", local_size, local.ncols())?;
        Ok(Self {
            rank,
            partition,
            diag: local,
            offd: CsrParts::empty(local_size, 0),
            col_map_offd: Vec::new(),
            comm_pkg: CommPkg::default(),
        })
    }

    /// Splits rows with global column indices into diagonal and off-diagonal blocks.
    ///
    /// `rows` has one row per owned row, with (possibly unsorted) global columns.
    pub(crate) fn from_global_rows(
        rank: usize,
        partition: RowPartition,
        rows: CsrParts<T>,
        transport: &impl Transport,
    ) -> Result<Self, AssemblyError> {
        partition.check_rank(rank)?;
        let owned = partition.range(rank);
        check_len("owned rows", owned.len(), rows.nrows())?;
        check_len("global columns", partition.global_size(), rows.ncols())?;

        let mut col_map_offd: Vec<usize> = rows
            .col_indices()
            .iter()
            .copied()
            .filter(|col| !owned.contains(col))
            .collect();
        col_map_offd.sort_unstable();
        col_map_offd.dedup();

        let num_rows = rows.nrows();
        let mut diag_offsets = Vec::with_capacity(num_rows + 1);
        let mut offd_offsets = Vec::with_capacity(num_rows + 1);
        let (mut diag_cols, mut diag_values) = (Vec::new(), Vec::new());
        let (mut offd_cols, mut offd_values) = (Vec::new(), Vec::new());
        diag_offsets.push(0);
        offd_offsets.push(0);
        for row in 0..num_rows {
            let (cols, values) = rows.row(row);
            for (&col, value) in cols.iter().zip(values) {
                if owned.contains(&col) {
                    diag_cols.push(col - owned.start);
                    diag_values.push(value.clone());
                } else {
                    // Every off-diagonal column was collected above
                    let offd_col = col_map_offd.binary_search(&col).map_err(|_| {
                        AssemblyError::InvalidConnectivity(format!("column {} missing from column map", col))
                    })?;
                    offd_cols.push(offd_col);
                    offd_values.push(value.clone());
                }
            }
            diag_offsets.push(diag_cols.len());
            offd_offsets.push(offd_cols.len());
        }

        let comm_pkg = CommPkg::build(&col_map_offd, &partition, transport)?;
        let num_offd = col_map_offd.len();
        Ok(Self {
            rank,
            diag: CsrParts::from_parts_unchecked(num_rows, owned.len(), diag_offsets, diag_cols, diag_values),
            offd: CsrParts::from_parts_unchecked(num_rows, num_offd, offd_offsets, offd_cols, offd_values),
            partition,
            col_map_offd,
            comm_pkg,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn partition(&self) -> &RowPartition {
        &self.partition
    }

    pub fn owned_rows(&self) -> Range<usize> {
        self.partition.range(self.rank)
    }

    pub fn num_local_rows(&self) -> usize {
        self.diag.nrows()
    }

    pub fn global_size(&self) -> usize {
        self.partition.global_size()
    }

    pub fn diag(&self) -> &CsrParts<T> {
        &self.diag
    }

    pub fn offd(&self) -> &CsrParts<T> {
        &self.offd
    }

    pub fn col_map_offd(&self) -> &[usize] {
        &self.col_map_offd
    }

    pub fn comm_pkg(&self) -> &CommPkg {
        &self.comm_pkg
    }

    pub(crate) fn diag_mut(&mut self) -> &mut CsrParts<T> {
        &mut self.diag
    }

    pub(crate) fn offd_mut(&mut self) -> &mut CsrParts<T> {
        &mut self.offd
    }

    /// Whether the off-diagonal block is empty.
    pub fn is_block_diagonal(&self) -> bool {
        self.offd.nnz() == 0
    }

    /// Returns the owned rows with global column indices, sorted within each row.
    pub fn to_global_rows(&self) -> CsrParts<T> {
        let num_rows = self.num_local_rows();
        let col_offset = self.owned_rows().start;
        let mut offsets = Vec::with_capacity(num_rows + 1);
        let mut cols = Vec::with_capacity(self.diag.nnz() + self.offd.nnz());
        let mut values = Vec::with_capacity(cols.capacity());
        offsets.push(0);
        for row in 0..num_rows {
            let (diag_cols, diag_values) = self.diag.row(row);
            let (offd_cols, offd_values) = self.offd.row(row);
            cols.extend(diag_cols.iter().map(|col| col + col_offset));
            cols.extend(offd_cols.iter().map(|&k| self.col_map_offd[k]));
            values.extend(diag_values.iter().cloned());
            values.extend(offd_values.iter().cloned());
            offsets.push(cols.len());
        }
        let mut rows = CsrParts::from_parts_unchecked(num_rows, self.global_size(), offsets, cols, values);
        rows.sort_column_indices();
        rows
    }
}
