use crate::error::AssemblyError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Contiguous ownership of global rows by partitions.
///
/// Partition `p` owns the global rows `offsets[p] .. offsets[p + 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowPartition {
    offsets: Vec<usize>,
}

impl RowPartition {
    pub fn try_from_offsets(offsets: Vec<usize>) -> Result<Self, AssemblyError> {
        if offsets.len() < 2 {
            return Err(AssemblyError::InvalidConnectivity(
                "a row partition needs at least one partition".to_string(),
            ));
        }
        if offsets[0] != 0 || offsets.iter().tuple_windows().any(|(a, b)| a > b) {
            return Err(AssemblyError::InvalidConnectivity(
                "partition offsets must start at zero and be non-decreasing".to_string(),
            ));
        }
        Ok(Self { offsets })
    }

    /// Builds the partition from the number of rows owned by each partition.
    pub fn from_local_sizes(sizes: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        offsets.push(0);
        for size in sizes {
            offsets.push(offsets[offsets.len() - 1] + size);
        }
        if sizes.is_empty() {
            offsets.push(0);
        }
        Self { offsets }
    }

    /// A partition in which a single partition owns all rows.
    pub fn single(num_rows: usize) -> Self {
        Self {
            offsets: vec![0, num_rows],
        }
    }

    pub fn num_partitions(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn global_size(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// The global rows owned by the given partition.
    ///
    /// # Panics
    ///
    /// Panics if `rank` is not smaller than the number of partitions.
    pub fn range(&self, rank: usize) -> Range<usize> {
        self.offsets[rank]..self.offsets[rank + 1]
    }

    /// The number of rows owned by the given partition.
    ///
    /// # Panics
    ///
    /// Panics if `rank` is not smaller than the number of partitions.
    pub fn local_size(&self, rank: usize) -> usize {
        self.offsets[rank + 1] - self.offsets[rank]
    }

    /// The partition owning the given global row, or `None` if the row is out of bounds.
    pub fn owner(&self, global_row: usize) -> Option<usize> {
        if global_row >= self.global_size() {
            None
        } else {
            Some(self.offsets[1..].partition_point(|&end| end <= global_row))
        }
    }

    pub(crate) fn check_rank(&self, rank: usize) -> Result<(), AssemblyError> {
        if rank < self.num_partitions() {
            Ok(())
        } else {
            Err(AssemblyError::Transport(format!(
                "rank {} is not part of a partition with {} partitions",
                rank,
                self.num_partitions()
            )))
        }
    }
}
