use crate::assembly::DiagonalPolicy;
use serde::{Deserialize, Serialize};

/// Options of [`BatchedLorAssembly`](crate::lor::BatchedLorAssembly).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LorAssemblyConfig {
    /// The treatment of eliminated diagonal entries in single-partition assembly. Distributed
    /// assembly always sets them to one.
    pub diagonal_policy: DiagonalPolicy,
    /// The minimum number of work items per rayon task.
    pub min_parallel_len: usize,
    /// Whether to sort the columns of every row after assembly.
    pub sort_columns: bool,
}

impl Default for LorAssemblyConfig {
    fn default() -> Self {
        Self {
            diagonal_policy: DiagonalPolicy::Keep,
            min_parallel_len: 64,
            sort_columns: false,
        }
    }
}
