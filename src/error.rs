//! Error types for restriction, assembly and elimination.
use nalgebra_sparse::SparseFormatError;
use thiserror::Error;

/// Errors produced by the batched assembly core.
///
/// Every variant is fatal: assembly is a deterministic batch computation, so retrying with the
/// same input reproduces the same error. Unsupported form configurations are *not* errors,
/// see [`LorForm::classify`](crate::kernel::LorForm::classify).
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error(
        "global DOF {dof} has {count} element occurrences, \
         exceeding the supported maximum of {max}"
    )]
    SharingBoundExceeded { dof: usize, count: usize, max: usize },
    #[error("invalid connectivity: {0}")]
    InvalidConnectivity(String),
    #[error("invalid local sparsity pattern: {0}")]
    InvalidPattern(String),
    #[error("batched CSR assembly requires a scalar restriction, but vdim = {0}")]
    VectorDimensionUnsupported(usize),
    #[error("unsupported dimension {0}")]
    UnsupportedDimension(usize),
    #[error("face id {face_id} is not valid in dimension {dim}")]
    InvalidFaceId { dim: usize, face_id: usize },
    #[error(
        "no local nonzero of element {element} couples local row {local_row} to local column \
         {local_column}: local sparsity pattern and DOF connectivity disagree"
    )]
    InconsistentPattern {
        element: usize,
        local_row: usize,
        local_column: usize,
    },
    #[error("row {row} received {actual} entries in the fill pass, but {expected} were counted")]
    RowCountMismatch { row: usize, expected: usize, actual: usize },
    #[error("essential DOF {dof} is out of bounds for a matrix with {num_rows} rows")]
    EssentialDofOutOfBounds { dof: usize, num_rows: usize },
    #[error("operator has a non-empty off-diagonal block, but a block-diagonal operator is required")]
    NonBlockDiagonal,
    #[error("invalid prolongation: {0}")]
    InvalidProlongation(String),
    #[error("no Gauss-Lobatto rule for order {0}")]
    InvalidQuadratureOrder(usize),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("invalid sparse matrix data: {0}")]
    SparseFormat(String),
}

impl From<SparseFormatError> for AssemblyError {
    fn from(error: SparseFormatError) -> Self {
        Self::SparseFormat(error.to_string())
    }
}

pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), AssemblyError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AssemblyError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}
