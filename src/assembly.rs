//! Batched assembly of global sparse matrices from per-element sparse values.
use crate::error::AssemblyError;
use crate::pattern::{ElementValues, LocalSparsityPattern};
use crate::restriction::ElementRestriction;
use nalgebra::RealField;

mod batched;
mod csr;
mod elimination;
pub(crate) mod parallel;
mod sharing;

pub use batched::*;
pub use csr::*;
pub use elimination::*;

/// Assembles the global CSR matrix with a default [`BatchedCsrAssembler`].
pub fn assemble_csr<T: RealField>(
    restriction: &ElementRestriction,
    pattern: &LocalSparsityPattern,
    values: &ElementValues<T>,
) -> Result<CsrParts<T>, AssemblyError> {
    BatchedCsrAssembler::default().assemble(restriction, pattern, values)
}
