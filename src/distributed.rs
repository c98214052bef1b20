//! Assembly and boundary elimination for operators distributed over several partitions.
//!
//! Each partition owns a contiguous range of rows (see [`RowPartition`]) and stores them as a
//! [`ParCsrMatrix`]. Partitions exchange data through a [`Transport`].
mod elimination;
mod par_csr;
mod partition;
mod ptap;
mod transport;

pub use par_csr::*;
pub use partition::*;
pub use ptap::*;
pub use transport::*;
