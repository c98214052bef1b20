//! Batched assembly of sparse matrices for low-order-refined (LOR) finite element
//! discretizations.
//!
//! The crate converts between global and per-element DOF layouts ([`restriction`]), assembles
//! global CSR matrices from per-element sparse contributions in two race-free parallel passes
//! ([`assembly`]), and extends the assembly to operators distributed over several partitions,
//! including the elimination of essential DOFs across partition boundaries ([`distributed`]).
//! [`lor::BatchedLorAssembly`] drives the whole pipeline for a high-order finite element space.
pub mod assembly;
pub mod config;
pub mod distributed;
pub mod dof;
pub mod error;
pub mod kernel;
pub mod lor;
pub mod pattern;
pub mod quadrature;
pub mod restriction;
pub mod space;
pub mod vertices;

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
