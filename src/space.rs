//! The finite element spaces that batched LOR assembly operates on.
use crate::distributed::RowPartition;
use crate::kernel::BasisFamily;
use crate::restriction::ElementRestriction;
use nalgebra::RealField;
use nalgebra_sparse::CsrMatrix;

/// The nodal field describing the geometry of a high-order mesh.
#[derive(Debug, Copy, Clone)]
pub struct MeshNodes<'a, T> {
    /// Lexicographic element restriction of the nodal space. Its vector dimension is the
    /// spatial dimension.
    pub restriction: &'a ElementRestriction,
    /// The global nodal vector.
    pub values: &'a [T],
    /// The one-dimensional nodal points of the nodal basis on `[0, 1]`, in ascending order.
    pub points_1d: &'a [T],
}

/// A high-order finite element space.
pub trait FiniteElementSpace<T: RealField> {
    fn basis_family(&self) -> BasisFamily;

    /// Whether every element uses a tensor-product basis.
    fn uses_tensor_basis(&self) -> bool;

    fn dim(&self) -> usize;

    fn max_element_order(&self) -> usize;

    /// The element restriction with element DOFs in lexicographic order.
    fn element_restriction(&self) -> &ElementRestriction;

    /// The nodes of the mesh, or `None` if the mesh has no high-order nodes.
    fn mesh_nodes(&self) -> Option<MeshNodes<'_, T>>;
}

/// The part of a distributed finite element space owned by one partition.
pub trait ParFiniteElementSpace<T: RealField>: FiniteElementSpace<T> {
    /// The global numbering of the DOFs of all partitions. The DOFs of the element restriction
    /// are the DOFs owned by this partition.
    fn vdof_partition(&self) -> &RowPartition;

    /// The global numbering of true DOFs.
    fn true_dof_partition(&self) -> &RowPartition;

    /// This partition's rows of the prolongation from global true DOFs to local DOFs.
    fn dof_true_dof_matrix(&self) -> &CsrMatrix<T>;
}
