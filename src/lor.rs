//! Batched assembly of low-order-refined (LOR) operators.
use crate::assembly::{eliminate_essential_dofs, BatchedCsrAssembler, CsrParts};
use crate::config::LorAssemblyConfig;
use crate::distributed::{is_identity_prolongation, ParCsrMatrix, Transport, IDENTITY_PROLONGATION_TAG};
use crate::kernel::{Integrator, KernelInput, LocalKernel, LorForm, LorKernels};
use crate::quadrature::QuadratureCache;
use crate::restriction::ElementRestriction;
use crate::space::{FiniteElementSpace, ParFiniteElementSpace};
use crate::vertices::lor_vertex_coordinates;
use eyre::WrapErr;
use nalgebra::RealField;

/// Assembles the LOR matrix of a high-order bilinear form directly from the high-order space.
///
/// The local matrices of the refined elements are computed per high-order element by a
/// [`LocalKernel`] and assembled with a [`BatchedCsrAssembler`], without ever constructing
/// the refined mesh.
pub struct BatchedLorAssembly<'a, T: RealField> {
    form: LorForm,
    kernel: &'a dyn LocalKernel<T>,
    restriction: &'a ElementRestriction,
    dim: usize,
    order: usize,
    vertex_coordinates: Vec<T>,
    essential_dofs: Vec<usize>,
    config: LorAssemblyConfig,
}

impl<'a, T: RealField> std::fmt::Debug for BatchedLorAssembly<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchedLorAssembly")
            .field("form", &self.form)
            .field("dim", &self.dim)
            .field("order", &self.order)
            .field("num_elements", &self.restriction.num_elements())
            .field("num_essential_dofs", &self.essential_dofs.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<'a, T: RealField> BatchedLorAssembly<'a, T> {
    /// Whether batched assembly supports the form given by the space and integrators.
    pub fn form_is_supported<S>(space: &S, integrators: &[Integrator]) -> bool
    where
        S: ?Sized + FiniteElementSpace<T>,
    {
        LorForm::classify(space.basis_family(), integrators, space.uses_tensor_basis()).is_some()
    }

    /// Prepares the assembly of the given form.
    ///
    /// Returns `None` if the form is not supported or no kernel is available for it, in which
    /// case the caller is expected to fall back to another assembly method.
    pub fn new<S>(
        space: &'a S,
        integrators: &[Integrator],
        kernels: &LorKernels<'a, T>,
        essential_dofs: &[usize],
        config: LorAssemblyConfig,
        cache: &mut QuadratureCache<T>,
    ) -> eyre::Result<Option<Self>>
    where
        S: ?Sized + FiniteElementSpace<T>,
    {
        let family = space.basis_family();
        let Some(form) = LorForm::classify(family, integrators, space.uses_tensor_basis()) else {
            log::info!("Batched LOR assembly does not support {:?} with {:?}", family, integrators);
            return Ok(None);
        };
        let Some(kernel) = kernels.kernel(&form) else {
            log::info!("No batched LOR kernel registered for {:?}", form);
            return Ok(None);
        };

        let order = space.max_element_order();
        let vertex_coordinates = match space.mesh_nodes() {
            Some(nodes) => lor_vertex_coordinates(&nodes, order, cache)
                .wrap_err("failed to compute LOR vertex coordinates")?,
            None => {
                log::debug!("Mesh has no nodes, kernels receive no vertex coordinates");
                Vec::new()
            }
        };

        Ok(Some(Self {
            form,
            kernel,
            restriction: space.element_restriction(),
            dim: space.dim(),
            order,
            vertex_coordinates,
            essential_dofs: essential_dofs.to_vec(),
            config,
        }))
    }

    pub fn form(&self) -> LorForm {
        self.form
    }

    pub fn config(&self) -> &LorAssemblyConfig {
        &self.config
    }

    pub fn essential_dofs(&self) -> &[usize] {
        &self.essential_dofs
    }

    pub fn vertex_coordinates(&self) -> &[T] {
        &self.vertex_coordinates
    }

    /// Assembles the matrix without eliminating essential DOFs.
    pub fn assemble_without_bc(&self) -> eyre::Result<CsrParts<T>> {
        let input = KernelInput {
            form: self.form,
            num_elements: self.restriction.num_elements(),
            dofs_per_element: self.restriction.dofs_per_element(),
            dim: self.dim,
            order: self.order,
            vertex_coordinates: &self.vertex_coordinates,
        };
        let pattern = self
            .kernel
            .sparsity_pattern(&input)
            .wrap_err("kernel failed to provide the local sparsity pattern")?;
        let values = self
            .kernel
            .assemble_values(&input, &pattern)
            .wrap_err("kernel failed to assemble local values")?;

        let mut matrix = BatchedCsrAssembler::default()
            .with_min_parallel_len(self.config.min_parallel_len)
            .assemble(self.restriction, &pattern, &values)
            .wrap_err("batched CSR assembly failed")?;
        if self.config.sort_columns {
            matrix.sort_column_indices();
        }
        Ok(matrix)
    }

    /// Assembles the matrix and eliminates the essential DOFs according to the configured
    /// diagonal policy.
    pub fn assemble(&self) -> eyre::Result<CsrParts<T>> {
        let mut matrix = self.assemble_without_bc()?;
        eliminate_essential_dofs(&mut matrix, &self.essential_dofs, self.config.diagonal_policy)?;
        Ok(matrix)
    }

    /// Assembles the distributed matrix on the true DOFs and eliminates the essential true DOFs.
    ///
    /// Must be called by all partitions. The essential DOFs are interpreted as true DOFs owned by
    /// this partition, in local numbering. Eliminated diagonal entries are set to one.
    pub fn par_assemble<S>(&self, space: &S, transport: &impl Transport) -> eyre::Result<ParCsrMatrix<T>>
    where
        S: ?Sized + ParFiniteElementSpace<T>,
    {
        let rank = transport.rank();

        let local = self.assemble_without_bc()?;
        let block_diagonal = ParCsrMatrix::square_block_diagonal(rank, space.vdof_partition().clone(), local)?;

        let prolongation = space.dof_true_dof_matrix();
        let true_partition = space.true_dof_partition();
        let is_identity = is_identity_prolongation(prolongation, true_partition, rank);
        // All partitions must take the same path, since the Galerkin product communicates
        let all_identity = transport
            .all_to_all(IDENTITY_PROLONGATION_TAG, vec![is_identity; transport.size()])?
            .into_iter()
            .all(|identity| identity);

        let mut matrix = if all_identity {
            log::debug!("Rank {} uses the block-diagonal operator", rank);
            block_diagonal
        } else {
            log::debug!("Rank {} forms the Galerkin product with the prolongation", rank);
            block_diagonal
                .pt_a_p(prolongation, true_partition, transport)
                .wrap_err("failed to form the Galerkin product")?
        };
        matrix
            .eliminate_essential_rows_and_columns(&self.essential_dofs, transport)
            .wrap_err("failed to eliminate essential DOFs")?;
        Ok(matrix)
    }
}

/// Assembles the LOR matrix of a single-partition form with eliminated essential DOFs.
///
/// Returns `None` if batched assembly does not support the form.
pub fn assemble_batched_lor<'a, T, S>(
    space: &'a S,
    integrators: &[Integrator],
    kernels: &LorKernels<'a, T>,
    essential_dofs: &[usize],
    config: LorAssemblyConfig,
) -> eyre::Result<Option<CsrParts<T>>>
where
    T: RealField,
    S: ?Sized + FiniteElementSpace<T>,
{
    let mut cache = QuadratureCache::new();
    BatchedLorAssembly::new(space, integrators, kernels, essential_dofs, config, &mut cache)?
        .map(|assembly| assembly.assemble())
        .transpose()
}
