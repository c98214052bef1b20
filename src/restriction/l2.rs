use crate::error::{check_len, AssemblyError};
use crate::restriction::{ComponentLayout, VectorOrdering};
use nalgebra::{DVector, RealField};
use rayon::prelude::*;

/// Restriction of a discontinuous (L2) space, in which every element owns its DOFs.
///
/// Global DOF `e * dofs_per_element + a` is slot `a` of element `e`. No DOFs are shared, so
/// the element layout is a reordering of the global layout and the transpose is its inverse.
/// Only the vector component ordering distinguishes the two layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2ElementRestriction {
    num_elements: usize,
    dofs_per_element: usize,
    layout: ComponentLayout,
}

impl L2ElementRestriction {
    pub fn new(num_elements: usize, dofs_per_element: usize) -> Self {
        Self {
            num_elements,
            dofs_per_element,
            layout: ComponentLayout::scalar(),
        }
    }

    pub fn with_vector_dimension(mut self, vdim: usize, ordering: VectorOrdering) -> Result<Self, AssemblyError> {
        self.layout = ComponentLayout::try_new(vdim, ordering)?;
        Ok(self)
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn dofs_per_element(&self) -> usize {
        self.dofs_per_element
    }

    pub fn num_dofs(&self) -> usize {
        self.num_elements * self.dofs_per_element
    }

    pub fn vdim(&self) -> usize {
        self.layout.vdim
    }

    pub fn ordering(&self) -> VectorOrdering {
        self.layout.ordering
    }

    /// Length of both global and element vectors.
    pub fn size(&self) -> usize {
        self.num_dofs() * self.layout.vdim
    }

    /// Reorders a global vector into the element layout used by
    /// [`ElementRestriction`](crate::restriction::ElementRestriction).
    pub fn to_element_layout<T: RealField>(&self, global: &[T]) -> Result<DVector<T>, AssemblyError> {
        let mut element = DVector::zeros(self.size());
        self.reorder(global, element.as_mut_slice(), false)?;
        Ok(element)
    }

    /// Inverse of [`to_element_layout`](Self::to_element_layout).
    pub fn to_global_layout<T: RealField>(&self, element: &[T]) -> Result<DVector<T>, AssemblyError> {
        let mut global = DVector::zeros(self.size());
        self.reorder(element, global.as_mut_slice(), true)?;
        Ok(global)
    }

    fn reorder<T: RealField>(&self, input: &[T], output: &mut [T], to_global: bool) -> Result<(), AssemblyError> {
        check_len("input vector", self.size(), input.len())?;
        check_len("output vector", self.size(), output.len())?;

        let n = self.dofs_per_element;
        let num_dofs = self.num_dofs();
        let layout = self.layout;
        output.par_iter_mut().enumerate().for_each(|(index, value)| {
            let source = if to_global {
                let (dof, c) = layout.split_global_index(num_dofs, index);
                let (e, a) = (dof / n, dof % n);
                a + n * (c + layout.vdim * e)
            } else {
                let (a, c, e) = (index % n, (index / n) % layout.vdim, index / (n * layout.vdim));
                layout.global_index(num_dofs, e * n + a, c)
            };
            *value = input[source].clone();
        });
        Ok(())
    }
}
