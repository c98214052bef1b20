use crate::kernel::{KernelInput, LocalKernel, LorForm};
use crate::pattern::{ElementValues, LocalSparsityPattern};
use eyre::eyre;
use nalgebra::{convert, RealField};

/// LOR kernel for H1 diffusion and mass on segments.
///
/// An element of order `p` is refined into `p` linear sub-elements between consecutive LOR
/// vertices. Local DOF `a` couples only to `a - 1`, `a` and `a + 1`, so the pattern has three
/// slots per row, ordered by column. The first slot of the first row and the last slot of the
/// last row are unused.
#[derive(Debug, Copy, Clone, Default)]
pub struct H1SegmentKernel;

impl H1SegmentKernel {
    fn coefficients<T: RealField>(form: &LorForm) -> eyre::Result<(T, T)> {
        match *form {
            LorForm::H1 { diffusion, mass } => Ok((convert(diffusion), convert(mass))),
            other => Err(eyre!("segment kernel cannot assemble {:?}", other)),
        }
    }
}

impl<T: RealField> LocalKernel<T> for H1SegmentKernel {
    fn sparsity_pattern(&self, input: &KernelInput<T>) -> eyre::Result<LocalSparsityPattern> {
        if input.dim != 1 {
            return Err(eyre!("segment kernel requires dimension 1, got {}", input.dim));
        }
        let n = input.dofs_per_element;
        let columns = (0..n)
            .flat_map(|row| {
                [row.checked_sub(1), Some(row), Some(row + 1).filter(|&col| col < n)]
            })
            .collect();
        Ok(LocalSparsityPattern::try_new(3, n, columns)?)
    }

    fn assemble_values(
        &self,
        input: &KernelInput<T>,
        pattern: &LocalSparsityPattern,
    ) -> eyre::Result<ElementValues<T>> {
        let (diffusion, mass) = Self::coefficients::<T>(&input.form)?;
        let n = input.dofs_per_element;
        if n != input.order + 1 {
            return Err(eyre!(
                "segment element of order {} must have {} DOFs, got {}",
                input.order,
                input.order + 1,
                n
            ));
        }
        let num_vertices = input.vertices_per_element();
        if input.vertex_coordinates.len() != num_vertices * input.num_elements {
            return Err(eyre!(
                "expected {} vertex coordinates, got {}",
                num_vertices * input.num_elements,
                input.vertex_coordinates.len()
            ));
        }

        let two: T = convert(2.0);
        let six: T = convert(6.0);
        let mut values = ElementValues::zeros(pattern, input.num_elements);
        let nnz_per_row = pattern.nnz_per_row();
        for (element, (x, element_values)) in input
            .vertex_coordinates
            .chunks_exact(num_vertices)
            .zip(values.as_mut_slice().chunks_exact_mut(nnz_per_row * n))
            .enumerate()
        {
            for k in 0..input.order {
                let h = (x[k + 1].clone() - x[k].clone()).abs();
                if h == T::zero() {
                    return Err(eyre!("degenerate sub-element {} in element {}", k, element));
                }
                let stiffness = diffusion.clone() / h.clone();
                let diagonal = stiffness.clone() + mass.clone() * h.clone() * two.clone() / six.clone();
                let coupling = mass.clone() * h / six.clone() - stiffness;

                // Slot 1 is the diagonal, slot 2 couples to the right and slot 0 to the left
                element_values[nnz_per_row * k + 1] += diagonal.clone();
                element_values[nnz_per_row * k + 2] += coupling.clone();
                element_values[nnz_per_row * (k + 1) + 1] += diagonal;
                element_values[nnz_per_row * (k + 1)] += coupling;
            }
        }
        Ok(values)
    }
}
