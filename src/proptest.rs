//! Strategies for random connectivities and element values.
use crate::dof::SignedDof;
use crate::restriction::ElementRestriction;
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use nalgebra::DMatrix;

/// Parameters of a structured mesh of tensor-product elements.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridParams {
    /// Number of elements per direction. Unused directions have a single element.
    pub elements: [usize; 2],
    pub dim: usize,
    pub order: usize,
}

impl GridParams {
    pub fn num_elements(&self) -> usize {
        self.elements[..self.dim].iter().product()
    }

    pub fn dofs_per_element(&self) -> usize {
        (self.order + 1).pow(self.dim as u32)
    }

    pub fn num_dofs(&self) -> usize {
        self.elements[..self.dim]
            .iter()
            .map(|n| n * self.order + 1)
            .product()
    }

    /// The lexicographic gather map of the grid, without orientations.
    pub fn gather_map(&self) -> Vec<usize> {
        let p = self.order;
        let nd1d = p + 1;
        let [nx, ny] = if self.dim == 1 {
            [self.elements[0], 1]
        } else {
            self.elements
        };
        let stride = nx * p + 1;
        let mut gather_map = Vec::with_capacity(self.num_elements() * self.dofs_per_element());
        for ey in 0..ny {
            for ex in 0..nx {
                for a in 0..self.dofs_per_element() {
                    let (i, j) = (a % nd1d, a / nd1d);
                    gather_map.push((ex * p + i) + (ey * p + j) * stride);
                }
            }
        }
        gather_map
    }
}

/// Random 1D and 2D structured grids with up to `max_elements` elements per direction.
pub fn grid_params(max_elements: usize, max_order: usize) -> impl Strategy<Value = GridParams> {
    (1..=2usize, 1..=max_elements, 1..=max_elements, 1..=max_order).prop_map(|(dim, nx, ny, order)| GridParams {
        elements: [nx, if dim == 1 { 1 } else { ny }],
        dim,
        order,
    })
}

/// A random grid restriction, with random orientations of every element slot.
pub fn grid_restriction(max_elements: usize, max_order: usize) -> impl Strategy<Value = ElementRestriction> {
    grid_params(max_elements, max_order)
        .prop_flat_map(|params| {
            let len = params.num_elements() * params.dofs_per_element();
            (Just(params), vec(any::<bool>(), len))
        })
        .prop_filter_map("valid restriction", |(params, flips)| {
            let gather_map = params
                .gather_map()
                .into_iter()
                .zip(flips)
                .map(|(dof, flipped)| SignedDof::new(dof, flipped))
                .collect();
            ElementRestriction::try_from_gather_map(params.num_dofs(), params.dofs_per_element(), gather_map).ok()
        })
}

/// Random dense element matrices with entries in `[-10, 10]`.
pub fn element_matrices(
    num_elements: usize,
    dofs_per_element: usize,
    symmetric: bool,
) -> impl Strategy<Value = Vec<DMatrix<f64>>> {
    let n = dofs_per_element;
    vec(vec(-10.0..10.0f64, n * n), num_elements).prop_map(move |matrices| {
        matrices
            .into_iter()
            .map(|entries| {
                let matrix = DMatrix::from_vec(n, n, entries);
                if symmetric {
                    (&matrix + matrix.transpose()) * 0.5
                } else {
                    matrix
                }
            })
            .collect()
    })
}

/// A random grid restriction together with matching element matrices.
pub fn restriction_and_element_matrices(
    max_elements: usize,
    max_order: usize,
    symmetric: bool,
) -> impl Strategy<Value = (ElementRestriction, Vec<DMatrix<f64>>)> {
    grid_restriction(max_elements, max_order).prop_flat_map(move |restriction| {
        let matrices = element_matrices(restriction.num_elements(), restriction.dofs_per_element(), symmetric);
        (Just(restriction), matrices)
    })
}
