use crate::error::{check_len, AssemblyError};
use crate::quadrature::{Geometry, QuadratureCache};
use crate::space::MeshNodes;
use itertools::izip;
use nalgebra::RealField;
use rayon::prelude::*;

/// Evaluates the one-dimensional Lagrange basis through `nodes` at `x`.
pub fn lagrange_basis_1d<T: RealField>(nodes: &[T], x: T, output: &mut [T]) {
    debug_assert_eq!(nodes.len(), output.len());
    for (i, (node_i, value)) in izip!(nodes, output.iter_mut()).enumerate() {
        *value = T::one();
        for (j, node_j) in nodes.iter().enumerate() {
            if i != j {
                *value *= (x.clone() - node_j.clone()) / (node_i.clone() - node_j.clone());
            }
        }
    }
}

/// Computes the physical coordinates of the vertices of the low-order-refined mesh.
///
/// An element of order `p` is refined at the `p + 1` Gauss-Lobatto points per direction,
/// i.e. the rule of order `2 (p + 1) - 3`. The nodal field is interpolated at these points with
/// the tensor-product Lagrange basis through `nodes.points_1d`.
///
/// Component `c` of vertex `q` of element `e` is stored at `c + dim * (q + num_vertices * e)`.
pub fn lor_vertex_coordinates<T: RealField>(
    nodes: &MeshNodes<T>,
    order: usize,
    cache: &mut QuadratureCache<T>,
) -> Result<Vec<T>, AssemblyError> {
    let restriction = nodes.restriction;
    let dim = restriction.vdim();
    let geometry = Geometry::from_dim(dim)?;
    let num_nodes_1d = nodes.points_1d.len();
    if num_nodes_1d == 0 {
        return Err(AssemblyError::InvalidConnectivity(
            "the nodal basis has no one-dimensional points".to_string(),
        ));
    }
    let nodes_per_element = num_nodes_1d.pow(dim as u32);
    check_len(
        "nodal DOFs per element",
        nodes_per_element,
        restriction.dofs_per_element(),
    )?;

    let nd1d = order + 1;
    let rule = cache.get(geometry, (2 * nd1d).saturating_sub(3))?;
    let num_vertices = rule.num_points();
    let element_nodes = restriction.to_element_layout(nodes.values)?;

    // Basis values at every vertex, node index fastest
    let mut basis = vec![T::zero(); nodes_per_element * num_vertices];
    let mut basis_1d = vec![T::zero(); num_nodes_1d * dim];
    for (q, basis_q) in basis.chunks_exact_mut(nodes_per_element).enumerate() {
        for (d, xi) in rule.point(q).iter().enumerate() {
            let output = &mut basis_1d[d * num_nodes_1d..(d + 1) * num_nodes_1d];
            lagrange_basis_1d(nodes.points_1d, xi.clone(), output);
        }
        for (a, value) in basis_q.iter_mut().enumerate() {
            let mut remainder = a;
            *value = T::one();
            for d in 0..dim {
                *value *= basis_1d[d * num_nodes_1d + remainder % num_nodes_1d].clone();
                remainder /= num_nodes_1d;
            }
        }
    }

    let mut coordinates = vec![T::zero(); dim * num_vertices * restriction.num_elements()];
    if coordinates.is_empty() {
        return Ok(coordinates);
    }
    let element_nodes = element_nodes.as_slice();
    coordinates
        .par_chunks_mut(dim * num_vertices)
        .enumerate()
        .for_each(|(e, element_coordinates)| {
            let x_e = &element_nodes[e * nodes_per_element * dim..(e + 1) * nodes_per_element * dim];
            for (q, basis_q) in basis.chunks_exact(nodes_per_element).enumerate() {
                for c in 0..dim {
                    let x_c = &x_e[c * nodes_per_element..(c + 1) * nodes_per_element];
                    element_coordinates[c + dim * q] = izip!(basis_q, x_c)
                        .fold(T::zero(), |sum, (phi, x)| sum + phi.clone() * x.clone());
                }
            }
        });
    Ok(coordinates)
}
