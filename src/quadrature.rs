//! Gauss-Lobatto quadrature rules on reference segments, squares and cubes.
//!
//! Rules are computed on demand and kept in an explicit [`QuadratureCache`].
use crate::error::AssemblyError;
use nalgebra::{convert, RealField};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;

/// The largest number of points of a one-dimensional Gauss-Lobatto rule.
pub const MAX_GAUSS_LOBATTO_POINTS: usize = 64;

/// A reference tensor-product cell, `[0, 1]^dim`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Geometry {
    Segment,
    Square,
    Cube,
}

impl Geometry {
    pub fn from_dim(dim: usize) -> Result<Self, AssemblyError> {
        match dim {
            1 => Ok(Self::Segment),
            2 => Ok(Self::Square),
            3 => Ok(Self::Cube),
            _ => Err(AssemblyError::UnsupportedDimension(dim)),
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            Self::Segment => 1,
            Self::Square => 2,
            Self::Cube => 3,
        }
    }
}

/// Points and weights of a quadrature rule on a reference cell.
///
/// The coordinates of point `q` are stored at `q * dim .. (q + 1) * dim`. Tensor rules are
/// ordered with the first coordinate running fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureRule<T> {
    dim: usize,
    points: Vec<T>,
    weights: Vec<T>,
}

impl<T: RealField> QuadratureRule<T> {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    pub fn point(&self, q: usize) -> &[T] {
        &self.points[q * self.dim..(q + 1) * self.dim]
    }

    pub fn points(&self) -> &[T] {
        &self.points
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    /// Integrates `f` over the reference cell.
    pub fn integrate(&self, f: impl Fn(&[T]) -> T) -> T {
        (0..self.num_points()).fold(T::zero(), |sum, q| sum + self.weights[q].clone() * f(self.point(q)))
    }

    fn tensor_product(rule_1d: &QuadratureRule<T>, dim: usize) -> Self {
        let n = rule_1d.num_points();
        let num_points = n.pow(dim as u32);
        let mut points = Vec::with_capacity(num_points * dim);
        let mut weights = Vec::with_capacity(num_points);
        for q in 0..num_points {
            let mut weight = T::one();
            let mut remainder = q;
            for _ in 0..dim {
                let i = remainder % n;
                remainder /= n;
                points.push(rule_1d.points[i].clone());
                weight *= rule_1d.weights[i].clone();
            }
            weights.push(weight);
        }
        Self { dim, points, weights }
    }
}

/// The number of points of the Gauss-Lobatto rule of the given order.
///
/// A rule with `n` points integrates polynomials of degree `2n - 3` exactly. Even orders are
/// rounded up to the next odd order.
pub fn gauss_lobatto_num_points(order: usize) -> usize {
    (order | 1) / 2 + 2
}

/// The `n` Gauss-Lobatto points and weights on `[0, 1]`, in ascending order.
pub fn gauss_lobatto<T: RealField>(n: usize) -> Result<QuadratureRule<T>, AssemblyError> {
    if n < 2 || n > MAX_GAUSS_LOBATTO_POINTS {
        return Err(AssemblyError::InvalidQuadratureOrder(n));
    }

    // Interior points are the roots of P'_{n-1}, found by Newton iteration from
    // Chebyshev-Gauss-Lobatto points
    let degree = n - 1;
    let dn = degree as f64;
    let mut points = vec![0.0; n];
    for (j, x) in points.iter_mut().enumerate() {
        *x = -(std::f64::consts::PI * j as f64 / dn).cos();
    }
    points[0] = -1.0;
    points[degree] = 1.0;
    for x in &mut points[1..degree] {
        for _ in 0..100 {
            let (p, dp) = legendre_and_derivative(degree, *x);
            let update = (1.0 - *x * *x) * dp / (dn * (dn + 1.0) * p);
            *x += update;
            if update.abs() < 1e-15 {
                break;
            }
        }
    }

    let weights = points.iter().map(|&x| {
        let (p, _) = legendre_and_derivative(degree, x);
        1.0 / (dn * (dn + 1.0) * p * p)
    });
    let mut pairs: Vec<(f64, f64)> = points.iter().map(|&x| 0.5 * (x + 1.0)).zip(weights).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    Ok(QuadratureRule {
        dim: 1,
        points: pairs.iter().map(|&(x, _)| convert(x)).collect(),
        weights: pairs.iter().map(|&(_, w)| convert(w)).collect(),
    })
}

/// Evaluates the Legendre polynomial of the given degree and its derivative.
fn legendre_and_derivative(degree: usize, x: f64) -> (f64, f64) {
    let (mut p_prev, mut p) = (1.0, x);
    if degree == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=degree {
        let k = k as f64;
        let p_next = ((2.0 * k - 1.0) * x * p - (k - 1.0) * p_prev) / k;
        p_prev = p;
        p = p_next;
    }
    let n = degree as f64;
    let dp = if (x * x - 1.0).abs() < f64::EPSILON {
        // P'_n(±1) = (±1)^(n + 1) n (n + 1) / 2
        x.powi(degree as i32 + 1) * n * (n + 1.0) / 2.0
    } else {
        n * (x * p - p_prev) / (x * x - 1.0)
    };
    (p, dp)
}

/// Lazily computed Gauss-Lobatto rules, keyed by geometry and order.
#[derive(Debug, Clone)]
pub struct QuadratureCache<T> {
    rules: FxHashMap<(Geometry, usize), QuadratureRule<T>>,
}

impl<T> Default for QuadratureCache<T> {
    fn default() -> Self {
        Self {
            rules: FxHashMap::default(),
        }
    }
}

impl<T: RealField> QuadratureCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the Gauss-Lobatto rule of the given order, computing it on first use.
    pub fn get(&mut self, geometry: Geometry, order: usize) -> Result<&QuadratureRule<T>, AssemblyError> {
        match self.rules.entry((geometry, order)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                log::trace!("Computing Gauss-Lobatto rule of order {} on {:?}", order, geometry);
                let rule_1d = gauss_lobatto(gauss_lobatto_num_points(order))?;
                let rule = match geometry {
                    Geometry::Segment => rule_1d,
                    _ => QuadratureRule::tensor_product(&rule_1d, geometry.dim()),
                };
                Ok(entry.insert(rule))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
