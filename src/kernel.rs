//! Classification of bilinear forms and the interface to the per-element LOR kernels.
use crate::pattern::{ElementValues, LocalSparsityPattern};
use eyre::eyre;
use nalgebra::{DMatrix, RealField};
use serde::{Deserialize, Serialize};

mod h1_segment;

pub use h1_segment::*;

/// The family of the finite element basis of a space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasisFamily {
    H1,
    Nedelec,
    RaviartThomas,
    L2,
}

/// A domain integrator of a bilinear form, with a constant coefficient.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum Integrator {
    Diffusion { coefficient: f64 },
    Mass { coefficient: f64 },
    CurlCurl { coefficient: f64 },
    VectorFeMass { coefficient: f64 },
    DivDiv { coefficient: f64 },
}

/// A bilinear form supported by batched LOR assembly.
///
/// Every variant is a sum of a derivative term and a mass term. A coefficient of zero means
/// that the term is absent.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum LorForm {
    H1 { diffusion: f64, mass: f64 },
    Nedelec { curl_curl: f64, mass: f64 },
    RaviartThomas { div_div: f64, mass: f64 },
}

impl LorForm {
    /// Resolves the form from the basis and the integrators.
    ///
    /// Returns `None` if the configuration is not supported: the basis must be a tensor basis,
    /// and the form must consist of one or both (in any order) of the derivative and mass
    /// integrators matching the basis family.
    pub fn classify(family: BasisFamily, integrators: &[Integrator], tensor_basis: bool) -> Option<Self> {
        if !tensor_basis || integrators.is_empty() || integrators.len() > 2 {
            return None;
        }

        let mut derivative = None;
        let mut mass = None;
        for integrator in integrators {
            let (slot, coefficient) = match (family, *integrator) {
                (BasisFamily::H1, Integrator::Diffusion { coefficient }) => (&mut derivative, coefficient),
                (BasisFamily::H1, Integrator::Mass { coefficient }) => (&mut mass, coefficient),
                (BasisFamily::Nedelec, Integrator::CurlCurl { coefficient }) => (&mut derivative, coefficient),
                (BasisFamily::Nedelec, Integrator::VectorFeMass { coefficient }) => (&mut mass, coefficient),
                (BasisFamily::RaviartThomas, Integrator::DivDiv { coefficient }) => (&mut derivative, coefficient),
                (BasisFamily::RaviartThomas, Integrator::VectorFeMass { coefficient }) => (&mut mass, coefficient),
                _ => return None,
            };
            // The same integrator twice is not a supported pair
            if slot.replace(coefficient).is_some() {
                return None;
            }
        }

        let derivative = derivative.unwrap_or(0.0);
        let mass = mass.unwrap_or(0.0);
        Some(match family {
            BasisFamily::H1 => Self::H1 {
                diffusion: derivative,
                mass,
            },
            BasisFamily::Nedelec => Self::Nedelec {
                curl_curl: derivative,
                mass,
            },
            BasisFamily::RaviartThomas => Self::RaviartThomas {
                div_div: derivative,
                mass,
            },
            BasisFamily::L2 => return None,
        })
    }

    pub fn basis_family(&self) -> BasisFamily {
        match self {
            Self::H1 { .. } => BasisFamily::H1,
            Self::Nedelec { .. } => BasisFamily::Nedelec,
            Self::RaviartThomas { .. } => BasisFamily::RaviartThomas,
        }
    }
}

/// Everything a kernel needs to know about the elements it assembles.
#[derive(Debug, Clone)]
pub struct KernelInput<'a, T> {
    pub form: LorForm,
    pub num_elements: usize,
    pub dofs_per_element: usize,
    pub dim: usize,
    pub order: usize,
    /// The coordinates of the LOR vertices, component fastest, then vertex, then element.
    pub vertex_coordinates: &'a [T],
}

impl<'a, T> KernelInput<'a, T> {
    /// The number of LOR vertices of every element.
    pub fn vertices_per_element(&self) -> usize {
        (self.order + 1).pow(self.dim as u32)
    }
}

/// Computes the local sparse matrices of all elements of a low-order-refined discretization.
pub trait LocalKernel<T: RealField>: Sync {
    /// The local sparsity pattern shared by all elements.
    fn sparsity_pattern(&self, input: &KernelInput<T>) -> eyre::Result<LocalSparsityPattern>;

    /// The values of all elements, laid out according to `pattern`.
    fn assemble_values(
        &self,
        input: &KernelInput<T>,
        pattern: &LocalSparsityPattern,
    ) -> eyre::Result<ElementValues<T>>;
}

/// The kernels available for each supported form.
pub struct LorKernels<'a, T: RealField> {
    h1: Option<&'a dyn LocalKernel<T>>,
    nedelec: Option<&'a dyn LocalKernel<T>>,
    raviart_thomas: Option<&'a dyn LocalKernel<T>>,
}

impl<'a, T: RealField> Default for LorKernels<'a, T> {
    fn default() -> Self {
        Self {
            h1: None,
            nedelec: None,
            raviart_thomas: None,
        }
    }
}

impl<'a, T: RealField> std::fmt::Debug for LorKernels<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LorKernels")
            .field("h1", &self.h1.is_some())
            .field("nedelec", &self.nedelec.is_some())
            .field("raviart_thomas", &self.raviart_thomas.is_some())
            .finish()
    }
}

impl<'a, T: RealField> LorKernels<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_h1(self, kernel: &'a dyn LocalKernel<T>) -> Self {
        Self { h1: Some(kernel), ..self }
    }

    pub fn with_nedelec(self, kernel: &'a dyn LocalKernel<T>) -> Self {
        Self {
            nedelec: Some(kernel),
            ..self
        }
    }

    pub fn with_raviart_thomas(self, kernel: &'a dyn LocalKernel<T>) -> Self {
        Self {
            raviart_thomas: Some(kernel),
            ..self
        }
    }

    /// The kernel registered for the given form.
    pub fn kernel(&self, form: &LorForm) -> Option<&'a dyn LocalKernel<T>> {
        match form {
            LorForm::H1 { .. } => self.h1,
            LorForm::Nedelec { .. } => self.nedelec,
            LorForm::RaviartThomas { .. } => self.raviart_thomas,
        }
    }
}

/// A kernel that takes precomputed dense element matrices and stores them with a full pattern.
#[derive(Debug, Clone)]
pub struct DenseElementKernel<T: RealField> {
    element_matrices: Vec<DMatrix<T>>,
}

impl<T: RealField> DenseElementKernel<T> {
    pub fn new(element_matrices: Vec<DMatrix<T>>) -> Self {
        Self { element_matrices }
    }

    pub fn element_matrices(&self) -> &[DMatrix<T>] {
        &self.element_matrices
    }
}

impl<T: RealField> LocalKernel<T> for DenseElementKernel<T> {
    fn sparsity_pattern(&self, input: &KernelInput<T>) -> eyre::Result<LocalSparsityPattern> {
        Ok(LocalSparsityPattern::dense(input.dofs_per_element))
    }

    fn assemble_values(
        &self,
        input: &KernelInput<T>,
        pattern: &LocalSparsityPattern,
    ) -> eyre::Result<ElementValues<T>> {
        if self.element_matrices.len() != input.num_elements {
            return Err(eyre!(
                "dense kernel holds {} element matrices, but {} elements are assembled",
                self.element_matrices.len(),
                input.num_elements
            ));
        }
        Ok(ElementValues::from_dense_element_matrices(pattern, &self.element_matrices)?)
    }
}
