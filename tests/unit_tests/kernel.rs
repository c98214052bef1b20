use fenris_lor::kernel::{
    BasisFamily, DenseElementKernel, H1SegmentKernel, Integrator, KernelInput, LocalKernel, LorForm, LorKernels,
};
use fenris_lor::pattern::LocalSparsityPattern;
use matrixcompare::assert_matrix_eq;
use nalgebra::DMatrix;

const DIFFUSION: Integrator = Integrator::Diffusion { coefficient: 2.0 };
const MASS: Integrator = Integrator::Mass { coefficient: 3.0 };
const VECTOR_MASS: Integrator = Integrator::VectorFeMass { coefficient: 1.0 };

#[test]
fn h1_forms() {
    let form = LorForm::classify(BasisFamily::H1, &[DIFFUSION, MASS], true);
    assert_eq!(
        form,
        Some(LorForm::H1 {
            diffusion: 2.0,
            mass: 3.0
        })
    );
    // Order of the integrators does not matter
    assert_eq!(LorForm::classify(BasisFamily::H1, &[MASS, DIFFUSION], true), form);
    assert_eq!(
        LorForm::classify(BasisFamily::H1, &[MASS], true),
        Some(LorForm::H1 {
            diffusion: 0.0,
            mass: 3.0
        })
    );
    assert_eq!(form.map(|form| form.basis_family()), Some(BasisFamily::H1));
}

#[test]
fn vector_forms() {
    let curl_curl = Integrator::CurlCurl { coefficient: 4.0 };
    assert_eq!(
        LorForm::classify(BasisFamily::Nedelec, &[curl_curl, VECTOR_MASS], true),
        Some(LorForm::Nedelec {
            curl_curl: 4.0,
            mass: 1.0
        })
    );
    let div_div = Integrator::DivDiv { coefficient: 5.0 };
    assert_eq!(
        LorForm::classify(BasisFamily::RaviartThomas, &[VECTOR_MASS, div_div], true),
        Some(LorForm::RaviartThomas {
            div_div: 5.0,
            mass: 1.0
        })
    );
}

#[test]
fn unsupported_configurations() {
    assert_eq!(LorForm::classify(BasisFamily::H1, &[DIFFUSION], false), None);
    assert_eq!(LorForm::classify(BasisFamily::H1, &[], true), None);
    assert_eq!(LorForm::classify(BasisFamily::H1, &[DIFFUSION, DIFFUSION], true), None);
    assert_eq!(LorForm::classify(BasisFamily::H1, &[DIFFUSION, MASS, MASS], true), None);
    assert_eq!(LorForm::classify(BasisFamily::H1, &[VECTOR_MASS], true), None);
    assert_eq!(LorForm::classify(BasisFamily::Nedelec, &[MASS], true), None);
    assert_eq!(LorForm::classify(BasisFamily::L2, &[MASS], true), None);
}

#[test]
fn kernel_registry() {
    let segment = H1SegmentKernel;
    let kernels = LorKernels::<f64>::new().with_h1(&segment);
    let h1 = LorForm::H1 {
        diffusion: 1.0,
        mass: 0.0,
    };
    let nedelec = LorForm::Nedelec {
        curl_curl: 1.0,
        mass: 0.0,
    };
    assert!(kernels.kernel(&h1).is_some());
    assert!(kernels.kernel(&nedelec).is_none());
    assert!(LorKernels::<f64>::default().kernel(&h1).is_none());
}

fn segment_input(order: usize, num_elements: usize, coordinates: &[f64], form: LorForm) -> KernelInput<'_, f64> {
    KernelInput {
        form,
        num_elements,
        dofs_per_element: order + 1,
        dim: 1,
        order,
        vertex_coordinates: coordinates,
    }
}

#[test]
fn segment_kernel_pattern_is_tridiagonal() {
    let coordinates = [0.0, 0.5, 1.0];
    let input = segment_input(2, 1, &coordinates, LorForm::H1 { diffusion: 1.0, mass: 0.0 });
    let pattern = H1SegmentKernel.sparsity_pattern(&input).unwrap();
    let expected = LocalSparsityPattern::try_from_packed(3, 3, &[-1, 0, 1, 0, 1, 2, 1, 2, -1]).unwrap();
    assert_eq!(pattern, expected);
}

#[test]
fn segment_kernel_diffusion_on_refined_element() {
    let coordinates = [0.0, 0.5, 1.0];
    let input = segment_input(2, 1, &coordinates, LorForm::H1 { diffusion: 1.0, mass: 0.0 });
    let pattern = H1SegmentKernel.sparsity_pattern(&input).unwrap();
    let values = H1SegmentKernel.assemble_values(&input, &pattern).unwrap();
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
         2.0, -2.0,  0.0,
        -2.0,  4.0, -2.0,
         0.0, -2.0,  2.0,
    ]);
    assert_matrix_eq!(values.element_matrix(&pattern, 0), expected, comp = abs, tol = 1e-14);
}

#[test]
fn segment_kernel_mass_on_linear_elements() {
    // Two linear elements of lengths 2 and 1, the second one traversed backwards
    let coordinates = [0.0, 2.0, 3.0, 2.0];
    let input = segment_input(1, 2, &coordinates, LorForm::H1 { diffusion: 0.0, mass: 1.0 });
    let pattern = H1SegmentKernel.sparsity_pattern(&input).unwrap();
    let values = H1SegmentKernel.assemble_values(&input, &pattern).unwrap();

    let expected_0 = DMatrix::from_row_slice(2, 2, &[2.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 2.0 / 3.0]);
    let expected_1 = DMatrix::from_row_slice(2, 2, &[1.0 / 3.0, 1.0 / 6.0, 1.0 / 6.0, 1.0 / 3.0]);
    assert_matrix_eq!(values.element_matrix(&pattern, 0), expected_0, comp = abs, tol = 1e-14);
    assert_matrix_eq!(values.element_matrix(&pattern, 1), expected_1, comp = abs, tol = 1e-14);
}

#[test]
fn segment_kernel_errors() {
    let coordinates = [0.0, 1.0];
    let h1 = LorForm::H1 { diffusion: 1.0, mass: 0.0 };

    let mut input = segment_input(1, 1, &coordinates, h1);
    input.dim = 2;
    assert!(LocalKernel::<f64>::sparsity_pattern(&H1SegmentKernel, &input).is_err());

    let input = segment_input(1, 1, &coordinates, h1);
    let pattern = H1SegmentKernel.sparsity_pattern(&input).unwrap();

    let nedelec = segment_input(1, 1, &coordinates, LorForm::Nedelec { curl_curl: 1.0, mass: 0.0 });
    assert!(H1SegmentKernel.assemble_values(&nedelec, &pattern).is_err());

    let too_few = segment_input(1, 2, &coordinates, h1);
    assert!(H1SegmentKernel.assemble_values(&too_few, &pattern).is_err());

    let degenerate = [1.0, 1.0];
    let input = segment_input(1, 1, &degenerate, h1);
    assert!(H1SegmentKernel.assemble_values(&input, &pattern).is_err());
}

#[test]
fn dense_kernel_stores_full_matrices() {
    let matrices = vec![DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0])];
    let kernel = DenseElementKernel::new(matrices.clone());
    let input = segment_input(1, 1, &[], LorForm::H1 { diffusion: 1.0, mass: 0.0 });
    let pattern = kernel.sparsity_pattern(&input).unwrap();
    assert_eq!(pattern, LocalSparsityPattern::dense(2));
    let values = kernel.assemble_values(&input, &pattern).unwrap();
    assert_eq!(values.element_matrix(&pattern, 0), matrices[0]);

    let input = segment_input(1, 3, &[], LorForm::H1 { diffusion: 1.0, mass: 0.0 });
    assert!(kernel.assemble_values(&input, &pattern).is_err());
}
