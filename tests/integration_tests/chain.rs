use crate::integration_tests::ChainSpace;
use fenris_lor::assembly::DiagonalPolicy;
use fenris_lor::config::LorAssemblyConfig;
use fenris_lor::kernel::{H1SegmentKernel, Integrator, LorKernels};
use fenris_lor::lor::assemble_batched_lor;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVector};

fn assemble_chain(
    space: &ChainSpace,
    integrators: &[Integrator],
    essential: &[usize],
    policy: DiagonalPolicy,
) -> DMatrix<f64> {
    let kernel = H1SegmentKernel;
    let kernels = LorKernels::<f64>::new().with_h1(&kernel);
    let config = LorAssemblyConfig {
        diagonal_policy: policy,
        min_parallel_len: 1,
        ..Default::default()
    };
    assemble_batched_lor(space, integrators, &kernels, essential, config)
        .unwrap()
        .expect("H1 diffusion and mass are supported")
        .to_dense()
}

#[test]
fn refined_diffusion_annihilates_constants_and_integrates_linear_flux() {
    for order in 1..=5 {
        let space = ChainSpace::new(3, order, 0.0, 2.0);
        let matrix = assemble_chain(
            &space,
            &[Integrator::Diffusion { coefficient: 1.0 }],
            &[],
            DiagonalPolicy::Keep,
        );
        let n = matrix.nrows();
        assert_eq!(n, 3 * order + 1);

        let constant = DVector::repeat(n, 1.0);
        assert_matrix_eq!(&matrix * constant, DVector::<f64>::zeros(n), comp = abs, tol = 1e-10);

        // For u(x) = x the refined operator only sees the boundary fluxes
        let linear = DVector::from_column_slice(space.dof_positions());
        let mut expected = DVector::zeros(n);
        expected[0] = -1.0;
        expected[n - 1] = 1.0;
        assert_matrix_eq!(&matrix * linear, expected, comp = abs, tol = 1e-10);
        assert_matrix_eq!(matrix, matrix.transpose(), comp = abs, tol = 1e-12);
    }
}

#[test]
fn refined_mass_integrates_constants() {
    for order in 1..=4 {
        let space = ChainSpace::new(4, order, -1.0, 2.0);
        let matrix = assemble_chain(&space, &[Integrator::Mass { coefficient: 3.0 }], &[], DiagonalPolicy::Keep);
        // 1ᵀ M 1 is the coefficient times the length of the domain
        assert_scalar_eq!(matrix.sum(), 9.0, comp = abs, tol = 1e-12);
    }
}

#[test]
fn boundary_elimination_on_refined_chain() {
    let space = ChainSpace::new(2, 3, 0.0, 1.0);
    let integrators = [
        Integrator::Mass { coefficient: 1.0 },
        Integrator::Diffusion { coefficient: 1.0 },
    ];
    let full = assemble_chain(&space, &integrators, &[], DiagonalPolicy::Keep);
    let n = full.nrows();
    let essential = [0, n - 1];

    let kept = assemble_chain(&space, &integrators, &essential, DiagonalPolicy::Keep);
    let expected = util::dense_reference_elimination(&full, &essential, None);
    assert_matrix_eq!(kept, expected, comp = abs, tol = 1e-12);

    let unit = assemble_chain(&space, &integrators, &essential, DiagonalPolicy::One);
    let expected = util::dense_reference_elimination(&full, &essential, Some(1.0));
    assert_matrix_eq!(unit, expected, comp = abs, tol = 1e-12);
}
