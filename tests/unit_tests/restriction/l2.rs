use fenris_lor::error::AssemblyError;
use fenris_lor::restriction::{L2ElementRestriction, VectorOrdering};
use nalgebra::DVector;

#[test]
fn scalar_l2_restriction_is_the_identity() {
    let restriction = L2ElementRestriction::new(3, 2);
    assert_eq!(restriction.num_dofs(), 6);
    assert_eq!(restriction.size(), 6);
    let global = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let element = restriction.to_element_layout(&global).unwrap();
    assert_eq!(element.as_slice(), &global);
    assert_eq!(restriction.to_global_layout(element.as_slice()).unwrap(), element);
}

#[test]
fn vector_l2_restriction_groups_components_per_element() {
    // x-components are 1, 2, 3, 4, y-components are 10, 20, 30, 40
    let by_nodes = L2ElementRestriction::new(2, 2)
        .with_vector_dimension(2, VectorOrdering::ByNodes)
        .unwrap();
    let by_vdim = L2ElementRestriction::new(2, 2)
        .with_vector_dimension(2, VectorOrdering::ByVdim)
        .unwrap();
    let global_by_nodes = [1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0];
    let global_by_vdim = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0];
    let expected = DVector::from_vec(vec![1.0, 2.0, 10.0, 20.0, 3.0, 4.0, 30.0, 40.0]);

    assert_eq!(by_nodes.to_element_layout(&global_by_nodes).unwrap(), expected);
    assert_eq!(by_vdim.to_element_layout(&global_by_vdim).unwrap(), expected);
    assert_eq!(
        by_nodes.to_global_layout(expected.as_slice()).unwrap().as_slice(),
        &global_by_nodes
    );
    assert_eq!(
        by_vdim.to_global_layout(expected.as_slice()).unwrap().as_slice(),
        &global_by_vdim
    );
}

#[test]
fn l2_restriction_checks_lengths_and_vector_dimension() {
    let restriction = L2ElementRestriction::new(2, 3);
    assert!(matches!(
        restriction.to_element_layout(&[0.0; 5]),
        Err(AssemblyError::DimensionMismatch { expected: 6, actual: 5, .. })
    ));
    assert!(matches!(
        restriction.with_vector_dimension(0, VectorOrdering::ByVdim),
        Err(AssemblyError::InvalidConnectivity(_))
    ));
}
