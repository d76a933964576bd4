use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use rbnics::online::{BasisComponents, OnlineFunction, OnlineMatrix, OnlineSize, OnlineVector};
use rbnics::LinearCombination;

#[test]
fn sizes_report_totals_and_block_ranges() {
    let size = OnlineSize::blocks([("u", 3), ("p", 2)]);
    assert_eq!(size.total(), 5);
    let ranges = size.block_ranges();
    assert_eq!(ranges["u"], 0..3);
    assert_eq!(ranges["p"], 3..5);
    assert_eq!(OnlineSize::from(4).total(), 4);
    assert!(OnlineSize::Monolithic(4).block_ranges().is_empty());
}

#[test]
fn monolithic_restriction_keeps_leading_entries() {
    let vector = OnlineVector::from_vector(DVector::from_column_slice(&[1.0, 2.0, 3.0, 4.0]));
    let restricted = vector.restrict(&OnlineSize::Monolithic(2));
    assert_eq!(restricted.content(), &DVector::from_column_slice(&[1.0, 2.0]));
    assert_eq!(restricted.size(), &OnlineSize::Monolithic(2));
}

#[test]
fn blocked_restriction_keeps_leading_entries_of_every_block() {
    let vector = OnlineVector::from_vector_with_size(
        DVector::from_column_slice(&[1.0, 2.0, 3.0, 10.0, 20.0]),
        OnlineSize::blocks([("u", 3), ("p", 2)]),
    );
    let restricted = vector.restrict(&OnlineSize::blocks([("u", 2), ("p", 1)]));
    assert_eq!(restricted.content(), &DVector::from_column_slice(&[1.0, 2.0, 10.0]));
    assert_eq!(restricted.size(), &OnlineSize::blocks([("u", 2), ("p", 1)]));

    // Components requested with size zero, or not requested at all, are dropped
    let only_p = vector.restrict(&OnlineSize::blocks([("p", 2)]));
    assert_eq!(only_p.content(), &DVector::from_column_slice(&[10.0, 20.0]));
    assert_eq!(only_p.size(), &OnlineSize::blocks([("p", 2)]));
}

#[test]
fn integer_restriction_of_a_single_block() {
    let vector = OnlineVector::from_vector_with_size(
        DVector::from_column_slice(&[1.0, 2.0, 3.0]),
        OnlineSize::blocks([("u", 3)]),
    );
    let restricted = vector.restrict(&OnlineSize::Monolithic(1));
    assert_eq!(restricted.content(), &DVector::from_column_slice(&[1.0]));
    assert_eq!(restricted.size(), &OnlineSize::blocks([("u", 1)]));
}

#[test]
#[should_panic(expected = "requires exactly one block")]
fn integer_restriction_of_several_blocks_panics() {
    let vector = OnlineVector::zeros(OnlineSize::blocks([("u", 2), ("p", 1)]));
    vector.restrict(&OnlineSize::Monolithic(1));
}

#[test]
#[should_panic]
fn restriction_beyond_size_panics() {
    OnlineVector::zeros(2).restrict(&OnlineSize::Monolithic(3));
}

#[test]
#[should_panic(expected = "Component q is not present.")]
fn restriction_to_unknown_component_panics() {
    OnlineVector::zeros(OnlineSize::blocks([("u", 2)])).restrict(&OnlineSize::blocks([("q", 1)]));
}

#[test]
fn matrix_restriction_selects_leading_block() {
    let matrix = OnlineMatrix::from_matrix(DMatrix::from_fn(3, 4, |i, j| (10 * i + j) as f64));
    let restricted = matrix.restrict(&OnlineSize::Monolithic(2), &OnlineSize::Monolithic(3));
    assert_eq!(restricted.nrows(), 2);
    assert_eq!(restricted.ncols(), 3);
    assert_eq!(
        restricted.content(),
        &DMatrix::from_row_slice(2, 3, &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0])
    );
}

#[test]
fn blocked_matrix_restriction() {
    let size = OnlineSize::blocks([("u", 2), ("p", 1)]);
    let matrix = OnlineMatrix::from_matrix_with_size(DMatrix::from_fn(3, 3, |i, j| (10 * i + j) as f64), size.clone(), size);
    let request = OnlineSize::blocks([("u", 1), ("p", 1)]);
    let restricted = matrix.restrict(&request, &request);
    assert_eq!(
        restricted.content(),
        &DMatrix::from_row_slice(2, 2, &[0.0, 2.0, 20.0, 22.0])
    );
    assert_eq!(restricted.size(), &(request.clone(), request));
}

#[test]
#[should_panic]
fn size_must_match_content() {
    OnlineVector::from_vector_with_size(DVector::zeros(3), OnlineSize::blocks([("u", 2)]));
}

#[test]
fn restriction_and_compatibility_of_bookkeeping() {
    let full = BasisComponents::new().with(0, "u", 3).with(1, "p", 2);
    let u_only = BasisComponents::new().with(0, "u", 3);
    let other_u = BasisComponents::new().with(0, "u", 4);
    let p_first = BasisComponents::new().with(0, "p", 2);

    assert!(u_only.is_restriction_of(&full));
    assert!(!full.is_restriction_of(&u_only));
    assert!(u_only.is_compatible_with(&full));
    assert!(full.is_compatible_with(&u_only));

    assert!(!other_u.is_restriction_of(&full));
    assert!(!other_u.is_compatible_with(&full));
    assert!(!p_first.is_compatible_with(&full));
    assert!(BasisComponents::new().is_restriction_of(&full));

    assert_eq!(full.index_to_name()[&1], "p");
    assert_eq!(full.name_to_index()["u"], 0);
    assert_eq!(full.name_to_length()["p"], 2);
}

#[test]
fn restriction_keeps_bookkeeping() {
    let components = BasisComponents::new().with(0, "u", 3);
    let vector = OnlineVector::zeros(3).with_components(components.clone());
    assert_eq!(vector.restrict(&OnlineSize::Monolithic(1)).components(), Some(&components));
}

#[test]
fn online_functions_wrap_vectors() {
    let mut function = OnlineFunction::zeros(OnlineSize::blocks([("u", 2)]));
    function.vector_mut().content_mut()[1] = 5.0;
    assert_eq!(function.vector().size().total(), 2);
    assert_eq!(function.into_vector().content()[1], 5.0);
}

#[test]
#[should_panic(expected = "Online vectors must have the same size.")]
fn combination_of_differently_sized_vectors_panics() {
    let mut a = OnlineVector::zeros(2);
    a.add_scaled(1.0, &OnlineVector::zeros(3));
}

#[test]
fn block_order_is_part_of_the_size() {
    let up = OnlineSize::blocks([("u", 2), ("p", 1)]);
    let pu = OnlineSize::blocks([("p", 1), ("u", 2)]);
    assert_ne!(up, pu);
    assert_eq!(up, OnlineSize::blocks([("u", 2), ("p", 1)]));
    assert_ne!(OnlineSize::Monolithic(3), OnlineSize::blocks([("u", 3)]));
}

#[test]
#[should_panic(expected = "Online vectors must have the same size.")]
fn combination_of_vectors_with_reordered_blocks_panics() {
    let mut a = OnlineVector::zeros(OnlineSize::blocks([("u", 2), ("p", 1)]));
    a.add_scaled(1.0, &OnlineVector::zeros(OnlineSize::blocks([("p", 1), ("u", 2)])));
}

#[test]
#[should_panic(expected = "Online matrices must have the same size.")]
fn combination_of_matrices_with_reordered_blocks_panics() {
    let up = OnlineSize::blocks([("u", 2), ("p", 1)]);
    let pu = OnlineSize::blocks([("p", 1), ("u", 2)]);
    let mut a = OnlineMatrix::zeros(up.clone(), up);
    a.add_scaled(1.0, &OnlineMatrix::zeros(pu.clone(), pu));
}

#[test]
fn restriction_drops_bookkeeping_of_dropped_blocks() {
    let components = BasisComponents::new().with(0, "u", 2).with(1, "p", 1);
    let size = OnlineSize::blocks([("u", 2), ("p", 1)]);
    let vector = OnlineVector::zeros(size.clone()).with_components(components.clone());
    let only_u = vector.restrict(&OnlineSize::blocks([("u", 1)]));
    assert_eq!(only_u.components(), Some(&BasisComponents::new().with(0, "u", 2)));
    assert!(only_u.components().unwrap().is_restriction_of(&components));

    let mut matrix = OnlineMatrix::zeros(size.clone(), size);
    matrix.set_components((Some(components.clone()), Some(components.clone())));
    let restricted = matrix.restrict(&OnlineSize::blocks([("p", 1)]), &OnlineSize::blocks([("u", 1), ("p", 1)]));
    assert_eq!(
        restricted.components(),
        &(Some(BasisComponents::new().with(1, "p", 1)), Some(components))
    );
}

proptest! {
    #[test]
    fn nested_restrictions_compose(vector in rbnics::proptest::online_vector(6), n in 0usize..=6, m in 0usize..=6) {
        let (small, large) = (n.min(m), n.max(m));
        let direct = vector.restrict(&OnlineSize::Monolithic(small));
        let nested = vector
            .restrict(&OnlineSize::Monolithic(large))
            .restrict(&OnlineSize::Monolithic(small));
        prop_assert_eq!(direct, nested);
    }

    #[test]
    fn matrix_restriction_is_a_leading_view(matrix in rbnics::proptest::online_matrix(4, 5), n in 0usize..=4, m in 0usize..=5) {
        let restricted = matrix.restrict(&OnlineSize::Monolithic(n), &OnlineSize::Monolithic(m));
        prop_assert_eq!(restricted.content(), &matrix.content().view((0, 0), (n, m)).into_owned());
    }
}
