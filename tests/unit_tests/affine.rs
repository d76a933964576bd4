use crate::space;
use matrixcompare::assert_matrix_eq;
use nalgebra::DVector;
use nalgebra_sparse::convert::serial::convert_csr_dense;
use proptest::prelude::*;
use rbnics::affine::{AffineExpansion, AffineExpansionEngine, OnlineTensor, ParametrizedProblem, ReducedAffineExpansion};
use rbnics::error::RbError;
use rbnics::functions_list::FunctionsList;
use rbnics::parallel::serial;
use rbnics::space::Function;
use rbnics::tensor::Tensor;
use rbnics::LinearCombination;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use util::{laplacian_1d, mass_1d, ramp, unit_load_1d};

/// Diffusion-reaction problem `-mu_0 u'' + mu_1 u = 1` on the unit interval.
#[derive(Debug)]
struct DiffusionReaction {
    n: usize,
    assemblies: Cell<usize>,
}

impl DiffusionReaction {
    fn new(n: usize) -> Self {
        Self {
            n,
            assemblies: Cell::new(0),
        }
    }
}

impl ParametrizedProblem for DiffusionReaction {
    fn compute_theta(&self, term: &str, mu: &[f64]) -> Result<Vec<f64>, RbError> {
        match term {
            "a" => Ok(vec![mu[0], mu[1]]),
            "f" => Ok(vec![1.0]),
            _ => Err(RbError::unknown_term(term)),
        }
    }

    fn assemble_operator(&self, term: &str) -> Result<Vec<Tensor>, RbError> {
        self.assemblies.set(self.assemblies.get() + 1);
        match term {
            "a" => Ok(vec![laplacian_1d(self.n).into(), mass_1d(self.n).into()]),
            "f" => Ok(vec![unit_load_1d(self.n).into()]),
            _ => Err(RbError::unknown_term(term)),
        }
    }
}

fn basis(n: usize, len: usize) -> FunctionsList {
    let space = space(n);
    let mut basis = FunctionsList::new(Arc::clone(&space));
    for k in 0..len {
        let values = DVector::from_fn(n, |i, _| ((k + 1) as f64 * (i + 1) as f64 * 0.3).sin());
        basis.enrich(Function::from_vector(Arc::clone(&space), values));
    }
    basis
}

#[test]
fn evaluate_is_the_theta_weighted_sum() {
    let t0 = DVector::from_column_slice(&[1.0, 0.0, -1.0]);
    let t1 = DVector::from_column_slice(&[0.5, 2.0, 4.0]);
    let expansion = AffineExpansion::new(vec![t0, t1]);
    assert_eq!(expansion.len(), 2);
    let result = expansion.evaluate(&[2.0, 3.0]);
    assert_eq!(result, DVector::from_column_slice(&[3.5, 6.0, 10.0]));
}

#[test]
fn evaluate_of_sparse_terms_matches_dense_sum() {
    let n = 6;
    let expansion = AffineExpansion::new(vec![laplacian_1d(n), mass_1d(n)]);
    let result = expansion.evaluate(&[0.25, -4.0]);
    let expected = convert_csr_dense(&laplacian_1d(n)) * 0.25 - convert_csr_dense(&mass_1d(n)) * 4.0;
    assert_matrix_eq!(convert_csr_dense(&result), expected, comp = abs, tol = 1e-12);
}

#[test]
#[should_panic(expected = "Number of theta coefficients must match the number of affine terms.")]
fn evaluate_with_wrong_number_of_coefficients_panics() {
    let expansion = AffineExpansion::new(vec![1.0, 2.0]);
    expansion.evaluate(&[1.0]);
}

#[test]
#[should_panic]
fn empty_expansion_panics() {
    AffineExpansion::<f64>::new(Vec::new());
}

#[test]
fn truth_terms_are_assembled_once() {
    let engine = AffineExpansionEngine::new(DiffusionReaction::new(4));
    let first = engine.truth_expansion("a").unwrap();
    let second = engine.truth_expansion("a").unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    engine.evaluate("a", &[1.0, 2.0]).unwrap();
    engine.evaluate("a", &[3.0, 0.0]).unwrap();
    assert_eq!(engine.problem().assemblies.get(), 1);

    engine.evaluate("f", &[1.0, 2.0]).unwrap();
    assert_eq!(engine.problem().assemblies.get(), 2);
}

#[test]
fn truth_evaluation_combines_assembled_terms() {
    let n = 5;
    let engine = AffineExpansionEngine::new(DiffusionReaction::new(n));
    let a = engine.evaluate("a", &[2.0, 10.0]).unwrap();
    let expected = convert_csr_dense(&laplacian_1d(n)) * 2.0 + convert_csr_dense(&mass_1d(n)) * 10.0;
    assert_matrix_eq!(convert_csr_dense(a.as_matrix().unwrap()), expected, comp = abs, tol = 1e-10);

    let f = engine.evaluate("f", &[2.0, 10.0]).unwrap();
    assert_eq!(f.as_vector().unwrap(), &unit_load_1d(n));
}

#[test]
fn unknown_terms_are_unsupported() {
    let engine = AffineExpansionEngine::new(DiffusionReaction::new(3));
    assert!(matches!(
        engine.evaluate("g", &[1.0, 1.0]),
        Err(RbError::UnsupportedOperation(_))
    ));
}

#[test]
fn reduced_evaluation_matches_projection_of_truth_operator() {
    let n = 8;
    let engine = AffineExpansionEngine::new(DiffusionReaction::new(n));
    let basis = basis(n, 3);
    let reduced = engine.reduce(&["a", "f"], &basis).unwrap();
    assert_eq!(reduced.n_max(), 3);
    assert_eq!(reduced.term_names().collect::<Vec<_>>(), vec!["a", "f"]);

    let mu = [0.7, 3.0];
    let truth_a = engine.evaluate("a", &mu).unwrap();
    let truth_f = engine.evaluate("f", &mu).unwrap();
    for n_reduced in 0..=3 {
        let prefix = basis.slice(n_reduced).unwrap();
        let expected_a = prefix.project_matrix(truth_a.as_matrix().unwrap(), &prefix);
        let expected_f = prefix.project_vector(truth_f.as_vector().unwrap());

        let reduced_a = reduced.evaluate(engine.problem(), "a", &mu, n_reduced).unwrap();
        let reduced_f = reduced.evaluate(engine.problem(), "f", &mu, n_reduced).unwrap();
        assert_matrix_eq!(
            reduced_a.as_matrix().unwrap().content().clone(),
            expected_a.content().clone(),
            comp = abs,
            tol = 1e-9
        );
        assert_matrix_eq!(
            reduced_f.as_vector().unwrap().content().clone(),
            expected_f.content().clone(),
            comp = abs,
            tol = 1e-12
        );
    }
}

#[test]
fn restricted_terms_are_cached() {
    let n = 4;
    let engine = AffineExpansionEngine::new(DiffusionReaction::new(n));
    let reduced = engine.reduce(&["a"], &basis(n, 2)).unwrap();
    let first = reduced.expansion("a", 1).unwrap();
    let second = reduced.expansion("a", 1).unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(first.terms()[0].as_matrix().unwrap().nrows(), 1);
}

#[test]
fn reduced_dimension_beyond_basis_is_an_error() {
    let n = 4;
    let engine = AffineExpansionEngine::new(DiffusionReaction::new(n));
    let reduced = engine.reduce(&["a"], &basis(n, 2)).unwrap();
    assert!(matches!(reduced.expansion("a", 3), Err(RbError::InvalidArgument(_))));
    assert!(matches!(reduced.expansion("f", 1), Err(RbError::UnsupportedOperation(_))));
}

#[test]
fn reduced_expansion_survives_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let n = 6;
    let engine = AffineExpansionEngine::new(DiffusionReaction::new(n));
    let reduced = engine.reduce(&["a", "f"], &basis(n, 3)).unwrap();
    reduced.save(serial().as_ref(), dir.path(), "reduced_operators").unwrap();
    assert!(dir.path().join("reduced_operators.length").exists());

    let loaded = ReducedAffineExpansion::load(serial().as_ref(), dir.path(), "reduced_operators").unwrap();
    assert_eq!(loaded.n_max(), 3);
    assert_eq!(loaded.term_names().collect::<Vec<_>>(), vec!["a", "f"]);
    let mu = [1.5, 0.5];
    let loaded_a = loaded.evaluate(engine.problem(), "a", &mu, 2).unwrap();
    let reduced_a = reduced.evaluate(engine.problem(), "a", &mu, 2).unwrap();
    assert_matrix_eq!(
        loaded_a.as_matrix().unwrap().content().clone(),
        reduced_a.as_matrix().unwrap().content().clone(),
        comp = abs,
        tol = 1e-12
    );
    let loaded_f = loaded.evaluate(engine.problem(), "f", &mu, 2).unwrap();
    let reduced_f = reduced.evaluate(engine.problem(), "f", &mu, 2).unwrap();
    assert_matrix_eq!(
        loaded_f.as_vector().unwrap().content().clone(),
        reduced_f.as_vector().unwrap().content().clone(),
        comp = abs,
        tol = 1e-12
    );
}

#[test]
fn online_tensors_combine_like_their_content() {
    let reduced = basis(4, 2).project_vector(&ramp(4, 1.0));
    let tensor = OnlineTensor::Vector(reduced.clone());
    let mut doubled = tensor.scaled(2.0);
    doubled.add_scaled(-1.0, &tensor);
    assert_matrix_eq!(
        doubled.as_vector().unwrap().content().clone(),
        reduced.content().clone(),
        comp = abs,
        tol = 1e-14
    );
}

proptest! {
    #[test]
    fn evaluate_is_linear_in_theta(theta in rbnics::proptest::theta(3), alpha in -5.0..5.0f64) {
        let terms = vec![ramp(4, 0.0), ramp(4, -1.0), DVector::repeat(4, 0.5)];
        let expansion = AffineExpansion::new(terms);
        let scaled_theta: Vec<f64> = theta.iter().map(|t| alpha * t).collect();
        let lhs = expansion.evaluate(&scaled_theta);
        let rhs = expansion.evaluate(&theta) * alpha;
        prop_assert!((lhs - rhs).amax() <= 1e-10);
    }
}
