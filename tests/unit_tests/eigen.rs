use crate::{run_on_ranks, space};
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix, SparseEntry};
use rbnics::boundary::DirichletBC;
use rbnics::eigen::{EigenOperator, EigenSolver, EigenSolverState, Form, ParameterValue, Parameters, Spectrum};
use rbnics::error::RbError;
use rbnics::parallel::{Communicator, LocalCommunicator};
use rbnics::space::FunctionSpace;
use std::sync::Arc;
use util::{assert_approx_eq, laplacian_1d, mass_1d};

/// Exact eigenvalues of `laplacian_1d(n)`, in increasing order.
fn laplacian_eigenvalues(n: usize) -> Vec<f64> {
    let h = 1.0 / (n as f64 + 1.0);
    (1..=n)
        .map(|k| (2.0 - 2.0 * (k as f64 * std::f64::consts::PI * h).cos()) / h)
        .collect()
}

#[derive(Debug)]
struct LaplacianForm(usize);

impl Form for LaplacianForm {
    fn assemble(&self, _keep_diagonal: bool) -> CsrMatrix<f64> {
        laplacian_1d(self.0)
    }
}

/// A coupling form without a diagonal. The diagonal is only part of the pattern on request.
#[derive(Debug)]
struct CouplingForm(usize);

impl Form for CouplingForm {
    fn assemble(&self, keep_diagonal: bool) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.0, self.0);
        for i in 0..self.0 {
            if keep_diagonal {
                coo.push(i, i, 0.0);
            }
            if i + 1 < self.0 {
                coo.push(i, i + 1, 1.0);
                coo.push(i + 1, i, 1.0);
            }
        }
        CsrMatrix::from(&coo)
    }
}

fn parameters(entries: &[(&str, ParameterValue)]) -> Parameters {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[test]
fn smallest_eigenpairs_of_the_laplacian() {
    let n = 10;
    let mut solver = EigenSolver::new(space(n), laplacian_1d(n), None, &[]).unwrap();
    assert_eq!(solver.state(), EigenSolverState::OperatorsSet);
    assert_eq!(solver.num_converged(), 0);

    solver.solve(Some(3)).unwrap();
    assert_eq!(solver.state(), EigenSolverState::Solved);
    assert_eq!(solver.num_converged(), 3);

    let a = laplacian_1d(n);
    let exact = laplacian_eigenvalues(n);
    for i in 0..3 {
        let (real, imaginary) = solver.get_eigenvalue(i).unwrap();
        assert!(real >= 0.0);
        assert_eq!(imaginary, 0.0);
        assert_approx_eq!(real, exact[i], abstol = 1e-9);

        let (x, x_imaginary) = solver.get_eigenvector(i).unwrap();
        assert_eq!(x_imaginary.vector(), &DVector::zeros(n));
        let residual = &a * x.vector() - x.vector() * real;
        assert!(residual.amax() <= 1e-8 * real.max(1.0));
    }
}

#[test]
fn eigenpairs_beyond_the_converged_ones_are_errors() {
    let n = 6;
    let mut solver = EigenSolver::new(space(n), laplacian_1d(n), None, &[]).unwrap();
    assert_eq!(
        solver.get_eigenvalue(0),
        Err(RbError::EigenpairNotComputed { index: 0, converged: 0 })
    );

    solver.solve(Some(3)).unwrap();
    assert_eq!(
        solver.get_eigenvector(3).unwrap_err(),
        RbError::EigenpairNotComputed { index: 3, converged: 3 }
    );
}

#[test]
fn generalized_problem_with_mass_matrix() {
    let n = 12;
    let a = laplacian_1d(n);
    let m = mass_1d(n);
    let mut solver = EigenSolver::new(space(n), a.clone(), Some(m.clone().into()), &[]).unwrap();
    solver.solve(Some(4)).unwrap();

    let mut previous = 0.0;
    for i in 0..4 {
        let (lambda, _) = solver.get_eigenvalue(i).unwrap();
        assert!(lambda > previous);
        previous = lambda;

        let (x, _) = solver.get_eigenvector(i).unwrap();
        let residual = &a * x.vector() - (&m * x.vector()) * lambda;
        assert!(residual.amax() <= 1e-8 * lambda);
    }

    // The smallest eigenvalue approximates pi^2, the first eigenvalue of -u'' on the unit interval
    let (lambda, _) = solver.get_eigenvalue(0).unwrap();
    assert!((lambda - std::f64::consts::PI.powi(2)).abs() < 0.1);
}

#[test]
fn unassembled_forms_are_assembled_on_construction() {
    let n = 5;
    let operator: Box<dyn Form> = Box::new(LaplacianForm(n));
    let mut solver = EigenSolver::new(space(n), operator, None, &[]).unwrap();
    assert_eq!(solver.condensed_operators().0, &laplacian_1d(n));
    solver.solve(Some(1)).unwrap();
    assert_approx_eq!(solver.get_eigenvalue(0).unwrap().0, laplacian_eigenvalues(n)[0], abstol = 1e-9);
}

#[test]
fn dirichlet_dofs_are_condensed_and_zero_in_eigenvectors() {
    let n = 8;
    let space = space(n);
    let bc = DirichletBC::homogeneous(Arc::clone(&space), [0, n - 1]);
    let mut solver = EigenSolver::new(Arc::clone(&space), laplacian_1d(n), Some(mass_1d(n).into()), &[bc]).unwrap();
    assert_eq!(solver.unconstrained_dofs(), Some((1..n - 1).collect::<Vec<_>>().as_slice()));
    let (a, b) = solver.condensed_operators();
    assert_eq!((a.nrows(), a.ncols()), (n - 2, n - 2));
    assert_eq!(b.map(|b| b.nrows()), Some(n - 2));

    solver.solve(Some(2)).unwrap();
    for i in 0..2 {
        let (x, _) = solver.get_eigenvector(i).unwrap();
        assert_eq!(x.vector().len(), n);
        assert_eq!(x.vector()[0], 0.0);
        assert_eq!(x.vector()[n - 1], 0.0);
        assert!(x.vector().amax() > 0.0);
    }
}

#[test]
fn forms_are_assembled_with_their_diagonal() {
    let n = 6;
    let space = space(n);
    let bc = DirichletBC::homogeneous(Arc::clone(&space), [0, n - 1]);
    let operator: Box<dyn Form> = Box::new(CouplingForm(n));
    let solver = EigenSolver::new(space, operator, None, &[bc]).unwrap();
    let (a, _) = solver.condensed_operators();
    assert_eq!(a.nrows(), n - 2);
    for i in 0..n - 2 {
        assert!(matches!(a.get_entry(i, i), Some(SparseEntry::NonZero(_))));
    }
}

#[test]
fn distributed_boundary_conditions_condense_the_global_problem() {
    let n = 8;
    let serial_space = space(n);
    let bc = DirichletBC::homogeneous(Arc::clone(&serial_space), [0, n - 1]);
    let mut serial_solver = EigenSolver::new(serial_space, laplacian_1d(n), None, &[bc]).unwrap();
    serial_solver.solve(Some(2)).unwrap();
    let expected: Vec<_> = (0..2)
        .map(|i| serial_solver.get_eigenvalue(i).unwrap().0)
        .collect();

    // Each rank owns half of the degrees of freedom and constrains the boundary dof it holds
    let results = run_on_ranks(2, move |comm| {
        let rank = comm.rank();
        let ownership = if rank == 0 { 0..4 } else { 4..8 };
        let space = Arc::new(
            FunctionSpace::new(n)
                .with_communicator(comm)
                .with_ownership(ownership.clone(), ownership.collect()),
        );
        let local_boundary_dof = if rank == 0 { 0 } else { 3 };
        let bc = DirichletBC::homogeneous(Arc::clone(&space), [local_boundary_dof]);
        let mut solver = EigenSolver::new(space, laplacian_1d(n), None, &[bc]).unwrap();
        solver.solve(Some(2)).unwrap();
        let eigenvalues: Vec<_> = (0..2).map(|i| solver.get_eigenvalue(i).unwrap().0).collect();
        let (x, _) = solver.get_eigenvector(0).unwrap();
        (solver.unconstrained_dofs().unwrap().to_vec(), eigenvalues, x.vector().clone())
    });

    for (dofs, eigenvalues, x) in results {
        assert_eq!(dofs, (1..n - 1).collect::<Vec<_>>());
        for (computed, expected) in eigenvalues.iter().zip(&expected) {
            assert_approx_eq!(*computed, *expected, abstol = 1e-9);
        }
        assert_eq!(x[0], 0.0);
        assert_eq!(x[n - 1], 0.0);
        assert!(x.rows(1, n - 2).iter().all(|&value| value != 0.0));
    }
}

#[test]
#[should_panic(expected = "All boundary conditions must live on the same communicator.")]
fn boundary_conditions_on_different_communicators_panic() {
    let n = 4;
    let serial_space = space(n);
    let comm = LocalCommunicator::group(1).remove(0);
    let other_space = Arc::new(FunctionSpace::new(n).with_communicator(Arc::new(comm)));
    let bcs = [
        DirichletBC::homogeneous(Arc::clone(&serial_space), [0]),
        DirichletBC::homogeneous(other_space, [n - 1]),
    ];
    EigenSolver::new(serial_space, laplacian_1d(n), None, &bcs).unwrap();
}

#[test]
#[should_panic(expected = "The number of eigenpairs to compute must be specified.")]
fn solve_without_number_of_eigenpairs_panics() {
    let n = 3;
    let mut solver = EigenSolver::new(space(n), laplacian_1d(n), None, &[]).unwrap();
    let _ = solver.solve(None);
}

#[test]
#[should_panic]
fn operators_must_match_the_space() {
    EigenSolver::new(space(4), laplacian_1d(3), None, &[]).unwrap();
}

#[test]
fn spectrum_parameter_selects_the_largest_eigenvalues() {
    let n = 7;
    let mut solver = EigenSolver::new(space(n), laplacian_1d(n), None, &[]).unwrap();
    solver.set_parameters(parameters(&[("spectrum", "largest real".into())]));
    solver.solve(Some(2)).unwrap();
    let exact = laplacian_eigenvalues(n);
    assert_approx_eq!(solver.get_eigenvalue(0).unwrap().0, exact[n - 1], abstol = 1e-9);
    assert_approx_eq!(solver.get_eigenvalue(1).unwrap().0, exact[n - 2], abstol = 1e-9);
}

#[test]
fn set_parameters_merges_into_existing_ones() {
    let n = 3;
    let mut solver = EigenSolver::new(space(n), laplacian_1d(n), None, &[]).unwrap();
    solver.set_parameters(parameters(&[("spectrum", "largest_real".into()), ("tolerance", 1e-12.into())]));
    solver.set_parameters(parameters(&[("spectrum", "smallest_real".into())]));
    assert_eq!(solver.parameters().len(), 2);
    assert_eq!(solver.parameters()["spectrum"], ParameterValue::from("smallest_real"));
}

#[test]
fn unsupported_parameters_are_ignored() {
    let n = 5;
    let mut solver = EigenSolver::new(space(n), laplacian_1d(n), None, &[]).unwrap();
    solver.set_parameters(parameters(&[("problem_type", "gen_hermitian".into()), ("verbose", true.into())]));
    solver.solve(Some(1)).unwrap();
    assert_eq!(solver.num_converged(), 1);
}

#[test]
fn invalid_spectrum_is_an_error() {
    let n = 3;
    let mut solver = EigenSolver::new(space(n), laplacian_1d(n), None, &[]).unwrap();
    solver.set_parameters(parameters(&[("spectrum", "target magnitude".into())]));
    assert!(solver.solve(Some(1)).is_err());
    assert_eq!(solver.num_converged(), 0);
}

#[test]
fn spectrum_names_accept_underscores() {
    assert_eq!("largest_magnitude".parse::<Spectrum>().unwrap(), Spectrum::LargestMagnitude);
    assert_eq!("smallest real".parse::<Spectrum>().unwrap(), Spectrum::SmallestReal);
    assert!(matches!("middle".parse::<Spectrum>(), Err(RbError::InvalidValue(_))));
}

#[test]
fn assembled_operators_convert_into_eigen_operators() {
    let operator: EigenOperator = laplacian_1d(2).into();
    assert!(matches!(operator, EigenOperator::Assembled(_)));
}
