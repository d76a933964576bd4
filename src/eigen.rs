//! Generalized eigenvalue problems with Dirichlet boundary conditions.
//!
//! Eigenproblems `A x = lambda B x` arise during basis construction (POD) and in stability
//! analysis. When Dirichlet conditions are present, the constrained degrees of freedom are
//! eliminated by restricting both operators to the unconstrained degrees of freedom, and the
//! eigenvectors are extended by zero afterwards.
use crate::boundary::DirichletBC;
use crate::error::RbError;
use crate::parallel;
use crate::space::{Function, FunctionSpace};
use eyre::eyre;
use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};
use nalgebra_sparse::convert::serial::convert_csr_dense;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A bilinear form that can be assembled into a sparse matrix.
pub trait Form: fmt::Debug {
    /// Assembles the form. With `keep_diagonal`, the diagonal is part of the sparsity pattern
    /// even where its entries vanish.
    fn assemble(&self, keep_diagonal: bool) -> CsrMatrix<f64>;
}

/// An operator of an eigenproblem, either assembled or still to be assembled.
#[derive(Debug)]
pub enum EigenOperator {
    Assembled(CsrMatrix<f64>),
    Form(Box<dyn Form>),
}

impl From<CsrMatrix<f64>> for EigenOperator {
    fn from(matrix: CsrMatrix<f64>) -> Self {
        EigenOperator::Assembled(matrix)
    }
}

impl From<Box<dyn Form>> for EigenOperator {
    fn from(form: Box<dyn Form>) -> Self {
        EigenOperator::Form(form)
    }
}

impl EigenOperator {
    fn into_matrix(self) -> CsrMatrix<f64> {
        match self {
            EigenOperator::Assembled(matrix) => matrix,
            EigenOperator::Form(form) => form.assemble(true),
        }
    }
}

/// Value of an eigensolver parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Real(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

/// Eigensolver configuration, keyed by parameter name.
pub type Parameters = BTreeMap<String, ParameterValue>;

/// Which part of the spectrum to compute.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spectrum {
    #[default]
    SmallestReal,
    LargestReal,
    SmallestMagnitude,
    LargestMagnitude,
}

impl FromStr for Spectrum {
    type Err = RbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', " ").as_str() {
            "smallest real" => Ok(Spectrum::SmallestReal),
            "largest real" => Ok(Spectrum::LargestReal),
            "smallest magnitude" => Ok(Spectrum::SmallestMagnitude),
            "largest magnitude" => Ok(Spectrum::LargestMagnitude),
            _ => Err(RbError::InvalidValue(format!("unknown spectrum \"{s}\""))),
        }
    }
}

impl Spectrum {
    fn order(&self, a: f64, b: f64) -> std::cmp::Ordering {
        match self {
            Spectrum::SmallestReal => a.total_cmp(&b),
            Spectrum::LargestReal => b.total_cmp(&a),
            Spectrum::SmallestMagnitude => a.abs().total_cmp(&b.abs()),
            Spectrum::LargestMagnitude => b.abs().total_cmp(&a.abs()),
        }
    }
}

/// A backend solving (generalized) eigenproblems on assembled operators.
pub trait GeneralizedEigensolver {
    /// Computes up to `n_eigs` eigenpairs of `A x = lambda B x`, or of `A x = lambda x` without `B`.
    fn solve(
        &mut self,
        a: &CsrMatrix<f64>,
        b: Option<&CsrMatrix<f64>>,
        n_eigs: usize,
        parameters: &Parameters,
    ) -> eyre::Result<()>;

    /// Number of eigenpairs available after [`solve`](GeneralizedEigensolver::solve).
    fn num_converged(&self) -> usize;

    /// Real and imaginary part of the `i`-th eigenvalue, for `i < num_converged()`.
    fn eigenvalue(&self, i: usize) -> (f64, f64);

    /// Real and imaginary part of the `i`-th eigenvector, for `i < num_converged()`.
    fn eigenvector(&self, i: usize) -> (DVector<f64>, DVector<f64>);
}

/// Dense solver for symmetric problems with a symmetric positive definite `B`.
///
/// Recognized parameters are `spectrum` (see [`Spectrum`]), `tolerance` and
/// `maximum_iterations`; other parameters are ignored with a warning.
#[derive(Debug, Clone, Default)]
pub struct DenseEigensolver {
    eigenvalues: Vec<f64>,
    eigenvectors: Vec<DVector<f64>>,
}

struct DenseParameters {
    spectrum: Spectrum,
    tolerance: f64,
    maximum_iterations: usize,
}

impl DenseParameters {
    fn parse(parameters: &Parameters) -> eyre::Result<Self> {
        let mut result = DenseParameters {
            spectrum: Spectrum::default(),
            tolerance: f64::EPSILON,
            maximum_iterations: 0,
        };
        for (key, value) in parameters {
            match (key.as_str(), value) {
                ("spectrum", ParameterValue::Text(spectrum)) => result.spectrum = spectrum.parse()?,
                ("tolerance", ParameterValue::Real(tolerance)) => result.tolerance = *tolerance,
                ("maximum_iterations", ParameterValue::Integer(iterations)) => {
                    result.maximum_iterations = usize::try_from(*iterations)
                        .map_err(|_| eyre!("maximum_iterations must be non-negative, got {}", iterations))?
                }
                ("spectrum" | "tolerance" | "maximum_iterations", value) => {
                    return Err(eyre!("invalid value {:?} for eigensolver parameter \"{}\"", value, key))
                }
                _ => log::warn!("Ignoring unsupported eigensolver parameter \"{}\"", key),
            }
        }
        Ok(result)
    }
}

fn dense_symmetric(matrix: &CsrMatrix<f64>, name: &str) -> eyre::Result<DMatrix<f64>> {
    let dense = convert_csr_dense(matrix);
    let scale = dense.amax().max(1.0);
    if (&dense - dense.transpose()).amax() > 1e-10 * scale {
        return Err(eyre!("operator {} must be symmetric", name));
    }
    Ok(dense)
}

impl GeneralizedEigensolver for DenseEigensolver {
    fn solve(
        &mut self,
        a: &CsrMatrix<f64>,
        b: Option<&CsrMatrix<f64>>,
        n_eigs: usize,
        parameters: &Parameters,
    ) -> eyre::Result<()> {
        self.eigenvalues.clear();
        self.eigenvectors.clear();
        let parameters = DenseParameters::parse(parameters)?;
        let dim = a.nrows();
        if dim == 0 {
            return Ok(());
        }

        let a = dense_symmetric(a, "A")?;
        // For B = L Lᵀ, A x = lambda B x is equivalent to (L⁻¹ A L⁻ᵀ) y = lambda y with x = L⁻ᵀ y
        let (c, cholesky_factor) = match b {
            Some(b) => {
                let b = dense_symmetric(b, "B")?;
                let l = Cholesky::new(b)
                    .ok_or_else(|| eyre!("operator B must be positive definite"))?
                    .l();
                let l_inv_a = l
                    .solve_lower_triangular(&a)
                    .ok_or_else(|| eyre!("Cholesky factor of B is singular"))?;
                let c = l
                    .solve_lower_triangular(&l_inv_a.transpose())
                    .ok_or_else(|| eyre!("Cholesky factor of B is singular"))?;
                ((&c + c.transpose()) * 0.5, Some(l))
            }
            None => (a, None),
        };

        let eigen = SymmetricEigen::try_new(c, parameters.tolerance, parameters.maximum_iterations)
            .ok_or_else(|| eyre!("eigensolver did not converge"))?;

        let mut order: Vec<usize> = (0..dim).collect();
        order.sort_by(|&i, &j| parameters.spectrum.order(eigen.eigenvalues[i], eigen.eigenvalues[j]));
        for &index in order.iter().take(n_eigs) {
            let y = eigen.eigenvectors.column(index).into_owned();
            let x = match &cholesky_factor {
                Some(l) => l
                    .transpose()
                    .solve_upper_triangular(&y)
                    .ok_or_else(|| eyre!("Cholesky factor of B is singular"))?,
                None => y,
            };
            self.eigenvalues.push(eigen.eigenvalues[index]);
            self.eigenvectors.push(x);
        }
        Ok(())
    }

    fn num_converged(&self) -> usize {
        self.eigenvalues.len()
    }

    fn eigenvalue(&self, i: usize) -> (f64, f64) {
        (self.eigenvalues[i], 0.0)
    }

    fn eigenvector(&self, i: usize) -> (DVector<f64>, DVector<f64>) {
        let real = self.eigenvectors[i].clone();
        let imaginary = DVector::zeros(real.len());
        (real, imaginary)
    }
}

/// Lifecycle of an [`EigenSolver`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EigenSolverState {
    Created,
    BoundaryConditionsApplied,
    OperatorsSet,
    Solved,
}

/// Extracts the principal submatrix over the given (sorted, unique) indices.
fn condense(matrix: &CsrMatrix<f64>, indices: &[usize]) -> CsrMatrix<f64> {
    let mut position = vec![None; matrix.nrows()];
    for (k, &index) in indices.iter().enumerate() {
        position[index] = Some(k);
    }
    let mut coo = CooMatrix::new(indices.len(), indices.len());
    for (i, j, &value) in matrix.triplet_iter() {
        if let (Some(row), Some(col)) = (position[i], position[j]) {
            coo.push(row, col, value);
        }
    }
    CsrMatrix::from(&coo)
}

/// An eigenproblem on a function space, optionally subject to Dirichlet conditions.
#[derive(Debug)]
pub struct EigenSolver<S = DenseEigensolver> {
    space: Arc<FunctionSpace>,
    state: EigenSolverState,
    unconstrained_dofs: Option<Vec<usize>>,
    condensed_a: CsrMatrix<f64>,
    condensed_b: Option<CsrMatrix<f64>>,
    parameters: Parameters,
    backend: S,
}

impl EigenSolver<DenseEigensolver> {
    /// Sets up the eigenproblem `A x = lambda B x` (or `A x = lambda x` without `B`) with the
    /// reference dense backend.
    pub fn new(
        space: Arc<FunctionSpace>,
        a: impl Into<EigenOperator>,
        b: Option<EigenOperator>,
        bcs: &[DirichletBC],
    ) -> eyre::Result<Self> {
        Self::with_backend(DenseEigensolver::default(), space, a, b, bcs)
    }
}

impl<S: GeneralizedEigensolver> EigenSolver<S> {
    /// Sets up the eigenproblem with the given backend.
    ///
    /// With boundary conditions, this is a collective operation on their communicator: every
    /// process contributes the degrees of freedom it owns and the ones it constrains, and all
    /// processes condense to the same global problem.
    ///
    /// # Panics
    ///
    /// Panics if the operators do not match the dimension of the space, or if the boundary
    /// conditions do not all live on the same communicator.
    pub fn with_backend(
        backend: S,
        space: Arc<FunctionSpace>,
        a: impl Into<EigenOperator>,
        b: Option<EigenOperator>,
        bcs: &[DirichletBC],
    ) -> eyre::Result<Self> {
        let mut state = EigenSolverState::Created;
        let unconstrained_dofs = if bcs.is_empty() {
            None
        } else {
            let group_id = bcs[0].space().comm().group_id();
            assert!(
                bcs.iter().all(|bc| bc.space().comm().group_id() == group_id),
                "All boundary conditions must live on the same communicator."
            );
            let mut owned_dofs = BTreeSet::new();
            let mut constrained_dofs = BTreeSet::new();
            for bc in bcs {
                owned_dofs.extend(bc.space().ownership_range());
                constrained_dofs.extend(bc.constrained_global_dofs());
            }
            let local_unconstrained: Vec<_> = owned_dofs.difference(&constrained_dofs).copied().collect();
            let local_constrained: Vec<_> = constrained_dofs.into_iter().collect();

            // Constraints on a degree of freedom are only known to the processes holding it
            let gathered = parallel::all_gather(bcs[0].space().comm(), &(local_unconstrained, local_constrained))?;
            let mut unconstrained_dofs = BTreeSet::new();
            let mut constrained_dofs = BTreeSet::new();
            for (unconstrained, constrained) in gathered {
                unconstrained_dofs.extend(unconstrained);
                constrained_dofs.extend(constrained);
            }
            state = EigenSolverState::BoundaryConditionsApplied;
            Some(
                unconstrained_dofs
                    .difference(&constrained_dofs)
                    .copied()
                    .collect::<Vec<_>>(),
            )
        };

        let dim = space.dim();
        let check = |matrix: CsrMatrix<f64>, name: &str| {
            assert_eq!(
                (matrix.nrows(), matrix.ncols()),
                (dim, dim),
                "Operator {name} must be square with one row per degree of freedom."
            );
            match &unconstrained_dofs {
                Some(dofs) => condense(&matrix, dofs),
                None => matrix,
            }
        };
        let a: EigenOperator = a.into();
        let condensed_a = check(a.into_matrix(), "A");
        let condensed_b = b.map(|b| check(b.into_matrix(), "B"));
        if let Some(dofs) = &unconstrained_dofs {
            log::debug!("Condensed eigenproblem from {} to {} degrees of freedom", dim, dofs.len());
        }
        log::debug!("Eigen solver: {:?} -> {:?}", state, EigenSolverState::OperatorsSet);

        Ok(Self {
            space,
            state: EigenSolverState::OperatorsSet,
            unconstrained_dofs,
            condensed_a,
            condensed_b,
            parameters: Parameters::new(),
            backend,
        })
    }

    pub fn state(&self) -> EigenSolverState {
        self.state
    }

    /// Degrees of freedom not constrained by any boundary condition, if conditions were given.
    pub fn unconstrained_dofs(&self) -> Option<&[usize]> {
        self.unconstrained_dofs.as_deref()
    }

    /// The operators the backend works on.
    pub fn condensed_operators(&self) -> (&CsrMatrix<f64>, Option<&CsrMatrix<f64>>) {
        (&self.condensed_a, self.condensed_b.as_ref())
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Merges `parameters` into the solver parameters, replacing existing values.
    pub fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters.extend(parameters);
    }

    /// Computes `n_eigs` eigenpairs.
    ///
    /// # Panics
    ///
    /// Panics if `n_eigs` is `None`.
    pub fn solve(&mut self, n_eigs: Option<usize>) -> eyre::Result<()> {
        let n_eigs = n_eigs.expect("The number of eigenpairs to compute must be specified.");
        self.backend
            .solve(&self.condensed_a, self.condensed_b.as_ref(), n_eigs, &self.parameters)?;
        self.state = EigenSolverState::Solved;
        Ok(())
    }

    /// Number of eigenpairs available for retrieval.
    pub fn num_converged(&self) -> usize {
        match self.state {
            EigenSolverState::Solved => self.backend.num_converged(),
            _ => 0,
        }
    }

    fn check_converged(&self, i: usize) -> Result<(), RbError> {
        let converged = self.num_converged();
        if i < converged {
            Ok(())
        } else {
            Err(RbError::EigenpairNotComputed { index: i, converged })
        }
    }

    /// Real and imaginary part of the `i`-th eigenvalue, in the order of the backend.
    pub fn get_eigenvalue(&self, i: usize) -> Result<(f64, f64), RbError> {
        self.check_converged(i)?;
        Ok(self.backend.eigenvalue(i))
    }

    /// Real and imaginary part of the `i`-th eigenvector, as functions on the full space.
    ///
    /// Entries at constrained degrees of freedom are zero.
    pub fn get_eigenvector(&self, i: usize) -> Result<(Function, Function), RbError> {
        self.check_converged(i)?;
        let (real, imaginary) = self.backend.eigenvector(i);
        let expand = |condensed: DVector<f64>| match &self.unconstrained_dofs {
            Some(dofs) => {
                let mut full = DVector::zeros(self.space.dim());
                for (&dof, value) in dofs.iter().zip(condensed.iter()) {
                    full[dof] = *value;
                }
                Function::from_vector(Arc::clone(&self.space), full)
            }
            None => Function::from_vector(Arc::clone(&self.space), condensed),
        };
        Ok((expand(real), expand(imaginary)))
    }
}
