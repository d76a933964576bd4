//! Affine expansions of parametrized operators.
//!
//! A parametrized operator `A(mu)` is assumed to decompose as `A(mu) = sum_q theta_q(mu) A_q`,
//! where the terms `A_q` do not depend on the parameter. The terms are assembled once, and
//! evaluating the operator for a new parameter reduces to a linear combination. Projecting the
//! terms onto a reduced basis once makes the online evaluation independent of the number of
//! degrees of freedom of the truth discretization.
use crate::error::RbError;
use crate::functions_list::FunctionsList;
use crate::io::{file_path, load_length, read_json, save_length, write_json};
use crate::online::{OnlineMatrix, OnlineSize, OnlineVector};
use crate::parallel::Communicator;
use crate::tensor::Tensor;
use eyre::eyre;
use indexmap::IndexMap;
use rbnics_traits::LinearCombination;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// A parametrized problem with affinely decomposed operators.
///
/// Operators are identified by short term names such as `"a"` (bilinear form), `"f"`
/// (right-hand side) or `"m"` (mass).
pub trait ParametrizedProblem {
    /// The coefficients `theta_q(mu)` of the given term.
    fn compute_theta(&self, term: &str, mu: &[f64]) -> Result<Vec<f64>, RbError>;

    /// The parameter-independent terms `A_q` of the given term, in the order matching
    /// [`compute_theta`](ParametrizedProblem::compute_theta).
    fn assemble_operator(&self, term: &str) -> Result<Vec<Tensor>, RbError>;
}

impl<P: ParametrizedProblem + ?Sized> ParametrizedProblem for &P {
    fn compute_theta(&self, term: &str, mu: &[f64]) -> Result<Vec<f64>, RbError> {
        P::compute_theta(self, term, mu)
    }

    fn assemble_operator(&self, term: &str) -> Result<Vec<Tensor>, RbError> {
        P::assemble_operator(self, term)
    }
}

/// An ordered, immutable sequence of parameter-independent terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffineExpansion<T> {
    terms: Vec<T>,
}

impl<T> AffineExpansion<T> {
    /// # Panics
    ///
    /// Panics if `terms` is empty.
    pub fn new(terms: Vec<T>) -> Self {
        assert!(!terms.is_empty(), "An affine expansion needs at least one term.");
        Self { terms }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[T] {
        &self.terms
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.terms.iter()
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> AffineExpansion<U> {
        AffineExpansion {
            terms: self.terms.iter().map(f).collect(),
        }
    }
}

impl<T: LinearCombination> AffineExpansion<T> {
    /// Computes `sum_q theta[q] * terms[q]`, accumulating from left to right.
    ///
    /// # Panics
    ///
    /// Panics if `theta` does not have one coefficient per term.
    pub fn evaluate(&self, theta: &[f64]) -> T {
        assert_eq!(
            theta.len(),
            self.terms.len(),
            "Number of theta coefficients must match the number of affine terms."
        );
        let mut result = self.terms[0].scaled(theta[0]);
        for (coefficient, term) in theta.iter().zip(&self.terms).skip(1) {
            result.add_scaled(*coefficient, term);
        }
        result
    }
}

/// Truth evaluation of the affinely decomposed operators of a problem.
///
/// Each term is assembled on first use and kept for the lifetime of the engine.
#[derive(Debug)]
pub struct AffineExpansionEngine<P> {
    problem: P,
    truth: RefCell<FxHashMap<String, Rc<AffineExpansion<Tensor>>>>,
}

impl<P: ParametrizedProblem> AffineExpansionEngine<P> {
    pub fn new(problem: P) -> Self {
        Self {
            problem,
            truth: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// The assembled terms of `term`.
    pub fn truth_expansion(&self, term: &str) -> Result<Rc<AffineExpansion<Tensor>>, RbError> {
        if let Some(expansion) = self.truth.borrow().get(term) {
            return Ok(Rc::clone(expansion));
        }
        let expansion = Rc::new(AffineExpansion::new(self.problem.assemble_operator(term)?));
        log::debug!("Assembled {} affine terms for \"{}\"", expansion.len(), term);
        self.truth
            .borrow_mut()
            .insert(term.to_string(), Rc::clone(&expansion));
        Ok(expansion)
    }

    /// Evaluates the truth operator `term` at the parameter `mu`.
    ///
    /// # Panics
    ///
    /// Panics if the problem returns a number of coefficients different from the number of terms.
    pub fn evaluate(&self, term: &str, mu: &[f64]) -> Result<Tensor, RbError> {
        let expansion = self.truth_expansion(term)?;
        let theta = self.problem.compute_theta(term, mu)?;
        Ok(expansion.evaluate(&theta))
    }

    /// Projects the given terms onto `basis`.
    ///
    /// Matrices are reduced to `Zᵀ A Z` and vectors to `Zᵀ f`, at the current size of the basis.
    pub fn reduce(&self, terms: &[&str], basis: &FunctionsList) -> Result<ReducedAffineExpansion, RbError> {
        let mut reduced = IndexMap::new();
        for &term in terms {
            let expansion = self.truth_expansion(term)?;
            let projected = expansion.map(|tensor| match tensor {
                Tensor::Matrix(matrix) => OnlineTensor::Matrix(basis.project_matrix(matrix, basis)),
                Tensor::Vector(vector) => OnlineTensor::Vector(basis.project_vector(vector)),
            });
            reduced.insert(term.to_string(), projected);
        }
        log::debug!("Reduced {} affine expansions onto {} basis functions", reduced.len(), basis.len());
        Ok(ReducedAffineExpansion::new(basis.len(), reduced))
    }
}

/// A reduced operator or functional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OnlineTensor {
    Matrix(OnlineMatrix),
    Vector(OnlineVector),
}

impl OnlineTensor {
    pub fn as_matrix(&self) -> Option<&OnlineMatrix> {
        match self {
            OnlineTensor::Matrix(matrix) => Some(matrix),
            OnlineTensor::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&OnlineVector> {
        match self {
            OnlineTensor::Matrix(_) => None,
            OnlineTensor::Vector(vector) => Some(vector),
        }
    }

    /// The leading block of size `n` along every axis.
    pub fn restrict(&self, n: &OnlineSize) -> OnlineTensor {
        match self {
            OnlineTensor::Matrix(matrix) => OnlineTensor::Matrix(matrix.restrict(n, n)),
            OnlineTensor::Vector(vector) => OnlineTensor::Vector(vector.restrict(n)),
        }
    }
}

impl LinearCombination for OnlineTensor {
    fn scaled(&self, alpha: f64) -> Self {
        match self {
            OnlineTensor::Matrix(matrix) => OnlineTensor::Matrix(matrix.scaled(alpha)),
            OnlineTensor::Vector(vector) => OnlineTensor::Vector(vector.scaled(alpha)),
        }
    }

    fn add_scaled(&mut self, alpha: f64, other: &Self) {
        match (self, other) {
            (OnlineTensor::Matrix(a), OnlineTensor::Matrix(b)) => a.add_scaled(alpha, b),
            (OnlineTensor::Vector(a), OnlineTensor::Vector(b)) => a.add_scaled(alpha, b),
            _ => panic!("Cannot combine an online matrix with an online vector."),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ReducedTermData {
    term: String,
    n_max: usize,
    expansion: AffineExpansion<OnlineTensor>,
}

/// Affine expansions projected onto a reduced basis of dimension `n_max`.
///
/// Evaluation for a reduced dimension `n <= n_max` uses the leading `n x n` block of every
/// projected term. Restricted terms are cached per term and dimension.
#[derive(Debug)]
pub struct ReducedAffineExpansion {
    n_max: usize,
    expansions: IndexMap<String, AffineExpansion<OnlineTensor>>,
    restricted: RefCell<FxHashMap<(String, usize), Rc<AffineExpansion<OnlineTensor>>>>,
}

impl ReducedAffineExpansion {
    fn new(n_max: usize, expansions: IndexMap<String, AffineExpansion<OnlineTensor>>) -> Self {
        Self {
            n_max,
            expansions,
            restricted: RefCell::new(FxHashMap::default()),
        }
    }

    /// Dimension of the basis the terms were projected onto.
    pub fn n_max(&self) -> usize {
        self.n_max
    }

    pub fn term_names(&self) -> impl Iterator<Item = &str> {
        self.expansions.keys().map(String::as_str)
    }

    /// The terms of `term` restricted to a reduced dimension `n`.
    pub fn expansion(&self, term: &str, n: usize) -> Result<Rc<AffineExpansion<OnlineTensor>>, RbError> {
        let expansion = self
            .expansions
            .get(term)
            .ok_or_else(|| RbError::unknown_term(term))?;
        if n > self.n_max {
            return Err(RbError::InvalidArgument(format!(
                "reduced dimension {} exceeds the dimension {} of the basis",
                n, self.n_max
            )));
        }
        let key = (term.to_string(), n);
        if let Some(restricted) = self.restricted.borrow().get(&key) {
            return Ok(Rc::clone(restricted));
        }
        let size = OnlineSize::Monolithic(n);
        let restricted = Rc::new(expansion.map(|tensor| tensor.restrict(&size)));
        self.restricted.borrow_mut().insert(key, Rc::clone(&restricted));
        Ok(restricted)
    }

    /// Evaluates the reduced operator `term` at the parameter `mu`, in dimension `n`.
    ///
    /// # Panics
    ///
    /// Panics if the problem returns a number of coefficients different from the number of terms.
    pub fn evaluate<P>(&self, problem: &P, term: &str, mu: &[f64], n: usize) -> Result<OnlineTensor, RbError>
    where
        P: ParametrizedProblem + ?Sized,
    {
        let expansion = self.expansion(term, n)?;
        let theta = problem.compute_theta(term, mu)?;
        Ok(expansion.evaluate(&theta))
    }

    /// Writes `<name>.length` (the number of terms) and one file `<name>_<i>` per term.
    pub fn save(&self, comm: &dyn Communicator, directory: impl AsRef<Path>, name: &str) -> eyre::Result<()> {
        let directory = directory.as_ref();
        save_length(comm, self.expansions.len(), directory, name)?;
        for (index, (term, expansion)) in self.expansions.iter().enumerate() {
            let data = ReducedTermData {
                term: term.clone(),
                n_max: self.n_max,
                expansion: expansion.clone(),
            };
            write_json(comm, &file_path(directory, &format!("{name}_{index}"), "json"), &data)?;
        }
        log::info!(
            "Saved {} reduced affine expansions to {}",
            self.expansions.len(),
            directory.join(name).display()
        );
        Ok(())
    }

    /// Restores expansions written by [`save`](ReducedAffineExpansion::save).
    pub fn load(comm: &dyn Communicator, directory: impl AsRef<Path>, name: &str) -> eyre::Result<Self> {
        let directory = directory.as_ref();
        let len = load_length(comm, directory, name)?;
        let mut expansions = IndexMap::with_capacity(len);
        let mut n_max = None;
        for index in 0..len {
            let path = file_path(directory, &format!("{name}_{index}"), "json");
            let data: ReducedTermData =
                read_json(comm, &path)?.ok_or_else(|| eyre!("missing reduced term {}", path.display()))?;
            if *n_max.get_or_insert(data.n_max) != data.n_max {
                return Err(eyre!("reduced term {} was projected onto a different basis", data.term));
            }
            expansions.insert(data.term, data.expansion);
        }
        Ok(Self::new(n_max.unwrap_or(0), expansions))
    }
}
