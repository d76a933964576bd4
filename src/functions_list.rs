//! Ordered collections of snapshots and basis functions.
//!
//! A [`FunctionsList`] stores the snapshots or basis functions produced during the offline stage,
//! in the order they were added. The order is the numbering of the reduced basis, so a reduced
//! space of dimension `n` is spanned by the prefix of length `n`.
use crate::error::RbError;
use crate::io::function::{function_load, function_save};
use crate::io::{load_length, save_length};
use crate::online::{OnlineFunction, OnlineMatrix, OnlineVector};
use crate::operand::Operand;
use crate::space::{Function, FunctionSpace};
use eyre::eyre;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::ops::Deref;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

/// An ordered, append-only collection of functions over a common space.
///
/// Prefix slices returned by [`FunctionsList::slice`] are memoized until the next call to
/// [`enrich`](FunctionsList::enrich) or [`clear`](FunctionsList::clear).
#[derive(Debug)]
pub struct FunctionsList {
    space: Arc<FunctionSpace>,
    functions: Vec<Arc<Function>>,
    slices: RefCell<FxHashMap<usize, Rc<FunctionsList>>>,
}

/// A prefix of a [`FunctionsList`].
#[derive(Debug, Clone)]
pub enum FunctionsListSlice<'a> {
    /// The full list.
    Whole(&'a FunctionsList),
    /// A memoized list sharing the leading functions of the original.
    Prefix(Rc<FunctionsList>),
}

impl<'a> Deref for FunctionsListSlice<'a> {
    type Target = FunctionsList;

    fn deref(&self) -> &Self::Target {
        match self {
            FunctionsListSlice::Whole(list) => list,
            FunctionsListSlice::Prefix(list) => list,
        }
    }
}

/// Result of multiplying a [`FunctionsList`] with an online object.
#[derive(Debug)]
pub enum Projection {
    /// One function per column of an online matrix.
    Functions(FunctionsList),
    Function(Function),
}

/// Anything that can be appended to a [`FunctionsList`].
pub trait FunctionSource {
    fn append_to(self, functions: &mut Vec<Arc<Function>>);
}

impl FunctionSource for Function {
    fn append_to(self, functions: &mut Vec<Arc<Function>>) {
        functions.push(Arc::new(self));
    }
}

impl FunctionSource for &Function {
    fn append_to(self, functions: &mut Vec<Arc<Function>>) {
        functions.push(Arc::new(self.clone()));
    }
}

impl FunctionSource for &[Function] {
    fn append_to(self, functions: &mut Vec<Arc<Function>>) {
        functions.extend(self.iter().map(|function| Arc::new(function.clone())));
    }
}

impl FunctionSource for &Vec<Function> {
    fn append_to(self, functions: &mut Vec<Arc<Function>>) {
        self.as_slice().append_to(functions)
    }
}

impl FunctionSource for Vec<Function> {
    fn append_to(self, functions: &mut Vec<Arc<Function>>) {
        functions.extend(self.into_iter().map(Arc::new));
    }
}

impl FunctionSource for &FunctionsList {
    fn append_to(self, functions: &mut Vec<Arc<Function>>) {
        functions.extend(self.iter().map(|function| Arc::new(function.clone())));
    }
}

impl FunctionsList {
    pub fn new(space: Arc<FunctionSpace>) -> Self {
        Self {
            space,
            functions: Vec::new(),
            slices: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    /// Appends copies of the given functions.
    ///
    /// # Panics
    ///
    /// Panics if a function does not have the dimension of the space of the list.
    pub fn enrich(&mut self, source: impl FunctionSource) {
        let previous_len = self.functions.len();
        source.append_to(&mut self.functions);
        let dim = self.space.dim();
        assert!(
            self.functions[previous_len..]
                .iter()
                .all(|function| function.space().dim() == dim),
            "Functions must belong to a space of dimension {dim}."
        );
        self.invalidate_slices();
    }

    pub fn clear(&mut self) {
        self.functions.clear();
        self.invalidate_slices();
    }

    fn invalidate_slices(&self) {
        let mut slices = self.slices.borrow_mut();
        if !slices.is_empty() {
            log::debug!("Dropping {} memoized slices", slices.len());
            slices.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Function, RbError> {
        self.functions
            .get(index)
            .map(|function| function.as_ref())
            .ok_or(RbError::OutOfRange {
                index,
                len: self.functions.len(),
            })
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.functions.iter(),
        }
    }

    /// Returns the first `n` functions.
    ///
    /// For `n == len()` this is the list itself. Shorter prefixes are built once and shared by
    /// every subsequent call with the same `n` until the list is modified.
    pub fn slice(&self, n: usize) -> Result<FunctionsListSlice<'_>, RbError> {
        if n > self.len() {
            return Err(RbError::InvalidArgument(format!(
                "cannot take the first {} functions of a list of length {}",
                n,
                self.len()
            )));
        }
        if n == self.len() {
            return Ok(FunctionsListSlice::Whole(self));
        }
        let prefix = self
            .slices
            .borrow_mut()
            .entry(n)
            .or_insert_with(|| {
                Rc::new(FunctionsList {
                    space: Arc::clone(&self.space),
                    functions: self.functions[..n].to_vec(),
                    slices: RefCell::new(FxHashMap::default()),
                })
            })
            .clone();
        Ok(FunctionsListSlice::Prefix(prefix))
    }

    /// Writes `<name>.length` and one file `<name>_<i>` per function.
    pub fn save(&self, directory: impl AsRef<Path>, name: &str) -> eyre::Result<()> {
        let directory = directory.as_ref();
        save_length(self.space.comm(), self.len(), directory, name)?;
        for (index, function) in self.iter().enumerate() {
            function_save(function, directory, &format!("{name}_{index}"))?;
        }
        log::info!("Saved {} functions to {}", self.len(), directory.join(name).display());
        Ok(())
    }

    /// Restores a list written by [`save`](FunctionsList::save).
    ///
    /// Returns `Ok(false)` without reading anything if the list is not empty.
    pub fn load(&mut self, directory: impl AsRef<Path>, name: &str) -> eyre::Result<bool> {
        if !self.is_empty() {
            return Ok(false);
        }
        let directory = directory.as_ref();
        let len = load_length(self.space.comm(), directory, name)?;
        let mut loaded = Vec::with_capacity(len);
        for index in 0..len {
            let mut function = Function::new(Arc::clone(&self.space));
            let element_name = format!("{name}_{index}");
            if !function_load(&mut function, directory, &element_name)? {
                return Err(eyre!("missing function {} in {}", element_name, directory.display()));
            }
            loaded.push(function);
        }
        self.enrich(loaded);
        log::info!("Loaded {} functions from {}", len, directory.join(name).display());
        Ok(true)
    }

    /// Multiplies the list, viewed as a matrix with one column per function, with an online object.
    ///
    /// An online matrix yields one function per column, an online vector or function yields a
    /// single function. Any other operand is rejected.
    ///
    /// # Panics
    ///
    /// Panics if the online object does not have one row per function of the list.
    pub fn mul<'a>(&self, operand: impl Into<Operand<'a>>) -> Result<Projection, RbError> {
        match operand.into() {
            Operand::OnlineMatrix(matrix) => Ok(Projection::Functions(self.mul_online_matrix(matrix))),
            Operand::OnlineVector(vector) => Ok(Projection::Function(self.mul_online_vector(vector))),
            Operand::OnlineFunction(function) => Ok(Projection::Function(self.mul_online_function(function))),
            other => Err(RbError::InvalidArgument(format!(
                "cannot multiply a functions list with a {}",
                other.kind()
            ))),
        }
    }

    pub fn mul_online_vector(&self, vector: &OnlineVector) -> Function {
        combination(&self.space, &self.functions, vector.content().as_slice())
    }

    pub fn mul_online_function(&self, function: &OnlineFunction) -> Function {
        self.mul_online_vector(function.vector())
    }

    pub fn mul_online_matrix(&self, matrix: &OnlineMatrix) -> FunctionsList {
        assert_eq!(
            matrix.nrows(),
            self.len(),
            "Number of rows must match the number of functions."
        );
        let columns: Vec<Vec<f64>> = matrix
            .content()
            .column_iter()
            .map(|column| column.iter().copied().collect())
            .collect();
        let (space, functions) = (&self.space, &self.functions);
        let combinations: Vec<Function> = columns
            .par_iter()
            .map(|column| combination(space, functions, column))
            .collect();
        let mut result = FunctionsList::new(Arc::clone(&self.space));
        result.enrich(combinations);
        result
    }

    /// Computes the reduced operator `Zᵀ A Z'`, where `Z` is this list and `Z'` is `right`.
    pub fn project_matrix(&self, a: &CsrMatrix<f64>, right: &FunctionsList) -> OnlineMatrix {
        assert_eq!(a.nrows(), self.space.dim(), "Operator rows must match the left basis.");
        assert_eq!(a.ncols(), right.space.dim(), "Operator columns must match the right basis.");
        let a_right: Vec<DVector<f64>> = right
            .functions
            .par_iter()
            .map(|function| a * function.vector())
            .collect();
        let mut reduced = DMatrix::zeros(self.len(), right.len());
        for (i, left) in self.iter().enumerate() {
            for (j, column) in a_right.iter().enumerate() {
                reduced[(i, j)] = left.vector().dot(column);
            }
        }
        OnlineMatrix::from_matrix(reduced)
    }

    /// Computes the reduced functional `Zᵀ f`.
    pub fn project_vector(&self, f: &DVector<f64>) -> OnlineVector {
        assert_eq!(f.len(), self.space.dim(), "Vector length must match the basis.");
        OnlineVector::from_vector(DVector::from_iterator(
            self.len(),
            self.iter().map(|function| function.vector().dot(f)),
        ))
    }

    /// Computes `Zᵀ A u`.
    pub fn project_action(&self, a: &CsrMatrix<f64>, u: &Function) -> OnlineVector {
        assert_eq!(a.ncols(), u.space().dim(), "Operator columns must match the function.");
        self.project_vector(&(a * u.vector()))
    }
}

fn combination(space: &Arc<FunctionSpace>, functions: &[Arc<Function>], coefficients: &[f64]) -> Function {
    assert_eq!(
        coefficients.len(),
        functions.len(),
        "Number of coefficients must match the number of functions."
    );
    let mut result = DVector::zeros(space.dim());
    for (coefficient, function) in coefficients.iter().zip(functions) {
        result.axpy(*coefficient, function.vector(), 1.0);
    }
    Function::from_vector(Arc::clone(space), result)
}

/// Iterator over the functions of a [`FunctionsList`], in insertion order.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: std::slice::Iter<'a, Arc<Function>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Function;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|function| function.as_ref())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> ExactSizeIterator for Iter<'a> {}

impl<'a> IntoIterator for &'a FunctionsList {
    type Item = &'a Function;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
