//! Function spaces and finite element functions.
//!
//! The discretization itself is provided by an external finite element backend. What the reduced
//! basis layer needs to know about a space is captured by [`FunctionSpace`]: the number of degrees
//! of freedom, which of them are owned by the calling process, how local indices map to global
//! ones, how degrees of freedom are grouped into named components, and the communicator the space
//! is distributed over.
use crate::parallel::{self, Communicator};
use indexmap::IndexMap;
use nalgebra::DVector;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Degree of freedom layout of a finite element space.
pub struct FunctionSpace {
    dim: usize,
    ownership_range: Range<usize>,
    local_to_global: Vec<usize>,
    components: IndexMap<String, Vec<usize>>,
    comm: Arc<dyn Communicator>,
}

impl fmt::Debug for FunctionSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpace")
            .field("dim", &self.dim)
            .field("ownership_range", &self.ownership_range)
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("rank", &self.comm.rank())
            .finish()
    }
}

impl FunctionSpace {
    /// A space with `dim` degrees of freedom, all owned by a single process.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ownership_range: 0..dim,
            local_to_global: (0..dim).collect(),
            components: IndexMap::new(),
            comm: parallel::serial(),
        }
    }

    /// Replaces the communicator the space is distributed over.
    pub fn with_communicator(mut self, comm: Arc<dyn Communicator>) -> Self {
        self.comm = comm;
        self
    }

    /// Sets the range of global degrees of freedom owned by the calling process and the map
    /// from process-local to global indices.
    ///
    /// # Panics
    ///
    /// Panics if the range or any global index lies outside `0 .. dim`.
    pub fn with_ownership(mut self, ownership_range: Range<usize>, local_to_global: Vec<usize>) -> Self {
        assert!(
            ownership_range.start <= ownership_range.end && ownership_range.end <= self.dim,
            "Ownership range must be contained in the space."
        );
        assert!(
            local_to_global.iter().all(|&global| global < self.dim),
            "Local to global map references degrees of freedom outside of the space."
        );
        self.ownership_range = ownership_range;
        self.local_to_global = local_to_global;
        self
    }

    /// Adds a named component made up of the given global degrees of freedom.
    pub fn with_component(mut self, name: impl Into<String>, dofs: Vec<usize>) -> Self {
        assert!(
            dofs.iter().all(|&dof| dof < self.dim),
            "Component references degrees of freedom outside of the space."
        );
        self.components.insert(name.into(), dofs);
        self
    }

    /// Global number of degrees of freedom.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn ownership_range(&self) -> Range<usize> {
        self.ownership_range.clone()
    }

    pub fn num_local_dofs(&self) -> usize {
        self.local_to_global.len()
    }

    pub fn local_to_global(&self, local_dof: usize) -> usize {
        self.local_to_global[local_dof]
    }

    pub fn components(&self) -> &IndexMap<String, Vec<usize>> {
        &self.components
    }

    /// Returns the name of the first component containing the given global degree of freedom.
    pub fn component_of(&self, dof: usize) -> Option<&str> {
        self.components
            .iter()
            .find(|(_, dofs)| dofs.contains(&dof))
            .map(|(name, _)| name.as_str())
    }

    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    pub fn shared_comm(&self) -> Arc<dyn Communicator> {
        Arc::clone(&self.comm)
    }
}

/// A finite element function: a coefficient vector over a function space.
#[derive(Debug, Clone)]
pub struct Function {
    space: Arc<FunctionSpace>,
    vector: DVector<f64>,
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.space.dim() == other.space.dim() && self.vector == other.vector
    }
}

impl Function {
    /// The zero function on the given space.
    pub fn new(space: Arc<FunctionSpace>) -> Self {
        let vector = DVector::zeros(space.dim());
        Self { space, vector }
    }

    /// # Panics
    ///
    /// Panics if the length of the vector differs from the dimension of the space.
    pub fn from_vector(space: Arc<FunctionSpace>, vector: DVector<f64>) -> Self {
        assert_eq!(
            vector.len(),
            space.dim(),
            "Coefficient vector must have one entry per degree of freedom."
        );
        Self { space, vector }
    }

    pub fn space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    pub fn vector(&self) -> &DVector<f64> {
        &self.vector
    }

    pub fn vector_mut(&mut self) -> &mut DVector<f64> {
        &mut self.vector
    }

    pub fn into_vector(self) -> DVector<f64> {
        self.vector
    }
}
