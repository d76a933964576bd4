//! Dirichlet boundary conditions.
use crate::space::FunctionSpace;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Prescribed values on a set of degrees of freedom of a function space.
///
/// Degrees of freedom are stored by their process-local index, as reported by the finite element
/// backend; [`DirichletBC::constrained_global_dofs`] maps them to global indices.
#[derive(Debug, Clone)]
pub struct DirichletBC {
    space: Arc<FunctionSpace>,
    boundary_values: BTreeMap<usize, f64>,
}

impl DirichletBC {
    /// # Panics
    ///
    /// Panics if a degree of freedom is not a valid local index of the space.
    pub fn new(space: Arc<FunctionSpace>, boundary_values: impl IntoIterator<Item = (usize, f64)>) -> Self {
        let boundary_values: BTreeMap<_, _> = boundary_values.into_iter().collect();
        assert!(
            boundary_values
                .keys()
                .all(|&local_dof| local_dof < space.num_local_dofs()),
            "Boundary condition references degrees of freedom not present on this process."
        );
        Self { space, boundary_values }
    }

    /// A homogeneous condition on the given local degrees of freedom.
    pub fn homogeneous(space: Arc<FunctionSpace>, local_dofs: impl IntoIterator<Item = usize>) -> Self {
        Self::new(space, local_dofs.into_iter().map(|dof| (dof, 0.0)))
    }

    pub fn space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    /// Prescribed values keyed by local degree of freedom.
    pub fn boundary_values(&self) -> &BTreeMap<usize, f64> {
        &self.boundary_values
    }

    pub fn constrained_global_dofs(&self) -> impl Iterator<Item = usize> + '_ {
        self.boundary_values
            .keys()
            .map(|&local_dof| self.space.local_to_global(local_dof))
    }
}
