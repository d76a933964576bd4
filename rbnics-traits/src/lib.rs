//! Core traits shared by the `rbnics` crates.
//!
//! The traits here describe the small surface the reduced basis layer needs from its
//! collaborators: a way to form linear combinations of algebraic objects (used by affine
//! expansions) and a collective communication layer (used by the persistence layer).
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use std::fmt::Debug;

pub use nalgebra;
pub use nalgebra_sparse;

/// Objects that can be accumulated into a linear combination `sum_i theta_i * x_i`.
///
/// Implementations must produce the same result as the expression
/// `((theta_0 * x_0) + theta_1 * x_1) + ...`, i.e. accumulation happens strictly
/// left to right.
pub trait LinearCombination: Sized {
    /// Returns `alpha * self`.
    fn scaled(&self, alpha: f64) -> Self;

    /// Updates `self <- self + alpha * other`.
    ///
    /// # Panics
    ///
    /// Implementations panic if the shapes of `self` and `other` differ.
    fn add_scaled(&mut self, alpha: f64, other: &Self);
}

impl LinearCombination for f64 {
    fn scaled(&self, alpha: f64) -> Self {
        alpha * self
    }

    fn add_scaled(&mut self, alpha: f64, other: &Self) {
        *self += alpha * other;
    }
}

impl LinearCombination for DVector<f64> {
    fn scaled(&self, alpha: f64) -> Self {
        self * alpha
    }

    fn add_scaled(&mut self, alpha: f64, other: &Self) {
        assert_eq!(self.len(), other.len(), "Vectors must have the same length.");
        *self += other * alpha;
    }
}

impl LinearCombination for DMatrix<f64> {
    fn scaled(&self, alpha: f64) -> Self {
        self * alpha
    }

    fn add_scaled(&mut self, alpha: f64, other: &Self) {
        assert_eq!(self.shape(), other.shape(), "Matrices must have the same shape.");
        *self += other * alpha;
    }
}

impl LinearCombination for CsrMatrix<f64> {
    fn scaled(&self, alpha: f64) -> Self {
        self * alpha
    }

    fn add_scaled(&mut self, alpha: f64, other: &Self) {
        assert_eq!(self.nrows(), other.nrows(), "Matrices must have the same number of rows.");
        assert_eq!(self.ncols(), other.ncols(), "Matrices must have the same number of columns.");
        // The sparsity patterns may differ, so the sum is formed out of place
        *self = &*self + &(other * alpha);
    }
}

/// Collective communication between the processes cooperating on a distributed problem.
///
/// Payloads are opaque byte buffers; typed helpers live on top of this trait in `rbnics`.
/// Every method is collective: all ranks of the communicator must call it, in the same order.
pub trait Communicator: Debug + Send + Sync {
    /// The rank of the calling process, in `0 .. size()`.
    fn rank(&self) -> usize;

    /// The number of processes in the communicator.
    fn size(&self) -> usize;

    /// An identifier shared by all handles of the same communicator.
    ///
    /// Used to check that objects which must interact (e.g. boundary conditions applied to the
    /// same operator) live on the same communicator.
    fn group_id(&self) -> usize;

    /// Blocks until every rank has reached the barrier.
    fn barrier(&self);

    /// Returns the bytes provided by `root` on every rank.
    ///
    /// The `bytes` argument is ignored on ranks other than `root`.
    fn broadcast_bytes(&self, root: usize, bytes: Vec<u8>) -> Vec<u8>;

    /// Returns the bytes provided by every rank, ordered by rank.
    fn all_gather_bytes(&self, bytes: Vec<u8>) -> Vec<Vec<u8>>;
}
