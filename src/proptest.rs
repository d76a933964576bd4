use crate::online::{OnlineMatrix, OnlineVector};
use crate::space::{Function, FunctionSpace};
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

fn coefficient() -> impl Strategy<Value = f64> {
    // Moderate magnitudes keep sums of products well within the range where
    // comparisons with a fixed absolute tolerance are meaningful
    -10.0..10.0
}

/// Functions on the given space with arbitrary coefficients.
pub fn function(space: Arc<FunctionSpace>) -> impl Strategy<Value = Function> {
    let dim = space.dim();
    vec(coefficient(), dim).prop_map(move |values| Function::from_vector(Arc::clone(&space), DVector::from_vec(values)))
}

/// Sequences of snapshot batches, as produced by successive offline iterations.
pub fn snapshot_batches(
    space: Arc<FunctionSpace>,
    max_batches: usize,
    max_batch_len: usize,
) -> impl Strategy<Value = Vec<Vec<Function>>> {
    vec(vec(function(space), 0..=max_batch_len), 0..=max_batches)
}

/// Coefficient vectors of the given length.
pub fn theta(len: usize) -> impl Strategy<Value = Vec<f64>> {
    vec(coefficient(), len)
}

pub fn online_vector(n: usize) -> impl Strategy<Value = OnlineVector> {
    vec(coefficient(), n).prop_map(|values| OnlineVector::from_vector(DVector::from_vec(values)))
}

pub fn online_matrix(nrows: usize, ncols: usize) -> impl Strategy<Value = OnlineMatrix> {
    vec(coefficient(), nrows * ncols)
        .prop_map(move |values| OnlineMatrix::from_matrix(DMatrix::from_vec(nrows, ncols, values)))
}
