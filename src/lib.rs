//! Data management for reduced basis methods.
//!
//! The crate provides the offline/online data structures of a reduced basis solver on top of an
//! external finite element backend: ordered stores of snapshots and tensors
//! ([`functions_list`], [`tensors_list`]), affine expansions of parametrized operators
//! ([`affine`]), copying between algebraic objects with multi-field bookkeeping ([`assign`]),
//! constrained eigenproblems ([`eigen`]) and distributed-safe persistence ([`io`]).
pub mod affine;
pub mod assign;
pub mod boundary;
pub mod eigen;
pub mod error;
pub mod functions_list;
pub mod io;
pub mod online;
pub mod operand;
pub mod parallel;
pub mod sampling;
pub mod space;
pub mod tensor;
pub mod tensors_list;

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use rbnics_traits::LinearCombination;
