//! Error types for reduced basis data structures.
use crate::operand::OperandKind;
use thiserror::Error;

/// Recoverable errors raised by stores, expansions and solvers.
///
/// Violations of structural contracts (mismatched dimensions, wrong number of theta coefficients,
/// inconsistent basis component bookkeeping) are not represented here: they indicate a
/// programming error and panic instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RbError {
    #[error("index {index} is out of range for a collection of length {len}")]
    OutOfRange { index: usize, len: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cannot assign a {operand} to a {target}")]
    InvalidOperands { target: OperandKind, operand: OperandKind },
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("{0}")]
    InvalidValue(String),
    #[error("requested eigenpair {index} has not been computed ({converged} eigenpairs converged)")]
    EigenpairNotComputed { index: usize, converged: usize },
}

impl RbError {
    pub fn unknown_term(term: &str) -> Self {
        RbError::UnsupportedOperation(format!("unknown term \"{term}\""))
    }
}
