//! Assembled full-order tensors.
use crate::error::RbError;
use crate::operand::Operand;
use crate::parallel::{self, Communicator};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use rbnics_traits::LinearCombination;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An assembled operator (sparse matrix) or functional (vector).
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    Matrix(CsrMatrix<f64>),
    Vector(DVector<f64>),
}

/// Shape of a [`Tensor`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TensorShape {
    Matrix { nrows: usize, ncols: usize },
    Vector { len: usize },
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TensorShape::Matrix { nrows, ncols } => write!(f, "{nrows}x{ncols} matrix"),
            TensorShape::Vector { len } => write!(f, "vector of length {len}"),
        }
    }
}

impl From<CsrMatrix<f64>> for Tensor {
    fn from(matrix: CsrMatrix<f64>) -> Self {
        Tensor::Matrix(matrix)
    }
}

impl From<DVector<f64>> for Tensor {
    fn from(vector: DVector<f64>) -> Self {
        Tensor::Vector(vector)
    }
}

impl Tensor {
    pub fn shape(&self) -> TensorShape {
        match self {
            Tensor::Matrix(matrix) => TensorShape::Matrix {
                nrows: matrix.nrows(),
                ncols: matrix.ncols(),
            },
            Tensor::Vector(vector) => TensorShape::Vector { len: vector.len() },
        }
    }

    pub fn as_matrix(&self) -> Option<&CsrMatrix<f64>> {
        match self {
            Tensor::Matrix(matrix) => Some(matrix),
            Tensor::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&DVector<f64>> {
        match self {
            Tensor::Matrix(_) => None,
            Tensor::Vector(vector) => Some(vector),
        }
    }
}

impl LinearCombination for Tensor {
    fn scaled(&self, alpha: f64) -> Self {
        match self {
            Tensor::Matrix(matrix) => Tensor::Matrix(matrix.scaled(alpha)),
            Tensor::Vector(vector) => Tensor::Vector(vector.scaled(alpha)),
        }
    }

    fn add_scaled(&mut self, alpha: f64, other: &Self) {
        match (self, other) {
            (Tensor::Matrix(a), Tensor::Matrix(b)) => a.add_scaled(alpha, b),
            (Tensor::Vector(a), Tensor::Vector(b)) => a.add_scaled(alpha, b),
            (a, b) => panic!("Cannot combine a {} with a {}.", a.shape(), b.shape()),
        }
    }
}

/// On-disk representation of a [`Tensor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum TensorData {
    Matrix {
        nrows: usize,
        ncols: usize,
        row_offsets: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<f64>,
    },
    Vector {
        values: Vec<f64>,
    },
}

impl From<&Tensor> for TensorData {
    fn from(tensor: &Tensor) -> Self {
        match tensor {
            Tensor::Matrix(matrix) => TensorData::Matrix {
                nrows: matrix.nrows(),
                ncols: matrix.ncols(),
                row_offsets: matrix.row_offsets().to_vec(),
                col_indices: matrix.col_indices().to_vec(),
                values: matrix.values().to_vec(),
            },
            Tensor::Vector(vector) => TensorData::Vector {
                values: vector.iter().copied().collect(),
            },
        }
    }
}

impl TryFrom<TensorData> for Tensor {
    type Error = eyre::Report;

    fn try_from(data: TensorData) -> eyre::Result<Self> {
        match data {
            TensorData::Matrix {
                nrows,
                ncols,
                row_offsets,
                col_indices,
                values,
            } => {
                let matrix = CsrMatrix::try_from_csr_data(nrows, ncols, row_offsets, col_indices, values)
                    .map_err(|e| eyre::eyre!("invalid CSR data: {}", e))?;
                Ok(Tensor::Matrix(matrix))
            }
            TensorData::Vector { values } => Ok(Tensor::Vector(DVector::from_vec(values))),
        }
    }
}

/// Location of the entry of largest magnitude found by [`abs_max`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbsLocation {
    Matrix { row: usize, col: usize },
    Vector { index: usize },
    /// A degree of freedom of a function, with the component it belongs to (if any).
    Function { dof: usize, component: Option<String> },
}

impl fmt::Display for AbsLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AbsLocation::Matrix { row, col } => write!(f, "({row}, {col})"),
            AbsLocation::Vector { index } => write!(f, "{index}"),
            AbsLocation::Function { dof, component: None } => write!(f, "dof {dof}"),
            AbsLocation::Function {
                dof,
                component: Some(component),
            } => write!(f, "dof {dof} at component {component}"),
        }
    }
}

/// The entry of largest magnitude (with its sign) and where it was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsOutput {
    pub value: f64,
    pub location: AbsLocation,
}

fn local_abs_max(values: impl Iterator<Item = (f64, AbsLocation)>) -> Option<(f64, AbsLocation)> {
    let mut result: Option<(f64, AbsLocation)> = None;
    for (value, location) in values {
        if result
            .as_ref()
            .map_or(true, |(current, _)| value.abs() > current.abs())
        {
            result = Some((value, location));
        }
    }
    result
}

/// Finds the entry of largest magnitude of a matrix, vector or function across all ranks.
///
/// This is the search step of empirical interpolation. Ties keep the first occurrence.
/// Functions are searched over the degrees of freedom owned by the calling process.
///
/// # Panics
///
/// Panics if the operand has no entries on any rank.
pub fn abs_max(operand: Operand, comm: &dyn Communicator) -> eyre::Result<AbsOutput> {
    let local = match operand {
        Operand::Matrix(matrix) => local_abs_max(
            matrix
                .triplet_iter()
                .map(|(row, col, &value)| (value, AbsLocation::Matrix { row, col })),
        ),
        Operand::Vector(vector) => local_abs_max(
            vector
                .iter()
                .enumerate()
                .map(|(index, &value)| (value, AbsLocation::Vector { index })),
        ),
        Operand::Function(function) => {
            let space = function.space();
            local_abs_max(space.ownership_range().map(|dof| {
                let component = space.component_of(dof).map(str::to_string);
                (function.vector()[dof], AbsLocation::Function { dof, component })
            }))
        }
        other => {
            return Err(RbError::InvalidArgument(format!("cannot compute the maximum absolute entry of a {}", other.kind())).into())
        }
    };
    let (value, location) =
        parallel::parallel_max(comm, local)?.expect("Cannot search for the maximum of an empty tensor.");
    Ok(AbsOutput { value, location })
}
