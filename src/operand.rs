//! Tagged references to the algebraic objects of the offline and online stages.
//!
//! Operations that accept several kinds of objects (assignment, projection through a basis,
//! export, max-abs search) dispatch on the kind of their operands. The set of kinds is closed, so
//! the dispatch is a plain `match`.
use crate::functions_list::FunctionsList;
use crate::online::{OnlineFunction, OnlineMatrix, OnlineVector};
use crate::space::Function;
use crate::tensor::Tensor;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;
use std::fmt;

/// The kind of an algebraic object.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Function,
    Vector,
    Matrix,
    FunctionsList,
    OnlineFunction,
    OnlineVector,
    OnlineMatrix,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            OperandKind::Function => "function",
            OperandKind::Vector => "vector",
            OperandKind::Matrix => "matrix",
            OperandKind::FunctionsList => "functions list",
            OperandKind::OnlineFunction => "online function",
            OperandKind::OnlineVector => "online vector",
            OperandKind::OnlineMatrix => "online matrix",
        };
        write!(f, "{name}")
    }
}

/// A shared reference to an algebraic object.
#[derive(Debug, Copy, Clone)]
pub enum Operand<'a> {
    Function(&'a Function),
    Vector(&'a DVector<f64>),
    Matrix(&'a CsrMatrix<f64>),
    FunctionsList(&'a FunctionsList),
    OnlineFunction(&'a OnlineFunction),
    OnlineVector(&'a OnlineVector),
    OnlineMatrix(&'a OnlineMatrix),
}

/// A mutable reference to an algebraic object.
#[derive(Debug)]
pub enum OperandMut<'a> {
    Function(&'a mut Function),
    Vector(&'a mut DVector<f64>),
    Matrix(&'a mut CsrMatrix<f64>),
    FunctionsList(&'a mut FunctionsList),
    OnlineFunction(&'a mut OnlineFunction),
    OnlineVector(&'a mut OnlineVector),
    OnlineMatrix(&'a mut OnlineMatrix),
}

impl<'a> Operand<'a> {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::Function(_) => OperandKind::Function,
            Operand::Vector(_) => OperandKind::Vector,
            Operand::Matrix(_) => OperandKind::Matrix,
            Operand::FunctionsList(_) => OperandKind::FunctionsList,
            Operand::OnlineFunction(_) => OperandKind::OnlineFunction,
            Operand::OnlineVector(_) => OperandKind::OnlineVector,
            Operand::OnlineMatrix(_) => OperandKind::OnlineMatrix,
        }
    }
}

impl<'a> OperandMut<'a> {
    pub fn kind(&self) -> OperandKind {
        match self {
            OperandMut::Function(_) => OperandKind::Function,
            OperandMut::Vector(_) => OperandKind::Vector,
            OperandMut::Matrix(_) => OperandKind::Matrix,
            OperandMut::FunctionsList(_) => OperandKind::FunctionsList,
            OperandMut::OnlineFunction(_) => OperandKind::OnlineFunction,
            OperandMut::OnlineVector(_) => OperandKind::OnlineVector,
            OperandMut::OnlineMatrix(_) => OperandKind::OnlineMatrix,
        }
    }
}

macro_rules! impl_operand_from {
    ($($variant:ident => $ty:ty),*) => {
        $(
            impl<'a> From<&'a $ty> for Operand<'a> {
                fn from(value: &'a $ty) -> Self {
                    Operand::$variant(value)
                }
            }

            impl<'a> From<&'a mut $ty> for OperandMut<'a> {
                fn from(value: &'a mut $ty) -> Self {
                    OperandMut::$variant(value)
                }
            }
        )*
    };
}

impl_operand_from!(
    Function => Function,
    Vector => DVector<f64>,
    Matrix => CsrMatrix<f64>,
    FunctionsList => FunctionsList,
    OnlineFunction => OnlineFunction,
    OnlineVector => OnlineVector,
    OnlineMatrix => OnlineMatrix
);

impl<'a> From<&'a Tensor> for Operand<'a> {
    fn from(tensor: &'a Tensor) -> Self {
        match tensor {
            Tensor::Matrix(matrix) => Operand::Matrix(matrix),
            Tensor::Vector(vector) => Operand::Vector(vector),
        }
    }
}

impl<'a> From<&'a mut Tensor> for OperandMut<'a> {
    fn from(tensor: &'a mut Tensor) -> Self {
        match tensor {
            Tensor::Matrix(matrix) => OperandMut::Matrix(matrix),
            Tensor::Vector(vector) => OperandMut::Vector(vector),
        }
    }
}
