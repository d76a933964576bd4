//! Export and import of solutions.
use crate::error::RbError;
use crate::io::function::{function_load, function_save};
use crate::io::tensor::{tensor_load, tensor_save};
use crate::operand::{Operand, OperandMut};
use crate::parallel::Communicator;
use crate::tensor::Tensor;
use eyre::eyre;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Whether export and import touch the disk.
///
/// Speedup analysis times repeated online solves and suppresses persistence while doing so.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persistence {
    #[default]
    Enabled,
    Suppressed,
}

/// Exports a function, vector or matrix to `<name>.json` in `directory`.
///
/// Does nothing when persistence is suppressed.
pub fn export(
    solution: Operand,
    comm: &dyn Communicator,
    directory: impl AsRef<Path>,
    name: &str,
    persistence: Persistence,
) -> eyre::Result<()> {
    if persistence == Persistence::Suppressed {
        return Ok(());
    }
    match solution {
        Operand::Function(function) => function_save(function, directory, name),
        Operand::Vector(vector) => tensor_save(&Tensor::Vector(vector.clone()), comm, directory, name),
        Operand::Matrix(matrix) => tensor_save(&Tensor::Matrix(matrix.clone()), comm, directory, name),
        other => Err(RbError::InvalidArgument(format!("cannot export a {}", other.kind())).into()),
    }
}

/// Imports a function, vector or matrix previously written by [`export`].
///
/// Returns `Ok(false)` if the file does not exist, or without touching the disk when
/// persistence is suppressed.
pub fn import_solution(
    solution: OperandMut,
    comm: &dyn Communicator,
    directory: impl AsRef<Path>,
    name: &str,
    persistence: Persistence,
) -> eyre::Result<bool> {
    if persistence == Persistence::Suppressed {
        return Ok(false);
    }
    match solution {
        OperandMut::Function(function) => function_load(function, directory, name),
        OperandMut::Vector(vector) => match tensor_load(comm, directory, name)? {
            Some(Tensor::Vector(loaded)) if loaded.len() == vector.len() => {
                *vector = loaded;
                Ok(true)
            }
            Some(loaded) => Err(eyre!("cannot import a {} into a vector of length {}", loaded.shape(), vector.len())),
            None => Ok(false),
        },
        OperandMut::Matrix(matrix) => match tensor_load(comm, directory, name)? {
            Some(Tensor::Matrix(loaded)) if loaded.nrows() == matrix.nrows() && loaded.ncols() == matrix.ncols() => {
                *matrix = loaded;
                Ok(true)
            }
            Some(loaded) => Err(eyre!(
                "cannot import a {} into a {}x{} matrix",
                loaded.shape(),
                matrix.nrows(),
                matrix.ncols()
            )),
            None => Ok(false),
        },
        other => Err(RbError::InvalidArgument(format!("cannot import a {}", other.kind())).into()),
    }
}
