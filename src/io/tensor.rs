//! Persistence of assembled tensors.
use crate::io::{file_path, read_json, write_json};
use crate::parallel::Communicator;
use crate::tensor::{Tensor, TensorData};
use eyre::WrapErr;
use std::path::Path;

/// Saves a tensor to `<name>.json` in `directory`.
pub fn tensor_save(tensor: &Tensor, comm: &dyn Communicator, directory: impl AsRef<Path>, name: &str) -> eyre::Result<()> {
    write_json(comm, &file_path(directory, name, "json"), &TensorData::from(tensor))
}

/// Loads a tensor from `<name>.json` in `directory`. Returns `None` if the file does not exist.
pub fn tensor_load(comm: &dyn Communicator, directory: impl AsRef<Path>, name: &str) -> eyre::Result<Option<Tensor>> {
    let path = file_path(directory, name, "json");
    read_json::<TensorData>(comm, &path)?
        .map(|data| Tensor::try_from(data).wrap_err_with(|| format!("failed to load tensor from {}", path.display())))
        .transpose()
}
