//! Persistence of stores, tensors and tabular data.
//!
//! All writers follow a single-writer discipline: the I/O process (see
//! [`is_io_process`](crate::parallel::is_io_process)) performs the write, and the outcome is then
//! broadcast so that every process returns only after the file is complete, with the same result.
//! Values whose agreement across processes matters (lengths, existence checks) are read once
//! on the I/O process and broadcast.
use crate::parallel::{self, Communicator, IO_RANK};
use eyre::{eyre, WrapErr};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod csv;
pub mod export;
pub mod function;
pub mod tensor;
pub mod text;

pub use self::csv::CsvIo;
pub use self::text::{load_length, save_length, TextIo};

/// Joins `directory` and `name`, appending `extension` unless `name` already carries it.
pub fn file_path(directory: impl AsRef<Path>, name: &str, extension: &str) -> PathBuf {
    let suffix = format!(".{extension}");
    if name.ends_with(&suffix) {
        directory.as_ref().join(name)
    } else {
        directory.as_ref().join(format!("{name}{suffix}"))
    }
}

fn report_to_string(report: &eyre::Report) -> String {
    report.chain().map(|cause| cause.to_string()).join(": ")
}

/// Runs `write` on the I/O process and synchronizes every process on its outcome.
pub fn save_on_io_process<F>(comm: &dyn Communicator, write: F) -> eyre::Result<()>
where
    F: FnOnce() -> eyre::Result<()>,
{
    read_on_io_process(comm, write)
}

/// Runs `read` on the I/O process and broadcasts its result to every process.
pub fn read_on_io_process<T, F>(comm: &dyn Communicator, read: F) -> eyre::Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> eyre::Result<T>,
{
    let outcome = if parallel::is_io_process(comm) {
        Some(read().map_err(|report| report_to_string(&report)))
    } else {
        None
    };
    parallel::broadcast::<Result<T, String>>(comm, IO_RANK, outcome)?.map_err(|message| eyre!(message))
}

/// Checks on the I/O process whether `path` exists, and broadcasts the answer.
pub fn exists_on_io_process(comm: &dyn Communicator, path: &Path) -> eyre::Result<bool> {
    read_on_io_process(comm, || Ok(path.exists()))
}

/// Writes `value` as JSON to `path`, creating parent directories as needed.
pub(crate) fn write_json<T: Serialize>(comm: &dyn Communicator, path: &Path, value: &T) -> eyre::Result<()> {
    save_on_io_process(comm, || {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_string(value).wrap_err("failed to serialize data")?;
        std::fs::write(path, json).wrap_err_with(|| format!("failed to write file {}", path.display()))?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    })
}

/// Reads JSON from `path` on the calling process. Returns `None` if the file does not exist.
pub(crate) fn read_json<T: DeserializeOwned>(comm: &dyn Communicator, path: &Path) -> eyre::Result<Option<T>> {
    if !exists_on_io_process(comm, path)? {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read file {}", path.display()))?;
    let value = serde_json::from_str(&json).wrap_err_with(|| format!("failed to parse file {}", path.display()))?;
    log::debug!("Read {}", path.display());
    Ok(Some(value))
}
