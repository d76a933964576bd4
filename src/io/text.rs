//! Single-value text files.
use crate::io::{exists_on_io_process, file_path, read_on_io_process, save_on_io_process};
use crate::parallel::Communicator;
use eyre::{eyre, WrapErr};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

fn write_text(comm: &dyn Communicator, path: &Path, content: String) -> eyre::Result<()> {
    save_on_io_process(comm, || {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("failed to create directory {}", parent.display()))?;
        }
        std::fs::write(path, content).wrap_err_with(|| format!("failed to write file {}", path.display()))
    })
}

fn read_text<T>(comm: &dyn Communicator, path: &Path) -> eyre::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let content = read_on_io_process(comm, || {
        std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read file {}", path.display()))
    })?;
    content
        .trim()
        .parse()
        .map_err(|e| eyre!("failed to parse content of {}: {}", path.display(), e))
}

/// Reads and writes `<name>.txt` files holding a single value.
#[derive(Debug, Copy, Clone, Default)]
pub struct TextIo;

impl TextIo {
    pub fn save_file<T: Display>(
        comm: &dyn Communicator,
        content: &T,
        directory: impl AsRef<Path>,
        name: &str,
    ) -> eyre::Result<()> {
        write_text(comm, &file_path(directory, name, "txt"), content.to_string())
    }

    /// Reads the value on the I/O process and broadcasts it.
    pub fn load_file<T>(comm: &dyn Communicator, directory: impl AsRef<Path>, name: &str) -> eyre::Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        read_text(comm, &file_path(directory, name, "txt"))
    }

    pub fn exists_file(comm: &dyn Communicator, directory: impl AsRef<Path>, name: &str) -> eyre::Result<bool> {
        exists_on_io_process(comm, &file_path(directory, name, "txt"))
    }
}

/// Writes the number of elements of a store to `<name>.length`.
pub fn save_length(comm: &dyn Communicator, length: usize, directory: impl AsRef<Path>, name: &str) -> eyre::Result<()> {
    write_text(comm, &file_path(directory, name, "length"), length.to_string())
}

/// Reads the number of elements of a store from `<name>.length` on the I/O process and
/// broadcasts it.
pub fn load_length(comm: &dyn Communicator, directory: impl AsRef<Path>, name: &str) -> eyre::Result<usize> {
    read_text(comm, &file_path(directory, name, "length"))
}
