//! Persistence of finite element functions.
use crate::io::text::TextIo;
use crate::io::{exists_on_io_process, file_path, read_json, save_on_io_process, write_json};
use crate::space::Function;
use eyre::{eyre, WrapErr};
use nalgebra::DVector;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FunctionData {
    dim: usize,
    values: Vec<f64>,
}

impl FunctionData {
    fn from_function(function: &Function) -> Self {
        Self {
            dim: function.space().dim(),
            values: function.vector().iter().copied().collect(),
        }
    }

    fn copy_into(self, function: &mut Function) -> eyre::Result<()> {
        let dim = function.space().dim();
        if self.dim != dim || self.values.len() != dim {
            return Err(eyre!(
                "stored function has {} degrees of freedom, but the target space has {}",
                self.values.len(),
                dim
            ));
        }
        *function.vector_mut() = DVector::from_vec(self.values);
        Ok(())
    }
}

/// Saves a function to `<name>.json` in `directory`.
pub fn function_save(function: &Function, directory: impl AsRef<Path>, name: &str) -> eyre::Result<()> {
    let path = file_path(directory, name, "json");
    write_json(function.space().comm(), &path, &FunctionData::from_function(function))
}

/// Loads a function from `<name>.json` in `directory`.
///
/// Returns `Ok(false)`, leaving `function` untouched, if the file does not exist.
pub fn function_load(function: &mut Function, directory: impl AsRef<Path>, name: &str) -> eyre::Result<bool> {
    let path = file_path(directory, name, "json");
    let comm = function.space().shared_comm();
    match read_json::<FunctionData>(comm.as_ref(), &path)? {
        Some(data) => {
            data.copy_into(function)
                .wrap_err_with(|| format!("failed to load function from {}", path.display()))?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointRecord {
    suffix: usize,
    #[serde(flatten)]
    function: FunctionData,
}

/// Tracks time series of functions written to, or read from, checkpoint files.
///
/// A time series `name` is stored as `<name>_checkpoint.jsonl`, holding one record per time
/// step, and `<name>_suffix.txt`, holding the suffix of the last record written. Time steps must
/// be visited in order: the first access to a series is suffix 0 and every further access is the
/// suffix following the previous one.
#[derive(Debug, Default)]
pub struct CheckpointCache {
    latest_suffix: FxHashMap<PathBuf, usize>,
}

impl CheckpointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last suffix accessed through this cache for the given series, if any.
    pub fn latest_suffix(&self, directory: impl AsRef<Path>, name: &str) -> Option<usize> {
        self.latest_suffix
            .get(&checkpoint_path(directory.as_ref(), name))
            .copied()
    }

    fn check_order(&self, path: &Path, suffix: usize) {
        match self.latest_suffix.get(path) {
            Some(&latest) => assert_eq!(
                latest + 1,
                suffix,
                "Checkpoint suffixes of {} must be accessed in order.",
                path.display()
            ),
            None => assert_eq!(
                suffix,
                0,
                "First access to checkpoint {} must be at suffix 0.",
                path.display()
            ),
        }
    }

    /// Appends `function` as time step `suffix` of the series `name`.
    ///
    /// Saving suffix 0 starts a new series, replacing any existing file. A suffix only counts as
    /// accessed once it has been written, so a failed save can be retried.
    ///
    /// # Panics
    ///
    /// Panics if `suffix` is neither 0 nor the successor of the last suffix accessed.
    pub fn save(
        &mut self,
        function: &Function,
        directory: impl AsRef<Path>,
        name: &str,
        suffix: usize,
    ) -> eyre::Result<()> {
        let directory = directory.as_ref();
        let path = checkpoint_path(directory, name);
        if suffix > 0 {
            self.check_order(&path, suffix);
        }

        let comm = function.space().comm();
        let record = CheckpointRecord {
            suffix,
            function: FunctionData::from_function(function),
        };
        save_on_io_process(comm, || {
            std::fs::create_dir_all(directory)
                .wrap_err_with(|| format!("failed to create directory {}", directory.display()))?;
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(suffix > 0)
                .truncate(suffix == 0)
                .open(&path)
                .wrap_err_with(|| format!("failed to open file {}", path.display()))?;
            let line = serde_json::to_string(&record).wrap_err("failed to serialize checkpoint")?;
            writeln!(file, "{line}").wrap_err_with(|| format!("failed to write file {}", path.display()))
        })?;
        TextIo::save_file(comm, &suffix, directory, &format!("{name}_suffix"))?;
        self.latest_suffix.insert(path, suffix);
        Ok(())
    }

    /// Reads time step `suffix` of the series `name` into `function`.
    ///
    /// Returns `Ok(false)` if the series does not exist or `suffix` has not been written yet.
    ///
    /// # Panics
    ///
    /// Panics if `suffix` is neither 0 nor the successor of the last suffix accessed.
    pub fn load(
        &mut self,
        function: &mut Function,
        directory: impl AsRef<Path>,
        name: &str,
        suffix: usize,
    ) -> eyre::Result<bool> {
        let directory = directory.as_ref();
        let path = checkpoint_path(directory, name);
        let comm = function.space().shared_comm();
        if !exists_on_io_process(comm.as_ref(), &path)? {
            return Ok(false);
        }
        let suffix_name = format!("{name}_suffix");
        if !TextIo::exists_file(comm.as_ref(), directory, &suffix_name)? {
            return Err(eyre!("checkpoint {} has no suffix file", path.display()));
        }
        let last_suffix: usize = TextIo::load_file(comm.as_ref(), directory, &suffix_name)?;
        if suffix > last_suffix {
            return Ok(false);
        }
        self.check_order(&path, suffix);

        let content =
            std::fs::read_to_string(&path).wrap_err_with(|| format!("failed to read file {}", path.display()))?;
        let line = content
            .lines()
            .nth(suffix)
            .ok_or_else(|| eyre!("checkpoint {} has no record for suffix {}", path.display(), suffix))?;
        let record: CheckpointRecord =
            serde_json::from_str(line).wrap_err_with(|| format!("failed to parse file {}", path.display()))?;
        if record.suffix != suffix {
            return Err(eyre!(
                "checkpoint {} is out of order: expected suffix {}, found {}",
                path.display(),
                suffix,
                record.suffix
            ));
        }
        record.function.copy_into(function)?;
        self.latest_suffix.insert(path, suffix);
        Ok(true)
    }
}

fn checkpoint_path(directory: &Path, name: &str) -> PathBuf {
    file_path(directory, &format!("{name}_checkpoint"), "jsonl")
}
