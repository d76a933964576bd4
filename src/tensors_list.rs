//! Ordered collections of assembled tensors.
use crate::error::RbError;
use crate::io::tensor::{tensor_load, tensor_save};
use crate::io::{load_length, save_length};
use crate::parallel::Communicator;
use crate::tensor::{Tensor, TensorShape};
use eyre::eyre;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Anything that can be appended to a [`TensorsList`].
pub trait TensorSource {
    fn append_to(self, tensors: &mut Vec<Tensor>);
}

impl TensorSource for Tensor {
    fn append_to(self, tensors: &mut Vec<Tensor>) {
        tensors.push(self);
    }
}

impl TensorSource for &Tensor {
    fn append_to(self, tensors: &mut Vec<Tensor>) {
        tensors.push(self.clone());
    }
}

impl TensorSource for &[Tensor] {
    fn append_to(self, tensors: &mut Vec<Tensor>) {
        tensors.extend_from_slice(self);
    }
}

impl<const N: usize> TensorSource for &[Tensor; N] {
    fn append_to(self, tensors: &mut Vec<Tensor>) {
        self.as_slice().append_to(tensors)
    }
}

impl<const N: usize> TensorSource for [&Tensor; N] {
    fn append_to(self, tensors: &mut Vec<Tensor>) {
        tensors.extend(self.into_iter().cloned());
    }
}

impl TensorSource for Vec<Tensor> {
    fn append_to(self, tensors: &mut Vec<Tensor>) {
        tensors.extend(self);
    }
}

impl TensorSource for &Vec<Tensor> {
    fn append_to(self, tensors: &mut Vec<Tensor>) {
        self.as_slice().append_to(tensors)
    }
}

impl TensorSource for Vec<&Tensor> {
    fn append_to(self, tensors: &mut Vec<Tensor>) {
        tensors.extend(self.into_iter().cloned());
    }
}

impl TensorSource for &TensorsList {
    fn append_to(self, tensors: &mut Vec<Tensor>) {
        self.tensors.as_slice().append_to(tensors)
    }
}

/// An ordered, append-only collection of tensors of a common shape.
///
/// Used to store snapshots of operators and right-hand sides, for instance for the empirical
/// interpolation of a non-affine term.
pub struct TensorsList {
    comm: Arc<dyn Communicator>,
    tensors: Vec<Tensor>,
}

impl fmt::Debug for TensorsList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorsList")
            .field("len", &self.tensors.len())
            .field("shape", &self.shape())
            .finish()
    }
}

impl TensorsList {
    pub fn new(comm: Arc<dyn Communicator>) -> Self {
        Self {
            comm,
            tensors: Vec::new(),
        }
    }

    /// The shape shared by every tensor of the list, if the list is not empty.
    pub fn shape(&self) -> Option<TensorShape> {
        self.tensors.first().map(Tensor::shape)
    }

    /// Appends a single tensor or a collection of tensors, copying borrowed ones.
    ///
    /// # Panics
    ///
    /// Panics if a tensor does not have the shape of the tensors already stored.
    pub fn enrich(&mut self, source: impl TensorSource) {
        let mut tensors = Vec::new();
        source.append_to(&mut tensors);
        for tensor in tensors {
            if let Some(shape) = self.shape() {
                assert_eq!(
                    tensor.shape(),
                    shape,
                    "Cannot store a {} in a list of {}.",
                    tensor.shape(),
                    shape
                );
            }
            self.tensors.push(tensor);
        }
    }

    pub fn clear(&mut self) {
        self.tensors.clear();
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Tensor, RbError> {
        self.tensors.get(index).ok_or(RbError::OutOfRange {
            index,
            len: self.tensors.len(),
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tensor> {
        self.tensors.iter()
    }

    /// Writes `<name>.length` and one file `<name>_<i>` per tensor.
    pub fn save(&self, directory: impl AsRef<Path>, name: &str) -> eyre::Result<()> {
        let directory = directory.as_ref();
        save_length(self.comm.as_ref(), self.len(), directory, name)?;
        for (index, tensor) in self.tensors.iter().enumerate() {
            tensor_save(tensor, self.comm.as_ref(), directory, &format!("{name}_{index}"))?;
        }
        log::info!("Saved {} tensors to {}", self.len(), directory.join(name).display());
        Ok(())
    }

    /// Restores a list written by [`save`](TensorsList::save).
    ///
    /// Returns `Ok(false)` without reading anything if the list is not empty.
    pub fn load(&mut self, directory: impl AsRef<Path>, name: &str) -> eyre::Result<bool> {
        if !self.is_empty() {
            return Ok(false);
        }
        let directory = directory.as_ref();
        let len = load_length(self.comm.as_ref(), directory, name)?;
        let mut loaded = Vec::with_capacity(len);
        for index in 0..len {
            let element_name = format!("{name}_{index}");
            let tensor = tensor_load(self.comm.as_ref(), directory, &element_name)?
                .ok_or_else(|| eyre!("missing tensor {} in {}", element_name, directory.display()))?;
            if let Some(first) = loaded.first().map(Tensor::shape) {
                if tensor.shape() != first {
                    return Err(eyre!("tensor {} is a {}, expected a {}", element_name, tensor.shape(), first));
                }
            }
            loaded.push(tensor);
        }
        self.tensors = loaded;
        log::info!("Loaded {} tensors from {}", len, directory.join(name).display());
        Ok(true)
    }
}

impl<'a> IntoIterator for &'a TensorsList {
    type Item = &'a Tensor;
    type IntoIter = std::slice::Iter<'a, Tensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
