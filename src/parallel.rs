//! Collective communication helpers.
//!
//! The reduced basis layer runs in a distributed data-parallel setting: every process owns a
//! part of the degrees of freedom and all coordination happens through collectives. Files are
//! written by a single I/O process, and values that must agree across processes (lengths,
//! existence checks, maxima) are computed once and broadcast.
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

pub use rbnics_traits::Communicator;

/// The rank that performs file I/O.
pub const IO_RANK: usize = 0;

/// Returns `true` on the process responsible for file I/O.
pub fn is_io_process(comm: &dyn Communicator) -> bool {
    comm.rank() == IO_RANK
}

/// A communicator consisting of the calling process only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn group_id(&self) -> usize {
        0
    }

    fn barrier(&self) {}

    fn broadcast_bytes(&self, root: usize, bytes: Vec<u8>) -> Vec<u8> {
        assert_eq!(root, 0, "Root must be a valid rank.");
        bytes
    }

    fn all_gather_bytes(&self, bytes: Vec<u8>) -> Vec<Vec<u8>> {
        vec![bytes]
    }
}

/// Convenience constructor for a shared serial communicator.
pub fn serial() -> Arc<dyn Communicator> {
    Arc::new(SerialCommunicator)
}

static NEXT_GROUP_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Debug)]
struct LocalGroup {
    id: usize,
    size: usize,
    barrier: Barrier,
    slots: Mutex<Vec<Vec<u8>>>,
}

/// A communicator whose ranks are threads of the current process.
///
/// Each handle represents one rank and is meant to be moved to its own thread. This makes it
/// possible to exercise the single-writer/broadcast discipline of the persistence layer without
/// an MPI installation.
#[derive(Debug, Clone)]
pub struct LocalCommunicator {
    rank: usize,
    group: Arc<LocalGroup>,
}

impl LocalCommunicator {
    /// Creates the handles of a new communicator with `size` ranks, ordered by rank.
    pub fn group(size: usize) -> Vec<LocalCommunicator> {
        assert!(size > 0, "A communicator needs at least one rank.");
        let group = Arc::new(LocalGroup {
            id: NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed),
            size,
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![Vec::new(); size]),
        });
        (0..size)
            .map(|rank| LocalCommunicator {
                rank,
                group: Arc::clone(&group),
            })
            .collect()
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.group.size
    }

    fn group_id(&self) -> usize {
        self.group.id
    }

    fn barrier(&self) {
        self.group.barrier.wait();
    }

    fn broadcast_bytes(&self, root: usize, bytes: Vec<u8>) -> Vec<u8> {
        assert!(root < self.group.size, "Root must be a valid rank.");
        if self.rank == root {
            self.group.slots.lock()[root] = bytes;
        }
        self.group.barrier.wait();
        let received = self.group.slots.lock()[root].clone();
        // Nobody may overwrite the slot before every rank has read it
        self.group.barrier.wait();
        received
    }

    fn all_gather_bytes(&self, bytes: Vec<u8>) -> Vec<Vec<u8>> {
        self.group.slots.lock()[self.rank] = bytes;
        self.group.barrier.wait();
        let received = self.group.slots.lock().clone();
        self.group.barrier.wait();
        received
    }
}

/// Broadcasts a value from `root` to every rank.
///
/// # Panics
///
/// Panics if `value` is `None` on the root rank.
pub fn broadcast<T>(comm: &dyn Communicator, root: usize, value: Option<T>) -> eyre::Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let bytes = if comm.rank() == root {
        let value = value.unwrap_or_else(|| panic!("Root rank {root} must provide a value to broadcast."));
        serde_json::to_vec(&value)?
    } else {
        Vec::new()
    };
    let received = comm.broadcast_bytes(root, bytes);
    Ok(serde_json::from_slice(&received)?)
}

/// Gathers one value from every rank, ordered by rank, on every rank.
pub fn all_gather<T>(comm: &dyn Communicator, value: &T) -> eyre::Result<Vec<T>>
where
    T: Serialize + DeserializeOwned,
{
    comm.all_gather_bytes(serde_json::to_vec(value)?)
        .iter()
        .map(|bytes| -> eyre::Result<T> { Ok(serde_json::from_slice(bytes)?) })
        .collect()
}

/// Finds the value of largest magnitude across ranks, together with its location.
///
/// Ranks without a local candidate pass `None`. Ties are resolved in favor of the lowest rank.
/// Returns `None` if no rank provided a candidate.
pub fn parallel_max<L>(comm: &dyn Communicator, local: Option<(f64, L)>) -> eyre::Result<Option<(f64, L)>>
where
    L: Serialize + DeserializeOwned,
{
    let candidates = all_gather(comm, &local)?;
    let mut result: Option<(f64, L)> = None;
    for (value, location) in candidates.into_iter().flatten() {
        let is_larger = match &result {
            Some((current, _)) => value.abs() > current.abs(),
            None => true,
        };
        if is_larger {
            result = Some((value, location));
        }
    }
    Ok(result)
}
