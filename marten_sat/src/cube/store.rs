/*!
Storage of failed cubes at the root, and the ingestion buffers of the generators.

# The store

[FailedCubeStore] is the many-to-many shared state of a job: workers produce failed
cubes, generator drains and worker batches consume them.
Cubes are deduplicated by content --- the canonical (sorted) path keys a set --- so a
set returned by several workers, or returned repeatedly before its acknowledgement,
collapses to one entry.
Per-destination cursors track how much of the store each worker has been sent, so a
batch prefix carries exactly the cubes its destination has not seen.

# The buffers

Each generator thread owns an [IngestionBuffer]: a flat sentinel-terminated literal
stream behind one mutex, appended by the root when fresh failed cubes arrive and
drained by the generator at the top of each iteration.
*/

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use crate::{
    cube::comm::Rank,
    misc::log::targets::{self},
    structures::{Cube, Lit},
};

/// The failed cubes known to the root, deduplicated by content.
#[derive(Default)]
pub struct FailedCubeStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    /// Failed cubes in arrival order.
    failed: Vec<Cube>,

    /// Canonical paths of every stored cube.
    seen: HashSet<Vec<Lit>>,

    /// How many stored cubes each destination has been sent.
    cursors: HashMap<Rank, usize>,
}

impl FailedCubeStore {
    pub fn new() -> Self {
        FailedCubeStore::default()
    }

    /// Stores the given cubes, returning those not already known.
    pub fn ingest(&self, cubes: Vec<Cube>) -> Vec<Cube> {
        let mut inner = self.inner.lock().unwrap();

        let mut fresh = Vec::new();
        for cube in cubes {
            if inner.seen.insert(cube.canonical()) {
                inner.failed.push(cube.clone());
                fresh.push(cube);
            }
        }

        if !fresh.is_empty() {
            log::debug!(
                target: targets::STORE,
                "Stored {} fresh failed cubes, {} known",
                fresh.len(),
                inner.failed.len(),
            );
        }

        fresh
    }

    /// The stored cubes the destination has not been sent, advancing its cursor.
    pub fn fresh_for(&self, destination: Rank) -> Vec<Cube> {
        let mut inner = self.inner.lock().unwrap();

        let sent = inner.cursors.get(&destination).copied().unwrap_or(0);
        let fresh = inner.failed[sent..].to_vec();
        let known = inner.failed.len();
        inner.cursors.insert(destination, known);

        fresh
    }

    /// The number of stored cubes.
    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().failed.len()
    }
}

/// The new-failed-cube buffer of one generator thread.
///
/// A flat literal stream in which each clause is terminated by the sentinel, guarded
/// by a single mutex.
/// The root fills the buffer with the *negations* of fresh failed cubes, so a drain
/// feeds straight into a solver's clause input.
#[derive(Default)]
pub struct IngestionBuffer {
    stream: Mutex<Vec<Lit>>,
}

impl IngestionBuffer {
    pub fn new() -> Self {
        IngestionBuffer::default()
    }

    /// Appends a clause stream to the buffer.
    pub fn push(&self, clauses: &[Lit]) {
        self.stream.lock().unwrap().extend_from_slice(clauses);
    }

    /// Takes the buffered stream, leaving the buffer empty.
    pub fn drain(&self) -> Vec<Lit> {
        std::mem::take(&mut *self.stream.lock().unwrap())
    }
}

#[cfg(test)]
mod store_tests {
    use super::*;

    #[test]
    fn duplicates_collapse() {
        let store = FailedCubeStore::new();

        let fresh = store.ingest(vec![Cube::new(vec![1, 2]), Cube::new(vec![2, 1])]);
        assert_eq!(fresh.len(), 1);

        let fresh = store.ingest(vec![Cube::new(vec![1, 2])]);
        assert!(fresh.is_empty());

        assert_eq!(store.count(), 1);
    }

    #[test]
    fn cursors_never_resend() {
        let store = FailedCubeStore::new();

        store.ingest(vec![Cube::new(vec![1])]);
        assert_eq!(store.fresh_for(3).len(), 1);
        assert!(store.fresh_for(3).is_empty());

        store.ingest(vec![Cube::new(vec![2])]);
        assert_eq!(store.fresh_for(3).len(), 1);

        // A destination not yet served receives the full store.
        assert_eq!(store.fresh_for(7).len(), 2);
    }

    #[test]
    fn buffer_drains_to_empty() {
        let buffer = IngestionBuffer::new();

        buffer.push(&[-1, 2, 0]);
        assert_eq!(buffer.drain(), vec![-1, 2, 0]);
        assert!(buffer.drain().is_empty());
    }
}
