/*!
The root dispatcher --- owner of the cube frontier.

# Overview

The root holds the frontier of unexpanded cubes, seeded with the empty path.
Generator threads trade through [exchange](CubeRoot::exchange): each call publishes
the outcome of the previous expansion --- a split literal, a failed-assumption set, or
nothing --- and pulls the next unassigned cube, blocking while the frontier is empty
and some expansion is still in flight.
Should the frontier drain with no expansion in flight, the root path is reseeded;
with everything learned so far ingested, re-expansion either steers into unexplored
space or proves unsatisfiability outright.

Workers trade through [handle_request](CubeRoot::handle_request): a batch is taken
from the frontier when one is available, and the request is queued otherwise, to be
served as soon as an expansion refills the frontier.

# Failed cubes

Failed sets from generators and workers alike pass through the store, which collapses
duplicates by content.
Fresh cubes are appended --- negated, as learned clauses --- to the ingestion buffer of
every generator, and prefix later batches so each worker receives exactly the cubes
it has not seen.

Outcomes are applied in arrival order under the frontier mutex; no call holds two
mutexes at once.
*/

use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex},
};

use crate::{
    cube::{
        comm::{CubeCommunicator, Rank},
        store::{FailedCubeStore, IngestionBuffer},
    },
    misc::log::targets::{self},
    solver::Terminator,
    structures::{Cube, Lit, STREAM_END},
};

/// The outcome of one generator iteration, as published to the root.
#[derive(Default)]
pub struct Expansion {
    /// The cube which was expanded, if any.
    pub cube: Option<Cube>,

    /// A split literal, with `0` read as no split.
    pub split: Lit,

    /// A failed-assumption set restricted to the cube's path.
    pub failed: Option<Vec<Lit>>,
}

struct Frontier {
    /// Unexpanded, unassigned cubes.
    cubes: VecDeque<Cube>,

    /// Expansions currently held by generator threads.
    expanding: usize,

    /// Ranks whose cube requests arrived while the frontier was empty.
    pending: VecDeque<Rank>,
}

/// The dispatcher generators and the communicator trade cubes through.
pub struct CubeRoot {
    frontier: Mutex<Frontier>,
    refill: Condvar,
    store: FailedCubeStore,
    buffers: Mutex<Vec<Arc<IngestionBuffer>>>,
    comm: CubeCommunicator,
    terminator: Arc<Terminator>,
    batch_size: usize,
}

impl CubeRoot {
    pub fn new(comm: CubeCommunicator, terminator: Arc<Terminator>, batch_size: usize) -> Self {
        let mut cubes = VecDeque::new();
        cubes.push_back(Cube::default());

        CubeRoot {
            frontier: Mutex::new(Frontier {
                cubes,
                expanding: 0,
                pending: VecDeque::new(),
            }),
            refill: Condvar::new(),
            store: FailedCubeStore::new(),
            buffers: Mutex::new(Vec::new()),
            comm,
            terminator,
            batch_size: batch_size.max(1),
        }
    }

    /// Registers the ingestion buffer of a generator thread.
    pub fn register_buffer(&self, buffer: Arc<IngestionBuffer>) {
        self.buffers.lock().unwrap().push(buffer);
    }

    /// Publishes the outcome of the previous expansion and pulls the next cube.
    ///
    /// Blocks while the frontier is empty and an expansion is in flight; returns
    /// `None` once interrupted.
    pub fn exchange(&self, outcome: Expansion) -> Option<Cube> {
        if let Some(failed) = outcome.failed {
            self.import_failed(vec![Cube::new(failed)]);
        }

        let mut dispatches = Vec::new();

        let next = {
            let mut frontier = self.frontier.lock().unwrap();

            if outcome.cube.is_some() {
                frontier.expanding -= 1;
            }

            if outcome.split != 0 {
                let parent = outcome.cube.expect("! Split published without a cube");
                log::trace!(target: targets::ROOT, "Split {parent} on {}", outcome.split);

                frontier.cubes.push_back(parent.extended(outcome.split));
                frontier.cubes.push_back(parent.extended(-outcome.split));
                self.refill.notify_all();
            }

            Self::collect_batches(&mut frontier, self.batch_size, &mut dispatches);

            loop {
                if self.terminator.is_interrupted() {
                    break None;
                }

                if let Some(cube) = frontier.cubes.pop_front() {
                    frontier.expanding += 1;
                    break Some(cube);
                }

                if frontier.expanding == 0 {
                    // Exhausted with nothing in flight: regrow from the root path.
                    log::debug!(target: targets::ROOT, "Frontier exhausted, reseeding the root cube");
                    frontier.cubes.push_back(Cube::default());
                    continue;
                }

                frontier = self.refill.wait(frontier).unwrap();
            }
        };

        for (rank, batch) in dispatches {
            self.dispatch_batch(rank, batch);
        }

        next
    }

    /// Serves a worker's cube request, or queues it while the frontier is empty.
    pub fn handle_request(&self, rank: Rank) {
        let batch = {
            let mut frontier = self.frontier.lock().unwrap();

            match Self::take_batch(&mut frontier, self.batch_size) {
                batch if batch.is_empty() => {
                    log::trace!(target: targets::ROOT, "Queued cube request from {rank}");
                    frontier.pending.push_back(rank);
                    None
                }
                batch => Some(batch),
            }
        };

        if let Some(batch) = batch {
            self.dispatch_batch(rank, batch);
        }
    }

    /// Ingests failed cubes returned by a worker.
    pub fn digest_returned_failed(&self, cubes: Vec<Cube>) {
        self.import_failed(cubes);
    }

    /// The number of failed cubes known to the root.
    pub fn failed_count(&self) -> usize {
        self.store.count()
    }

    /// Issues a wakeup to any generator blocked on the frontier.
    pub fn wake(&self) {
        let _frontier = self.frontier.lock().unwrap();
        self.refill.notify_all();
    }

    fn import_failed(&self, cubes: Vec<Cube>) {
        let fresh = self.store.ingest(cubes);
        if fresh.is_empty() {
            return;
        }

        // The clause learned from a failed cube is the negation of its path.
        let mut clauses = Vec::new();
        for cube in &fresh {
            clauses.extend(cube.path().iter().map(|literal| -literal));
            clauses.push(STREAM_END);
        }

        let buffers = self.buffers.lock().unwrap().clone();
        for buffer in buffers {
            buffer.push(&clauses);
        }
    }

    fn take_batch(frontier: &mut Frontier, size: usize) -> Vec<Cube> {
        let mut batch = Vec::new();
        while batch.len() < size {
            match frontier.cubes.pop_front() {
                Some(cube) => batch.push(cube),
                None => break,
            }
        }
        batch
    }

    fn collect_batches(
        frontier: &mut Frontier,
        size: usize,
        dispatches: &mut Vec<(Rank, Vec<Cube>)>,
    ) {
        while !frontier.pending.is_empty() && !frontier.cubes.is_empty() {
            let rank = frontier.pending.pop_front().expect("! Pending vanished");
            let batch = Self::take_batch(frontier, size);
            dispatches.push((rank, batch));
        }
    }

    fn dispatch_batch(&self, rank: Rank, batch: Vec<Cube>) {
        let fresh = self.store.fresh_for(rank);

        log::debug!(
            target: targets::ROOT,
            "Sending {} cubes and {} failed cubes to {rank}",
            batch.len(),
            fresh.len(),
        );

        self.comm.send_cubes(rank, &fresh, &batch);
    }
}
