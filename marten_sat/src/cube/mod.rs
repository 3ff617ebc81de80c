/*!
The cube-and-conquer protocol --- generation, solving, and exchange of cubes.

# Overview

A job solves its formula by splitting the search space into cubes and conquering the
cubes in parallel:

- At the root, [generator](generator) threads expand a frontier of cubes through
  lookahead, each expansion producing two children or a verdict.
- The [root dispatcher](root) owns the frontier, applies generator outcomes in
  arrival order, and hands disjoint batches of cubes to requesting workers.
- Every process runs a [worker](worker) thread which solves its local cubes under
  assumption of their paths, pruning any cube which includes a known failed cube.
- Failed cubes flow back to the root through the [communicator](comm), are
  deduplicated by content in the [store](store), ingested by every generator as
  fresh clauses, and rebroadcast to workers on the front of later batches.

A SAT or UNSAT verdict from any thread lands in the shared [VerdictCell], and the
first verdict wins.
*/

use std::sync::{
    atomic::{AtomicI32, Ordering},
    Mutex,
};

use crate::{solver::SolveReport, structures::Lit};

pub mod comm;
pub mod generator;
pub mod root;
pub mod store;
pub mod worker;

mod engine;
pub use engine::{CubeEngine, CubeSetup};

/// The verdict of a job, shared by every solver thread of an engine.
///
/// The first verdict written wins; later writes are ignored.
#[derive(Default)]
pub struct VerdictCell {
    code: AtomicI32,
    solution: Mutex<Vec<Lit>>,
}

impl VerdictCell {
    /// Records a verdict, unless some verdict has already been recorded.
    ///
    /// Returns true iff the given verdict was recorded.
    pub fn set(&self, report: SolveReport, solution: &[Lit]) -> bool {
        debug_assert!(report.is_decided());

        let won = self
            .code
            .compare_exchange(0, report.code(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if won && !solution.is_empty() {
            *self.solution.lock().unwrap() = solution.to_vec();
        }

        won
    }

    /// The recorded verdict, or unknown.
    pub fn get(&self) -> SolveReport {
        SolveReport::from_code(self.code.load(Ordering::Acquire))
    }

    /// The satisfying assignment accompanying a satisfiable verdict, if any.
    pub fn solution(&self) -> Vec<Lit> {
        self.solution.lock().unwrap().clone()
    }
}
