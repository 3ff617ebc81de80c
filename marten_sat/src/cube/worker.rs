/*!
The cube worker --- a background thread which conquers local cubes.

# State machine

```none
IDLING --start--> WAITING
WAITING --begin_communication--> REQUESTING      (requests cubes)
REQUESTING --digest_send_cubes--> WORKING        (cubes received)
WORKING --solve loop--> FAILED | SOLVED
FAILED --begin_communication--> RETURNING        (returns failed cubes)
RETURNING --digest_failed_ack--> WAITING         (ack received; failed buffer cleared)
SOLVED --(sink)
any --interrupt--> terminating
```

The worker's state, local cubes, and failed cubes form one bundle behind a single
mutex, with a condition variable waking the thread on `WORKING ∨ interrupted`.
All communication happens on the event thread: `begin_communication` dispatches
exactly one message per entry --- a cube request from WAITING, or the failed cubes
from FAILED --- and the digest methods apply the root's replies.

# Solving

For each local cube the worker first checks the pruning condition --- a cube which
includes a known failed cube is skipped --- and otherwise solves under assumption of
the cube's path.
SAT settles the job.
UNSAT with a nonempty core records the core as a failed cube and continues.
UNSAT with an empty core means the formula itself is unsatisfiable, settling the
job.
UNKNOWN means the solve was interrupted, and the interruptor owns the next state.
*/

use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::{
    cube::{comm::CubeCommunicator, VerdictCell},
    misc::log::targets::{self},
    misc::Timer,
    solver::{Engine, SolveReport, Terminator},
    structures::{Cube, Lit},
};

/// The states of a cube worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Fresh, the worker thread has not begun.
    Idling,

    /// Out of cubes, ready to request a batch.
    Waiting,

    /// A cube request is in flight.
    Requesting,

    /// Local cubes are available and the worker thread is solving them.
    Working,

    /// Failed cubes are in flight to the root.
    Returning,

    /// A verdict was reached while solving.
    Solved,

    /// Every local cube failed, ready to return the failed cubes.
    Failed,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idling => write!(f, "IDLING"),
            Self::Waiting => write!(f, "WAITING"),
            Self::Requesting => write!(f, "REQUESTING"),
            Self::Working => write!(f, "WORKING"),
            Self::Returning => write!(f, "RETURNING"),
            Self::Solved => write!(f, "SOLVED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// The bundle guarded by the worker's state mutex.
struct WorkerBundle {
    state: WorkerState,
    local_cubes: Vec<Cube>,
    failed_cubes: Vec<Cube>,

    /// The moment the last request or return was dispatched.
    time_of_last_message: f64,

    /// Total seconds spent with a message in flight.
    time_waiting_for_messages: f64,
}

struct WorkerShared {
    bundle: Mutex<WorkerBundle>,
    signal: Condvar,
    terminator: Arc<Terminator>,
    verdict: Arc<VerdictCell>,
    timer: Timer,
}

/// A cube worker: the shared bundle and the solving thread.
pub struct CubeWorker {
    shared: Arc<WorkerShared>,
    formula: Arc<Vec<Lit>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CubeWorker {
    pub fn new(
        formula: Arc<Vec<Lit>>,
        terminator: Arc<Terminator>,
        verdict: Arc<VerdictCell>,
        timer: Timer,
    ) -> Self {
        CubeWorker {
            shared: Arc::new(WorkerShared {
                bundle: Mutex::new(WorkerBundle {
                    state: WorkerState::Idling,
                    local_cubes: Vec::new(),
                    failed_cubes: Vec::new(),
                    time_of_last_message: 0.0,
                    time_waiting_for_messages: 0.0,
                }),
                signal: Condvar::new(),
                terminator,
                verdict,
                timer,
            }),
            formula,
            handle: Mutex::new(None),
        }
    }

    /// Reads the formula into a fresh solver and spawns the worker thread.
    pub fn start(&self) {
        let mut solver = Engine::new();
        solver.connect_terminator(self.shared.terminator.clone());

        for literal in self.formula.iter() {
            solver.add_literal(*literal);
        }

        let shared = self.shared.clone();
        let handle = std::thread::spawn(move || main_loop(shared, solver));

        *self.handle.lock().unwrap() = Some(handle);
    }

    /// The current state of the worker.
    pub fn state(&self) -> WorkerState {
        self.shared.bundle.lock().unwrap().state
    }

    /// True iff the worker has a message to dispatch.
    pub fn wants_to_communicate(&self) -> bool {
        matches!(self.state(), WorkerState::Waiting | WorkerState::Failed)
    }

    /// Dispatches exactly one message, as the current state requires.
    pub fn begin_communication(&self, comm: &CubeCommunicator) {
        let mut bundle = self.shared.bundle.lock().unwrap();

        match bundle.state {
            WorkerState::Waiting => {
                bundle.time_of_last_message = self.shared.timer.elapsed_seconds();
                bundle.state = WorkerState::Requesting;

                comm.request_cubes();
                log::debug!(target: targets::WORKER, "Sent cube request to root");
            }

            WorkerState::Failed => {
                bundle.time_of_last_message = self.shared.timer.elapsed_seconds();
                bundle.state = WorkerState::Returning;

                comm.return_failed_cubes(&bundle.failed_cubes);
                log::debug!(
                    target: targets::WORKER,
                    "Sent {} failed cubes to root",
                    bundle.failed_cubes.len(),
                );
            }

            // wants_to_communicate may have reported true for a state since left
            _ => {}
        }
    }

    /// Applies a received batch: fresh failed cubes, then the local cubes to solve.
    pub fn digest_send_cubes(&self, fresh_failed: Vec<Cube>, cubes: Vec<Cube>) {
        let mut bundle = self.shared.bundle.lock().unwrap();
        debug_assert_eq!(bundle.state, WorkerState::Requesting);

        let now = self.shared.timer.elapsed_seconds();
        bundle.time_waiting_for_messages += now - bundle.time_of_last_message;

        log::debug!(
            target: targets::WORKER,
            "Received {} cubes and {} failed cubes from root",
            cubes.len(),
            fresh_failed.len(),
        );

        bundle.failed_cubes.extend(fresh_failed);
        bundle.local_cubes = cubes;

        bundle.state = WorkerState::Working;
        self.shared.signal.notify_all();
    }

    /// Applies the root's acknowledgement: the returned failed cubes are cleared.
    pub fn digest_failed_ack(&self) {
        let mut bundle = self.shared.bundle.lock().unwrap();
        debug_assert_eq!(bundle.state, WorkerState::Returning);

        let now = self.shared.timer.elapsed_seconds();
        bundle.time_waiting_for_messages += now - bundle.time_of_last_message;

        bundle.failed_cubes.clear();
        bundle.state = WorkerState::Waiting;
    }

    /// Issues a spurious wakeup to the worker thread, so an interrupt is observed.
    pub fn wake(&self) {
        self.shared.signal.notify_all();
    }

    /// Wakes the worker thread after an interrupt, and joins it.
    ///
    /// The terminator must have been interrupted beforehand; this is checked.
    pub fn stop(&self) {
        assert!(self.shared.terminator.is_interrupted());
        self.shared.signal.notify_all();

        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }

        let bundle = self.shared.bundle.lock().unwrap();
        log::debug!(
            target: targets::WORKER,
            "Time waiting for messages: {:.3}",
            bundle.time_waiting_for_messages,
        );
    }
}

fn main_loop(shared: Arc<WorkerShared>, mut solver: Engine) {
    let mut bundle = shared.bundle.lock().unwrap();

    debug_assert_eq!(bundle.state, WorkerState::Idling);
    bundle.state = WorkerState::Waiting;

    loop {
        // After the condition is fulfilled the lock is reacquired.
        bundle = shared
            .signal
            .wait_while(bundle, |bundle| {
                bundle.state != WorkerState::Working && !shared.terminator.is_interrupted()
            })
            .unwrap();

        if shared.terminator.is_interrupted() {
            log::debug!(target: targets::WORKER, "Leaving the main loop due to an interruption");
            return;
        }

        debug_assert!(!bundle.local_cubes.is_empty());

        solve_cubes(&shared, &mut solver, &mut bundle);

        if shared.verdict.get().is_decided() {
            log::debug!(target: targets::WORKER, "Leaving the main loop with a verdict");
            return;
        }

        if shared.terminator.is_interrupted() {
            return;
        }
    }
}

fn solve_cubes(shared: &WorkerShared, solver: &mut Engine, bundle: &mut WorkerBundle) {
    let cubes = std::mem::take(&mut bundle.local_cubes);

    for cube in cubes {
        if includes_failed_cube(&cube, &bundle.failed_cubes) {
            log::trace!(target: targets::WORKER, "Skipped cube {cube}");
            continue;
        }

        for literal in cube.path() {
            solver.assume(*literal);
        }

        match solver.solve() {
            SolveReport::Satisfiable => {
                log::info!(target: targets::WORKER, "Found a solution: SAT");

                shared.verdict.set(SolveReport::Satisfiable, solver.model());
                bundle.state = WorkerState::Solved;
                return;
            }

            SolveReport::Unknown => {
                log::debug!(target: targets::WORKER, "Solving interrupted");

                // The interruptor owns the next state.
                return;
            }

            SolveReport::Unsatisfiable => {
                let core: Vec<Lit> = cube
                    .path()
                    .iter()
                    .copied()
                    .filter(|literal| solver.failed(*literal))
                    .collect();

                if core.is_empty() {
                    log::info!(target: targets::WORKER, "Found a solution: UNSAT");

                    shared.verdict.set(SolveReport::Unsatisfiable, &[]);
                    bundle.state = WorkerState::Solved;
                    return;
                }

                log::trace!(target: targets::WORKER, "Cube {cube} failed");
                bundle.failed_cubes.push(Cube::new(core));
            }
        }
    }

    // Every cube was unsatisfiable, each with a nonempty core.
    bundle.state = WorkerState::Failed;
}

fn includes_failed_cube(cube: &Cube, failed_cubes: &[Cube]) -> bool {
    failed_cubes.iter().any(|failed| cube.includes(failed))
}
