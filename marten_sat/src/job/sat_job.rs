/*!
The cube-and-conquer application behind the [JobApplication] seam.

# Initialization race

Initialization --- construction of the cube engine, reading the formula into its
solvers, spawning its threads --- runs on a background thread, so activation never
blocks the event thread.
A mutex over the engine slot arbitrates the race between completing initialization
and aborting before it: should an interrupt or termination win the slot first, the
engine is never constructed and the job is immediately destructible.

# Termination

Termination interrupts the engine and moves the joins onto a background cleanup
thread; once the joins complete the job reports itself destructible.
The owner is expected to poll [is_destructible](CubeSatJob::is_destructible) before
dropping, at which point every background thread has finished.
*/

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::JoinHandle;

use crate::{
    cube::{
        comm::{JobMessage, Outbox, Rank},
        CubeEngine, CubeSetup,
    },
    job::{
        application::JobApplication, description::JobDescription, result::JobResult, tree::JobTree,
    },
    misc::log::targets::{self},
    misc::Timer,
    solver::SolveReport,
};

/// The engine slot, arbitrating initialization against early abortion.
enum InitSlot {
    /// Initialization has not completed.
    Pending,

    /// Aborted before initialization; the engine is never constructed.
    Aborted,

    /// Initialization completed.
    Ready(Arc<CubeEngine>),
}

/// A cube-and-conquer job application.
pub struct CubeSatJob {
    job_id: i32,
    cubes_per_batch: usize,
    outbox: Arc<dyn Outbox>,
    timer: Timer,

    /// The revision in effect for the current activation.
    revision: i32,

    started: bool,

    slot: Arc<Mutex<InitSlot>>,
    initialized: Arc<AtomicBool>,
    destructible: Arc<AtomicBool>,

    init_handle: Option<JoinHandle<()>>,
    cleanup_handle: Option<JoinHandle<()>>,
}

impl CubeSatJob {
    pub fn new(job_id: i32, cubes_per_batch: usize, outbox: Arc<dyn Outbox>, timer: Timer) -> Self {
        CubeSatJob {
            job_id,
            cubes_per_batch,
            outbox,
            timer,

            revision: 0,
            started: false,

            slot: Arc::new(Mutex::new(InitSlot::Pending)),
            initialized: Arc::new(AtomicBool::new(false)),
            destructible: Arc::new(AtomicBool::new(false)),

            init_handle: None,
            cleanup_handle: None,
        }
    }

    /// True iff initialization has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn engine(&self) -> Option<Arc<CubeEngine>> {
        if !self.is_initialized() {
            return None;
        }

        match &*self.slot.lock().unwrap() {
            InitSlot::Ready(engine) => Some(engine.clone()),
            _ => None,
        }
    }

    fn join_init(&mut self) {
        if let Some(handle) = self.init_handle.take() {
            let _ = handle.join();
        }
    }

    /// Joins the engine threads and resets the slot, leaving the application startable.
    fn teardown(&mut self) {
        self.join_init();

        let engine = {
            let mut slot = self.slot.lock().unwrap();
            match std::mem::replace(&mut *slot, InitSlot::Pending) {
                InitSlot::Ready(engine) => Some(engine),
                _ => None,
            }
        };

        if let Some(engine) = engine {
            engine.stop();
        }

        self.initialized.store(false, Ordering::Release);
    }
}

impl JobApplication for CubeSatJob {
    fn start(&mut self, description: &JobDescription, tree: &JobTree, threads: usize) {
        self.started = true;
        self.revision = description.revision;

        let setup = CubeSetup {
            job_id: self.job_id,
            is_root: tree.is_root(),
            self_rank: tree.world_rank(),
            root_rank: tree.resolved_root_rank(),
            formula: Arc::new(description.payload.clone()),
            outbox: self.outbox.clone(),
            generator_threads: threads,
            cubes_per_batch: self.cubes_per_batch,
            timer: self.timer,
        };

        let slot = self.slot.clone();
        let initialized = self.initialized.clone();
        let destructible = self.destructible.clone();

        self.init_handle = Some(std::thread::spawn(move || {
            initialize(slot, initialized, destructible, setup)
        }));
    }

    fn stop(&mut self) {
        self.teardown();
    }

    fn suspend(&mut self) {
        if let Some(engine) = self.engine() {
            engine.suspend();
        }
    }

    fn resume(&mut self) {
        if let Some(engine) = self.engine() {
            engine.resume();
        }
    }

    fn interrupt(&mut self) {
        let mut slot = self.slot.lock().unwrap();

        match &*slot {
            InitSlot::Ready(engine) => engine.interrupt(),

            // Flag the abort; a pending initialization observes it under this mutex.
            InitSlot::Pending => *slot = InitSlot::Aborted,

            InitSlot::Aborted => {}
        }
    }

    fn restart(&mut self, description: &JobDescription, tree: &JobTree, threads: usize) {
        self.teardown();
        self.destructible.store(false, Ordering::Release);
        self.start(description, tree, threads);
    }

    fn terminate(&mut self) {
        {
            let mut slot = self.slot.lock().unwrap();

            match std::mem::replace(&mut *slot, InitSlot::Aborted) {
                InitSlot::Ready(engine) => {
                    engine.interrupt();

                    let destructible = self.destructible.clone();
                    self.cleanup_handle = Some(std::thread::spawn(move || {
                        engine.stop();
                        destructible.store(true, Ordering::Release);
                    }));
                }

                InitSlot::Pending | InitSlot::Aborted => {
                    // With no initialization in flight there is nothing to clean up.
                    // Otherwise the initialization thread observes the abort and
                    // marks the job destructible itself.
                    if self.init_handle.is_none() {
                        self.destructible.store(true, Ordering::Release);
                    }
                }
            }
        }

        self.join_init();
    }

    fn wants_to_begin_communication(&self) -> bool {
        match self.engine() {
            Some(engine) => engine.wants_to_communicate(),
            None => false,
        }
    }

    fn begin_communication(&mut self) {
        if let Some(engine) = self.engine() {
            engine.begin_communication();
        }
    }

    fn communicate(&mut self, source: Rank, message: JobMessage) {
        let Some(engine) = self.engine() else {
            log::warn!(
                target: targets::JOB,
                "Job #{} : dropped message with tag {} before initialization",
                self.job_id,
                message.tag,
            );
            return;
        };

        let tag = message.tag;
        if let Err(violation) = engine.handle_message(source, message) {
            log::warn!(
                target: targets::JOB,
                "Job #{} : dropped message with tag {tag}: {violation:?}",
                self.job_id,
            );
        }
    }

    fn is_destructible(&self) -> bool {
        self.destructible.load(Ordering::Acquire)
    }

    fn result(&mut self) -> Option<JobResult> {
        let engine = self.engine()?;

        match engine.verdict() {
            SolveReport::Unknown => None,

            verdict => {
                log::info!(
                    target: targets::JOB,
                    "Job #{} : found result {verdict}",
                    self.job_id,
                );

                Some(JobResult {
                    id: self.job_id,
                    revision: self.revision,
                    result: verdict,
                    solution: engine.solution(),
                })
            }
        }
    }

    fn demand_override(&self) -> Option<i32> {
        match self.is_initialized() {
            // Demand stays at one until initialization completes.
            false => Some(1),
            true => None,
        }
    }
}

fn initialize(
    slot: Arc<Mutex<InitSlot>>,
    initialized: Arc<AtomicBool>,
    destructible: Arc<AtomicBool>,
    setup: CubeSetup,
) {
    let mut slot = slot.lock().unwrap();

    match &*slot {
        InitSlot::Aborted => {
            // The engine was never constructed, so the job is destructible as-is.
            // A job is never dropped before its initialization thread settles.
            destructible.store(true, Ordering::Release);
            return;
        }

        InitSlot::Ready(_) => return,

        InitSlot::Pending => {}
    }

    let engine = CubeEngine::new(setup);
    engine.start();

    *slot = InitSlot::Ready(Arc::new(engine));
    initialized.store(true, Ordering::Release);
}

impl Drop for CubeSatJob {
    fn drop(&mut self) {
        self.teardown();

        if let Some(handle) = self.cleanup_handle.take() {
            let _ = handle.join();
        }
    }
}
