/*!
The cube engine --- composition of worker, generators, root, and communicator.

One engine exists per job per process.
Every process runs a worker; the root process additionally runs the dispatcher and
its generator threads.
All solver threads share one [Terminator] and one [VerdictCell], so interruption
and verdicts act engine-wide.

Termination is explicit: [stop](CubeEngine::stop) interrupts, issues wakeups to
every waiting thread, and joins --- the engine is never torn down from a destructor.
*/

use std::sync::Arc;

use crate::{
    cube::{
        comm::{unframe_send_cubes, CubeCommunicator, JobMessage, MessageTag, Outbox, Rank},
        generator::CubeGenerator,
        root::CubeRoot,
        worker::{CubeWorker, WorkerState},
        VerdictCell,
    },
    misc::log::targets::{self},
    misc::Timer,
    solver::{SolveReport, Terminator},
    structures::{unserialize_cubes, Lit},
    types::err::{self},
};

/// Everything needed to assemble a cube engine.
pub struct CubeSetup {
    pub job_id: i32,

    /// True iff this process is the root of the job.
    pub is_root: bool,

    /// The rank of this process.
    pub self_rank: Rank,

    /// The rank cube requests and failed cubes are sent to.
    pub root_rank: Rank,

    /// The formula as a flat clause stream.
    pub formula: Arc<Vec<Lit>>,

    pub outbox: Arc<dyn Outbox>,

    /// Generator threads at the root, at least one.
    pub generator_threads: usize,

    /// Cubes handed to a worker per batch.
    pub cubes_per_batch: usize,

    pub timer: Timer,
}

/// The per-process solving machinery of one job.
pub struct CubeEngine {
    job_id: i32,
    comm: CubeCommunicator,
    terminator: Arc<Terminator>,
    verdict: Arc<VerdictCell>,
    worker: CubeWorker,
    root: Option<Arc<CubeRoot>>,
    generators: Vec<CubeGenerator>,
}

impl CubeEngine {
    pub fn new(setup: CubeSetup) -> Self {
        let terminator = Arc::new(Terminator::new());
        let verdict = Arc::new(VerdictCell::default());
        let comm = CubeCommunicator::new(
            setup.job_id,
            setup.self_rank,
            setup.root_rank,
            setup.outbox.clone(),
        );

        let worker = CubeWorker::new(
            setup.formula.clone(),
            terminator.clone(),
            verdict.clone(),
            setup.timer,
        );

        let (root, generators) = match setup.is_root {
            false => (None, Vec::new()),

            true => {
                let root = Arc::new(CubeRoot::new(
                    comm.clone(),
                    terminator.clone(),
                    setup.cubes_per_batch,
                ));

                let generators: Vec<CubeGenerator> = (0..setup.generator_threads.max(1))
                    .map(|_| {
                        let generator = CubeGenerator::new(
                            setup.formula.clone(),
                            root.clone(),
                            terminator.clone(),
                            verdict.clone(),
                        );
                        root.register_buffer(generator.buffer());
                        generator
                    })
                    .collect();

                (Some(root), generators)
            }
        };

        CubeEngine {
            job_id: setup.job_id,
            comm,
            terminator,
            verdict,
            worker,
            root,
            generators,
        }
    }

    /// Spawns the worker thread, and the generator threads at the root.
    pub fn start(&self) {
        self.worker.start();

        for generator in &self.generators {
            generator.start();
        }
    }

    /// Closes the pause gate: solver calls hold at their next poll.
    pub fn suspend(&self) {
        self.terminator.pause();
    }

    /// Opens the pause gate.
    pub fn resume(&self) {
        self.terminator.unpause();
    }

    /// Interrupts every solver thread of the engine and wakes any waiter.
    ///
    /// Idempotent, and does not block.
    pub fn interrupt(&self) {
        self.terminator.interrupt();

        if let Some(root) = &self.root {
            root.wake();
        }
        self.worker.wake();
    }

    /// Interrupts, wakes, and joins every thread of the engine.
    pub fn stop(&self) {
        self.interrupt();

        self.worker.stop();
        for generator in &self.generators {
            generator.stop();
        }

        log::debug!(target: targets::JOB, "Job #{} : engine stopped", self.job_id);
    }

    /// True iff the worker has a message to dispatch.
    pub fn wants_to_communicate(&self) -> bool {
        self.worker.wants_to_communicate()
    }

    /// Dispatches exactly one worker message.
    pub fn begin_communication(&self) {
        self.worker.begin_communication(&self.comm);
    }

    /// Applies an inbound message, on the event thread.
    pub fn handle_message(
        &self,
        source: Rank,
        message: JobMessage,
    ) -> Result<(), err::ProtocolError> {
        debug_assert_eq!(message.job_id, self.job_id);

        let Some(tag) = MessageTag::from_code(message.tag) else {
            return Err(err::ProtocolError::UnknownTag(message.tag));
        };

        match tag {
            MessageTag::RequestCubes => match &self.root {
                Some(root) => {
                    root.handle_request(source);
                    Ok(())
                }
                None => Err(err::ProtocolError::WrongSide(tag)),
            },

            MessageTag::ReturnFailed => match &self.root {
                Some(root) => {
                    let cubes = unserialize_cubes(&message.payload);
                    log::debug!(
                        target: targets::ROOT,
                        "Received {} failed cubes from {source}",
                        cubes.len(),
                    );

                    root.digest_returned_failed(cubes);
                    self.comm.ack_failed(source);
                    Ok(())
                }
                None => Err(err::ProtocolError::WrongSide(tag)),
            },

            MessageTag::SendCubes => {
                let (fresh_failed, batch) = unframe_send_cubes(&message.payload)?;

                match self.worker.state() {
                    WorkerState::Requesting => {
                        self.worker.digest_send_cubes(fresh_failed, batch);
                        Ok(())
                    }
                    state => Err(err::ProtocolError::UnexpectedMessage(tag, state)),
                }
            }

            MessageTag::AckFailed => match self.worker.state() {
                WorkerState::Returning => {
                    self.worker.digest_failed_ack();
                    Ok(())
                }
                state => Err(err::ProtocolError::UnexpectedMessage(tag, state)),
            },
        }
    }

    /// The verdict of the engine, or unknown.
    pub fn verdict(&self) -> SolveReport {
        self.verdict.get()
    }

    /// The satisfying assignment accompanying a satisfiable verdict, if any.
    pub fn solution(&self) -> Vec<Lit> {
        self.verdict.solution()
    }

    /// The worker state, for observation.
    pub fn worker_state(&self) -> WorkerState {
        self.worker.state()
    }
}
