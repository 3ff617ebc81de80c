//! A library for distributed, malleable satisfiability solving by cube-and-conquer.
//!
//! marten_sat is the per-job runtime of an elastic solving fleet: a root process
//! decomposes a formula into disjoint cubes, workers conquer cubes in parallel, and
//! learned failed cubes prune every peer's search space, while a global balancer
//! grows and shrinks the process tree behind each job at runtime.
//!
//! # Orientation
//!
//! The library is designed around three layers:
//!
//! - The [solver] layer: the adapter surface an incremental solver exposes ---
//!   clause input, assumptions, solve, lookahead, failed-assumption cores,
//!   cooperative cancellation --- together with a small reference engine behind it.
//! - The [cube] layer: the cube-and-conquer protocol --- the worker state machine,
//!   the generator threads at the root, the frontier dispatcher, the failed-cube
//!   store, and the tag-dispatched communicator between them.
//! - The [job] layer: the lifecycle state machine with its demand and temperature
//!   functions, the worker tree, and the [JobApplication](job::application)
//!   capability seam binding a lifecycle to the cube engine.
//!
//! Useful starting points:
//!
//! - [Job](job::Job) for the lifecycle and elasticity rules.
//! - [CubeEngine](cube::CubeEngine) for how the protocol pieces compose.
//! - [cube::worker] for the worker state machine at the heart of the exchange.
//!
//! # Example
//!
//! A single-process job solving a trivially unsatisfiable formula:
//!
//! ```rust
//! # use std::sync::Arc;
//! # use marten_sat::config::Config;
//! # use marten_sat::cube::comm::ChannelOutbox;
//! # use marten_sat::job::{CubeSatJob, Job};
//! # use marten_sat::misc::Timer;
//! # use marten_sat::solver::SolveReport;
//! let config = Config::default();
//! let timer = Timer::start();
//! let (outbox, inbox) = ChannelOutbox::new();
//!
//! let application = CubeSatJob::new(0, config.cubes_per_batch, Arc::new(outbox), timer);
//! let mut job = Job::new(&config, 1, 0, 0, Box::new(application), 0.0);
//!
//! let mut description = marten_sat::job::description::JobDescription::new(0, 1.0, false);
//! description.payload = vec![1, 0, -1, 0];
//!
//! job.start(&description.serialize(), timer.elapsed_seconds()).unwrap();
//!
//! // Pump the loopback transport until the verdict lands.
//! let verdict = loop {
//!     if job.wants_to_communicate() {
//!         job.communicate();
//!     }
//!     while let Ok(envelope) = inbox.try_recv() {
//!         job.handle_message(envelope.source, envelope.message);
//!     }
//!     if let Some(result) = job.result() {
//!         break result.result;
//!     }
//! };
//!
//! assert_eq!(verdict, SolveReport::Unsatisfiable);
//!
//! job.interrupt();
//! job.terminate(timer.elapsed_seconds());
//! while !job.is_destructible() {}
//! ```

pub mod config;
pub mod cube;
pub mod generic;
pub mod job;
pub mod misc;
pub mod solver;
pub mod structures;
pub mod types;
