/*!
Configuration of the engine.

One configuration structure is shared by every job on a process.
Jobs copy the parts they refine at start --- notably the thread count, which may be cut
down against the per-process literal limit, and the demand ceiling, which combines
with the per-job ceiling from the description.
*/

/// The primary configuration structure.
#[derive(Clone, Debug)]
pub struct Config {
    /// Seconds between doublings of a job's demand.
    ///
    /// At or below zero a job demands the full communicator immediately.
    pub growth_period: f64,

    /// Grow demand along the continuous curve rather than in discrete period steps.
    pub continuous_growth: bool,

    /// A global ceiling on the demand of any job, with `0` read as unlimited.
    pub max_demand: i32,

    /// Solver threads owned by each process of a job, at least one.
    pub threads_per_process: usize,

    /// A ceiling on `threads × formula literals` per process, with `0` read as unlimited.
    ///
    /// When exceeded the thread count of the job is reduced, never below one.
    pub size_limit_per_process: usize,

    /// Seconds between checks of a job's communication appetite on the event thread.
    pub job_comm_update_period: f64,

    /// Apply a multiplicative jitter in `[0.99, 1.00)` to submitted job priorities.
    pub jitter_job_priorities: bool,

    /// Cubes handed to a worker per batch.
    pub cubes_per_batch: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            growth_period: 5.0,
            continuous_growth: false,
            max_demand: 0,
            threads_per_process: 4,
            size_limit_per_process: 0,
            job_comm_update_period: 0.05,
            jitter_job_priorities: false,
            cubes_per_batch: 4,
        }
    }
}
