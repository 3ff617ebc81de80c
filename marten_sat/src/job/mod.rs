/*!
The per-job runtime --- lifecycle, elasticity, and bookkeeping.

# Lifecycle

A job is constructed INACTIVE, may be committed to a balancer request (and
uncommitted again), is started once with a serialized description, and then moves
along the lifecycle graph:

```none
INACTIVE --start--> ACTIVE <--suspend/resume--> SUSPENDED
   ⌃                  |
   +------stop--------+---interrupt--> STANDBY --restart--> ACTIVE
                                          |
        INACTIVE ∪ STANDBY --terminate--> PAST
```

All transitions happen on the event thread.
`suspend` of a suspended job and `interrupt` of a standby job are no-ops; every
other off-graph transition fails an assertion naming the source and target states.

# Elasticity

While active a job's demand grows exponentially from one toward the communicator
size --- continuously or in discrete period steps --- clamped by the effective demand
ceiling fixed at start.
The temperature decays from one toward a base temperature, and past the machine
precision floor cools linearly by epsilon steps, so reassignment damping keeps
strictly decreasing.
Both functions take the current elapsed-seconds reading as an argument.
*/

use crate::{
    config::Config,
    cube::comm::{JobMessage, Rank},
    misc::log::targets::{self},
    types::err::{self},
};

pub mod application;
pub mod description;
pub mod request;
pub mod result;
pub mod state;
pub mod tree;

mod sat_job;
pub use sat_job::CubeSatJob;

use application::JobApplication;
use description::JobDescription;
use request::JobRequest;
use result::JobResult;
use state::JobState;
use tree::{JobTree, SELF_RANK};

const BASE_TEMPERATURE: f64 = 0.95;
const TEMPERATURE_DECAY: f64 = 0.99;

/// A job: lifecycle state machine, tree node, and elastic volume bookkeeping.
pub struct Job {
    id: i32,
    name: String,

    state: JobState,
    commitment: Option<JobRequest>,
    description: Option<JobDescription>,
    result: Option<JobResult>,
    result_transfer_pending: bool,

    tree: JobTree,

    priority: f64,
    volume: i32,

    growth_period: f64,
    continuous_growth: bool,
    max_demand: i32,
    threads_per_job: usize,
    size_limit_per_process: usize,

    time_of_arrival: f64,
    time_of_activation: f64,
    time_of_last_limit_check: f64,
    time_of_abort: f64,

    last_temperature: f64,
    age_of_const_cooldown: i64,

    application: Box<dyn JobApplication>,
}

impl Job {
    pub fn new(
        config: &Config,
        comm_size: usize,
        world_rank: Rank,
        job_id: i32,
        application: Box<dyn JobApplication>,
        time_of_arrival: f64,
    ) -> Self {
        Job {
            id: job_id,
            name: format!("#{job_id}"),

            state: JobState::Inactive,
            commitment: None,
            description: None,
            result: None,
            result_transfer_pending: false,

            tree: JobTree::new(comm_size, world_rank),

            priority: 0.0,
            volume: 0,

            growth_period: config.growth_period,
            continuous_growth: config.continuous_growth,
            max_demand: config.max_demand,
            threads_per_job: config.threads_per_process.max(1),
            size_limit_per_process: config.size_limit_per_process,

            time_of_arrival,
            time_of_activation: 0.0,
            time_of_last_limit_check: 0.0,
            time_of_abort: 0.0,

            last_temperature: 1.0,
            age_of_const_cooldown: -1,

            application,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn tree(&self) -> &JobTree {
        &self.tree
    }

    pub fn volume(&self) -> i32 {
        self.volume
    }

    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn time_of_arrival(&self) -> f64 {
        self.time_of_arrival
    }

    pub fn threads_per_job(&self) -> usize {
        self.threads_per_job
    }

    fn update_job_tree(&mut self, index: usize, root_rank: Rank, parent_rank: Rank) {
        let root_rank = match index {
            0 => SELF_RANK,
            _ => root_rank,
        };

        self.name = format!("#{}:{}", self.id, index);
        self.tree.update(index, root_rank, parent_rank);
    }

    /// Commits the job to a balancer request, adopting the requested tree node.
    pub fn commit(&mut self, request: JobRequest) {
        assert!(
            self.state != JobState::Active && self.state != JobState::Past,
            "! {} : commit in state {}",
            self.name,
            self.state,
        );

        self.tree.clear_node_updates();
        self.update_job_tree(
            request.requested_node_index,
            request.root_rank,
            request.requesting_node_rank,
        );
        self.commitment = Some(request);
    }

    /// Reverses a commitment.
    pub fn uncommit(&mut self) {
        assert!(
            self.state != JobState::Active,
            "! {} : uncommit in state {}",
            self.name,
            self.state,
        );

        self.commitment = None;
    }

    pub fn commitment(&self) -> Option<&JobRequest> {
        self.commitment.as_ref()
    }

    /// Starts the job: deserializes the description and activates the application.
    pub fn start(&mut self, payload: &[u8], now: f64) -> Result<(), err::ErrorKind> {
        self.assert_state(JobState::Inactive, "start");

        if self.time_of_activation <= 0.0 {
            self.time_of_activation = now;
        }
        self.time_of_last_limit_check = now;
        self.volume = 1;

        let description = JobDescription::deserialize(payload)?;
        self.priority = description.priority;

        if description.max_demand > 0 {
            // The more restrictive of the global and job-internal ceilings.
            self.max_demand = match self.max_demand {
                0 => description.max_demand,
                global => global.min(description.max_demand),
            };
        }

        if self.size_limit_per_process > 0
            && self.threads_per_job * description.num_literals() > self.size_limit_per_process
        {
            // Literal threshold exceeded: cut down the solver count for this job.
            let reduced = self.size_limit_per_process / description.num_literals().max(1);
            self.threads_per_job = reduced.max(1);

            log::info!(
                target: targets::JOB,
                "{} : literal threshold exceeded - cut down threads to {}",
                self.name,
                self.threads_per_job,
            );
        }

        self.description = Some(description);
        self.state = JobState::Active;

        let description = self.description.as_ref().expect("! Description just set");
        self.application
            .start(description, &self.tree, self.threads_per_job);

        Ok(())
    }

    /// Deactivates an active job, leaving it startable again.
    pub fn stop(&mut self) {
        self.assert_state(JobState::Active, "stop");

        self.state = JobState::Inactive;
        self.application.stop();
    }

    /// Pauses an active job and withdraws its volume.
    pub fn suspend(&mut self) {
        if self.state == JobState::Suspended {
            return;
        }
        self.assert_state(JobState::Active, "suspend");

        self.state = JobState::Suspended;
        self.application.suspend();
        self.volume = 0;

        log::debug!(target: targets::JOB, "{} : suspended solver", self.name);
    }

    /// Resumes a suspended job.
    pub fn resume(&mut self) {
        self.assert_state(JobState::Suspended, "resume");

        self.state = JobState::Active;
        self.application.resume();

        log::debug!(target: targets::JOB, "{} : resumed solving threads", self.name);
    }

    /// Forces an active job onto standby, clearing its children.
    pub fn interrupt(&mut self) {
        if self.state == JobState::Standby {
            return;
        }
        self.assert_state(JobState::Active, "interrupt");

        self.state = JobState::Standby;
        self.application.interrupt();

        self.tree.unset_left_child();
        self.tree.unset_right_child();

        log::debug!(target: targets::JOB, "{} : interrupted solver", self.name);
    }

    /// Restarts a standby job under a description delta.
    pub fn restart(&mut self, delta: &[u8], now: f64) -> Result<(), err::ErrorKind> {
        self.assert_state(JobState::Standby, "restart");
        assert!(
            !self.result_transfer_pending,
            "! {} : restart with result transfer pending",
            self.name,
        );

        self.time_of_activation = now;
        self.time_of_last_limit_check = now;
        self.volume = 1;
        self.result = None;

        let update = JobDescription::deserialize(delta)?;
        let description = self
            .description
            .as_mut()
            .expect("! Restart before a description was read");
        description.apply_update(update);

        self.state = JobState::Active;

        let description = self.description.as_ref().expect("! Description present");
        self.application
            .restart(description, &self.tree, self.threads_per_job);

        log::debug!(target: targets::JOB, "{} : restarted solver", self.name);
        Ok(())
    }

    /// Terminates the job. Terminal; only destruction remains.
    pub fn terminate(&mut self, now: f64) {
        assert!(
            self.state == JobState::Inactive || self.state == JobState::Standby,
            "! {} : terminate in state {}",
            self.name,
            self.state,
        );

        self.state = JobState::Past;
        self.volume = 0;

        self.application.terminate();

        self.tree.unset_left_child();
        self.tree.unset_right_child();

        self.time_of_abort = now;
        log::debug!(target: targets::JOB, "{} : terminated", self.name);
    }

    /// Polls whether background cleanup has completed. Meaningful only in PAST.
    pub fn is_destructible(&self) -> bool {
        assert!(
            self.state == JobState::Past,
            "! {} : destructibility poll in state {}",
            self.name,
            self.state,
        );

        self.application.is_destructible()
    }

    /// The moment the job was terminated, meaningful only in PAST.
    pub fn time_of_abort(&self) -> f64 {
        self.time_of_abort
    }

    /// True iff the job's wallclock limit has passed, noting the check time.
    pub fn check_wallclock_limit(&mut self, now: f64) -> bool {
        self.time_of_last_limit_check = now;

        let Some(description) = &self.description else {
            return false;
        };

        description.wallclock_limit > 0.0
            && now - self.time_of_activation > description.wallclock_limit
    }

    /// The volume the job requests from the balancer at the given moment.
    pub fn demand(&self, prev_volume: i32, elapsed: f64) -> i32 {
        if let Some(demand) = self.application.demand_override() {
            return demand;
        }

        if self.state != JobState::Active {
            // Frozen.
            return prev_volume;
        }

        let comm_size = self.tree.comm_size() as i32;

        let mut demand = if self.growth_period <= 0.0 {
            // Immediate growth.
            comm_size
        } else if self.time_of_activation <= 0.0 {
            1
        } else {
            let age = elapsed - self.time_of_activation;
            let periods = age / self.growth_period;

            match self.continuous_growth {
                true => {
                    // d(0) := 1; d := 2d+1 every growth period.
                    let curve = 2_f64.powf(periods + 1.0) - 1.0;
                    (comm_size as f64).min(curve) as i32
                }

                false => {
                    // Discrete periodic growth, with the shift capped well before overflow.
                    let shift = periods.floor().min(29.0) as u32 + 1;
                    comm_size.min((1_i32 << shift) - 1)
                }
            }
        };

        if self.max_demand > 0 {
            demand = demand.min(self.max_demand);
        }

        demand
    }

    /// The annealing temperature of the job at the given moment.
    pub fn temperature(&mut self, elapsed: f64) -> f64 {
        let age = (elapsed - self.time_of_activation) as i64;
        let eps = 2.0 * f64::EPSILON;

        // Start at one, exponentially converge toward the base temperature.
        let temp =
            BASE_TEMPERATURE + (1.0 - BASE_TEMPERATURE) * TEMPERATURE_DECAY.powi(age as i32 + 1);

        // Latch the age at which machine precision was reached, once.
        if self.age_of_const_cooldown < 0 && self.last_temperature - temp <= eps {
            self.age_of_const_cooldown = age;
        }

        if self.age_of_const_cooldown >= 0 {
            // Indefinitely cool down by machine precision epsilon.
            BASE_TEMPERATURE
                + (1.0 - BASE_TEMPERATURE)
                    * TEMPERATURE_DECAY.powi(self.age_of_const_cooldown as i32 + 1)
                - (age - self.age_of_const_cooldown + 1) as f64 * eps
        } else {
            self.last_temperature = temp;
            temp
        }
    }

    /// The job's result, pulled from the application and cached.
    pub fn result(&mut self) -> Option<&JobResult> {
        if self.result.is_none() {
            if let Some(result) = self.application.result() {
                debug_assert!(result.id >= 0);
                self.result = Some(result);
                self.result_transfer_pending = true;
            }
        }

        self.result.as_ref()
    }

    /// Marks the cached result as delivered.
    pub fn conclude_result_transfer(&mut self) {
        self.result_transfer_pending = false;
    }

    pub fn is_result_transfer_pending(&self) -> bool {
        self.result_transfer_pending
    }

    /// True iff the job has a message to dispatch.
    pub fn wants_to_communicate(&self) -> bool {
        self.state == JobState::Active && self.application.wants_to_begin_communication()
    }

    /// Dispatches exactly one message.
    pub fn communicate(&mut self) {
        self.application.begin_communication();
    }

    /// Delivers an inbound message to the application.
    ///
    /// Messages for a terminated job are dropped with a warning; messages for a job
    /// that is not active are dropped silently.
    pub fn handle_message(&mut self, source: Rank, message: JobMessage) {
        match self.state {
            JobState::Past => {
                log::warn!(
                    target: targets::JOB,
                    "{} : dropped message with tag {} for terminated job",
                    self.name,
                    message.tag,
                );
            }

            JobState::Active => self.application.communicate(source, message),

            _ => {}
        }
    }

    fn assert_state(&self, expected: JobState, operation: &str) {
        assert!(
            self.state == expected,
            "! {} : {} requires {}, state is {}",
            self.name,
            operation,
            expected,
            self.state,
        );
    }
}
