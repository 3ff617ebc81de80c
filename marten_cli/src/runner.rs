/*!
A single-process job runner.

One process plays every part of a job: root, worker, and event thread.
The runner wires a job to a loopback outbox, pumps delivered messages back into the
job, polls the communication appetite on the configured period, and enforces the
wallclock limit, until a verdict lands or the limit expires.
*/

use std::sync::Arc;
use std::time::Duration;

use marten_sat::{
    config::Config,
    cube::comm::ChannelOutbox,
    job::{description::JobDescription, result::JobResult, CubeSatJob, Job},
    misc::Timer,
    solver::SolveReport,
};

pub struct JobRunner {
    config: Config,
    timer: Timer,
}

impl JobRunner {
    pub fn new(config: Config, timer: Timer) -> Self {
        JobRunner { config, timer }
    }

    /// Runs the described job to a verdict, or to its wallclock limit.
    pub fn run(&self, description: &JobDescription) -> Result<JobResult, String> {
        let (outbox, inbox) = ChannelOutbox::new();

        let application = CubeSatJob::new(
            description.id,
            self.config.cubes_per_batch,
            Arc::new(outbox),
            self.timer,
        );

        let mut job = Job::new(
            &self.config,
            1,
            0,
            description.id,
            Box::new(application),
            self.timer.elapsed_seconds(),
        );

        let started = self.timer.elapsed_seconds();
        job.start(&description.serialize(), started)
            .map_err(|e| format!("cannot start job #{}: {e}", description.id))?;

        let mut last_appetite_check = 0.0;

        let result = loop {
            while let Ok(envelope) = inbox.try_recv() {
                job.handle_message(envelope.source, envelope.message);
            }

            let now = self.timer.elapsed_seconds();

            if now - last_appetite_check >= self.config.job_comm_update_period {
                last_appetite_check = now;
                if job.wants_to_communicate() {
                    job.communicate();
                }
            }

            if let Some(result) = job.result() {
                break result.clone();
            }

            if job.check_wallclock_limit(now) {
                log::info!("Job #{} : wallclock limit reached", description.id);

                break JobResult {
                    id: description.id,
                    revision: description.revision,
                    result: SolveReport::Unknown,
                    solution: Vec::new(),
                };
            }

            std::thread::sleep(Duration::from_millis(1));
        };

        job.conclude_result_transfer();

        job.interrupt();
        job.terminate(self.timer.elapsed_seconds());

        while !job.is_destructible() {
            std::thread::sleep(Duration::from_millis(1));
        }

        Ok(result)
    }
}
