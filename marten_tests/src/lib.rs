/*!
Helpers for end-to-end scenarios: formula builders and an in-process harness which
plays the transport and the event loop for one or more ranks of a job.
*/

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::Receiver;

use marten_sat::{
    config::Config,
    cube::comm::{ChannelOutbox, Envelope},
    job::{
        description::JobDescription, request::JobRequest, result::JobResult, state::JobState,
        CubeSatJob, Job,
    },
    misc::Timer,
};

/// Flattens clauses to the sentinel-terminated stream descriptions carry.
pub fn clause_stream(clauses: &[&[i32]]) -> Vec<i32> {
    let mut stream = Vec::new();
    for clause in clauses {
        stream.extend_from_slice(clause);
        stream.push(0);
    }
    stream
}

/// A serialized description around the given formula.
pub fn description_with(id: i32, formula: &[i32]) -> JobDescription {
    let mut description = JobDescription::new(id, 1.0, false);
    description.payload = formula.to_vec();
    description
}

/// One or more ranks of a single job, wired over a loopback transport.
pub struct Harness {
    pub jobs: Vec<Job>,
    pub inbox: Receiver<Envelope>,
    pub timer: Timer,
}

impl Harness {
    /// A single-process job: rank 0 is root and worker at once.
    pub fn single(config: &Config, formula: &[i32]) -> Self {
        Self::with_ranks(config, formula, 1)
    }

    /// A root at rank 0 with worker processes at the remaining ranks.
    pub fn with_ranks(config: &Config, formula: &[i32], ranks: usize) -> Self {
        assert!(ranks >= 1);

        let timer = Timer::start();
        let (outbox, inbox) = ChannelOutbox::new();
        let outbox = Arc::new(outbox);

        let description = description_with(0, formula);
        let payload = description.serialize();

        let mut jobs = Vec::new();
        for rank in 0..ranks {
            let application = CubeSatJob::new(
                description.id,
                config.cubes_per_batch,
                outbox.clone(),
                timer,
            );

            let mut job = Job::new(
                config,
                ranks,
                rank as i32,
                description.id,
                Box::new(application),
                0.0,
            );

            if rank > 0 {
                job.commit(JobRequest {
                    job_id: description.id,
                    requesting_node_rank: 0,
                    requested_node_index: rank,
                    root_rank: 0,
                });
            }

            job.start(&payload, timer.elapsed_seconds())
                .expect("job must start");
            jobs.push(job);
        }

        Harness { jobs, inbox, timer }
    }

    /// Delivers queued messages and polls communication appetites once.
    pub fn tick(&mut self) {
        while let Ok(envelope) = self.inbox.try_recv() {
            if let Some(job) = self.jobs.get_mut(envelope.destination as usize) {
                job.handle_message(envelope.source, envelope.message);
            }
        }

        for job in &mut self.jobs {
            if job.wants_to_communicate() {
                job.communicate();
            }
        }
    }

    /// Drives the harness until some rank reports a result, or the timeout passes.
    pub fn drive(&mut self, timeout: Duration) -> Option<JobResult> {
        let deadline = Instant::now() + timeout;

        while Instant::now() < deadline {
            self.tick();

            for job in &mut self.jobs {
                if let Some(result) = job.result() {
                    return Some(result.clone());
                }
            }

            std::thread::sleep(Duration::from_millis(1));
        }

        None
    }

    /// Terminates every rank and waits for destructibility.
    pub fn shutdown(&mut self) {
        let now = self.timer.elapsed_seconds();

        for job in &mut self.jobs {
            match job.state() {
                JobState::Active | JobState::Suspended => {
                    if job.state() == JobState::Suspended {
                        job.resume();
                    }
                    job.interrupt();
                    job.terminate(now);
                }
                JobState::Standby | JobState::Inactive => job.terminate(now),
                JobState::Past => {}
            }
        }

        for job in &self.jobs {
            while !job.is_destructible() {
                std::thread::sleep(Duration::from_millis(1));
            }
        }
    }
}
