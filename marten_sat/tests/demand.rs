use marten_sat::{
    config::Config,
    cube::comm::{JobMessage, Rank},
    job::{
        application::JobApplication, description::JobDescription, result::JobResult, tree::JobTree,
        Job,
    },
};

/// An application which does nothing, for exercising the lifecycle alone.
struct Inert;

impl JobApplication for Inert {
    fn start(&mut self, _: &JobDescription, _: &JobTree, _: usize) {}
    fn stop(&mut self) {}
    fn suspend(&mut self) {}
    fn resume(&mut self) {}
    fn interrupt(&mut self) {}
    fn restart(&mut self, _: &JobDescription, _: &JobTree, _: usize) {}
    fn terminate(&mut self) {}
    fn wants_to_begin_communication(&self) -> bool {
        false
    }
    fn begin_communication(&mut self) {}
    fn communicate(&mut self, _: Rank, _: JobMessage) {}
    fn is_destructible(&self) -> bool {
        true
    }
    fn result(&mut self) -> Option<JobResult> {
        None
    }
}

fn payload_with(priority: f64, max_demand: i32) -> Vec<u8> {
    let mut description = JobDescription::new(0, priority, false);
    description.max_demand = max_demand;
    description.payload = vec![1, 0];
    description.serialize()
}

fn job_with(config: &Config, comm_size: usize) -> Job {
    Job::new(config, comm_size, 0, 0, Box::new(Inert), 0.0)
}

mod demand {
    use super::*;

    #[test]
    fn growth_curve() {
        let config = Config {
            growth_period: 1.0,
            continuous_growth: true,
            max_demand: 0,
            ..Config::default()
        };

        let mut job = job_with(&config, 100);
        job.start(&payload_with(1.0, 0), 1.0).unwrap();

        assert_eq!(job.demand(1, 1.0), 1);
        assert_eq!(job.demand(1, 2.0), 3);
        assert_eq!(job.demand(1, 3.0), 7);
        assert_eq!(job.demand(1, 8.0), 100);
    }

    #[test]
    fn discrete_growth_steps() {
        let config = Config {
            growth_period: 1.0,
            continuous_growth: false,
            ..Config::default()
        };

        let mut job = job_with(&config, 1000);
        job.start(&payload_with(1.0, 0), 1.0).unwrap();

        assert_eq!(job.demand(1, 1.5), 1);
        assert_eq!(job.demand(1, 2.5), 3);
        assert_eq!(job.demand(1, 3.5), 7);
        assert_eq!(job.demand(1, 11.5), 1000);
    }

    #[test]
    fn immediate_growth_without_a_period() {
        let config = Config {
            growth_period: 0.0,
            ..Config::default()
        };

        let mut job = job_with(&config, 64);
        job.start(&payload_with(1.0, 0), 1.0).unwrap();

        assert_eq!(job.demand(1, 1.0), 64);
    }

    #[test]
    fn nondecreasing_while_active() {
        let config = Config {
            growth_period: 0.5,
            continuous_growth: true,
            ..Config::default()
        };

        let mut job = job_with(&config, 512);
        job.start(&payload_with(1.0, 0), 1.0).unwrap();

        let mut previous = 0;
        for step in 0..100 {
            let demand = job.demand(previous, 1.0 + step as f64 * 0.25);
            assert!(demand >= previous);
            previous = demand;
        }
    }

    #[test]
    fn frozen_when_not_active() {
        let config = Config::default();
        let mut job = job_with(&config, 100);

        assert_eq!(job.demand(5, 10.0), 5);

        job.start(&payload_with(1.0, 0), 1.0).unwrap();
        job.suspend();

        assert_eq!(job.demand(7, 100.0), 7);
    }

    #[test]
    fn ceiling_is_the_more_restrictive_limit() {
        let config = Config {
            growth_period: 0.0,
            max_demand: 5,
            ..Config::default()
        };

        // The description's ceiling of 3 undercuts the global ceiling of 5.
        let mut job = job_with(&config, 100);
        job.start(&payload_with(1.0, 3), 1.0).unwrap();
        assert_eq!(job.demand(1, 50.0), 3);

        // With no description ceiling the global one holds.
        let mut job = job_with(&config, 100);
        job.start(&payload_with(1.0, 0), 1.0).unwrap();
        assert_eq!(job.demand(1, 50.0), 5);
    }
}

mod temperature {
    use super::*;

    #[test]
    fn bounded_and_nonincreasing() {
        let config = Config::default();
        let mut job = job_with(&config, 4);
        job.start(&payload_with(1.0, 0), 0.0).unwrap();

        let mut previous = 1.0_f64;
        for age in 0..3200 {
            let temperature = job.temperature(age as f64);

            assert!(temperature <= previous);
            assert!(temperature <= 1.0);
            assert!(temperature >= 0.95 - 1e-9);

            previous = temperature;
        }
    }

    #[test]
    fn cooldown_continues_past_the_precision_floor() {
        let config = Config::default();
        let mut job = job_with(&config, 4);
        job.start(&payload_with(1.0, 0), 0.0).unwrap();

        for age in 0..3000 {
            job.temperature(age as f64);
        }

        // Well past the latch the epsilon steps keep the value strictly falling.
        let a = job.temperature(3000.0);
        let b = job.temperature(3001.0);
        let c = job.temperature(3002.0);

        assert!(b < a);
        assert!(c < b);
    }
}
