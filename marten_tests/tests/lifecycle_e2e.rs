use std::time::{Duration, Instant};

use marten_sat::{
    config::Config,
    job::{description::JobDescription, state::JobState},
    solver::SolveReport,
};
use marten_tests::{clause_stream, Harness};

const PATIENCE: Duration = Duration::from_secs(20);

fn wait_destructible(harness: &Harness) {
    let deadline = Instant::now() + PATIENCE;
    for job in &harness.jobs {
        while !job.is_destructible() {
            assert!(Instant::now() < deadline, "cleanup never completed");
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

#[test]
fn interrupt_racing_initialization() {
    let formula = clause_stream(&[&[1]]);
    let config = Config {
        threads_per_process: 1,
        ..Config::default()
    };

    let mut harness = Harness::single(&config, &formula);
    let now = harness.timer.elapsed_seconds();

    // Interrupt immediately after start, racing the initialization thread.
    let job = &mut harness.jobs[0];
    job.interrupt();
    assert_eq!(job.state(), JobState::Standby);

    job.terminate(now);
    assert_eq!(job.state(), JobState::Past);

    wait_destructible(&harness);
}

#[test]
fn suspension_pauses_and_resumption_continues() {
    // Large enough that a verdict is unlikely to land before the suspension.
    let formula = clause_stream(&[
        &[1, 2, 3, 4],
        &[-1, -2],
        &[-2, -3],
        &[-3, -4],
        &[-1, -4],
        &[2, 4],
    ]);

    let config = Config {
        threads_per_process: 2,
        job_comm_update_period: 0.0,
        ..Config::default()
    };

    let mut harness = Harness::single(&config, &formula);

    harness.jobs[0].suspend();
    assert_eq!(harness.jobs[0].state(), JobState::Suspended);
    assert_eq!(harness.jobs[0].volume(), 0);

    harness.jobs[0].resume();
    assert_eq!(harness.jobs[0].state(), JobState::Active);

    let result = harness.drive(PATIENCE).expect("a verdict after resumption");
    assert_eq!(result.result, SolveReport::Satisfiable);

    harness.shutdown();
}

#[test]
fn restart_solves_under_the_new_revision() {
    // Revision 0 is satisfiable; the delta adds the contradiction.
    let formula = clause_stream(&[&[1, 2]]);
    let config = Config {
        threads_per_process: 1,
        job_comm_update_period: 0.0,
        ..Config::default()
    };

    let mut harness = Harness::single(&config, &formula);

    let first = harness.drive(PATIENCE).expect("a first verdict");
    assert_eq!(first.result, SolveReport::Satisfiable);
    assert_eq!(first.revision, 0);

    let now = harness.timer.elapsed_seconds();
    harness.jobs[0].conclude_result_transfer();
    harness.jobs[0].interrupt();

    // Leftover traffic from the first activation must not reach the second.
    while harness.inbox.try_recv().is_ok() {}

    let mut delta = JobDescription::new(0, 1.0, true);
    delta.revision = 1;
    delta.payload = clause_stream(&[&[-1], &[-2]]);

    harness.jobs[0]
        .restart(&delta.serialize(), now)
        .expect("restart must succeed");
    assert_eq!(harness.jobs[0].state(), JobState::Active);

    let second = harness.drive(PATIENCE).expect("a second verdict");
    assert_eq!(second.result, SolveReport::Unsatisfiable);
    assert_eq!(second.revision, 1);

    harness.shutdown();
}

#[test]
fn full_cycle_with_a_live_engine() {
    let formula = clause_stream(&[&[1, 2], &[-1, 2]]);
    let config = Config {
        threads_per_process: 1,
        job_comm_update_period: 0.0,
        ..Config::default()
    };

    let mut harness = Harness::single(&config, &formula);
    let now = harness.timer.elapsed_seconds();

    harness.jobs[0].suspend();
    harness.jobs[0].resume();
    harness.jobs[0].interrupt();

    let mut delta = JobDescription::new(0, 1.0, true);
    delta.revision = 1;
    delta.payload = clause_stream(&[&[2]]);

    harness.jobs[0].restart(&delta.serialize(), now).unwrap();

    let result = harness.drive(PATIENCE).expect("a verdict");
    assert_eq!(result.result, SolveReport::Satisfiable);
    assert_eq!(result.revision, 1);

    harness.shutdown();
}
