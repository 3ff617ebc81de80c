use std::time::Duration;

use marten_sat::{config::Config, solver::SolveReport};
use marten_tests::{clause_stream, Harness};

const PATIENCE: Duration = Duration::from_secs(20);

fn quick_config() -> Config {
    Config {
        growth_period: 0.0,
        threads_per_process: 1,
        job_comm_update_period: 0.0,
        ..Config::default()
    }
}

#[test]
fn trivial_unsat() {
    let formula = clause_stream(&[&[1], &[-1]]);
    let mut harness = Harness::single(&quick_config(), &formula);

    let result = harness.drive(PATIENCE).expect("a verdict");
    assert_eq!(result.result, SolveReport::Unsatisfiable);

    harness.shutdown();
}

#[test]
fn trivial_sat() {
    let formula = clause_stream(&[&[1, 2], &[-1, 2]]);
    let mut harness = Harness::single(&quick_config(), &formula);

    let result = harness.drive(PATIENCE).expect("a verdict");
    assert_eq!(result.result, SolveReport::Satisfiable);

    // The solution must satisfy both clauses; in this formula that forces 2.
    assert!(result.solution.contains(&2));

    harness.shutdown();
}

#[test]
fn unsat_with_splitting() {
    // Complete contradiction over two atoms: every branch of any split fails.
    let formula = clause_stream(&[&[1, 2], &[-1, 2], &[1, -2], &[-1, -2]]);
    let mut harness = Harness::single(&quick_config(), &formula);

    let result = harness.drive(PATIENCE).expect("a verdict");
    assert_eq!(result.result, SolveReport::Unsatisfiable);

    harness.shutdown();
}

#[test]
fn sat_with_several_generators() {
    let config = Config {
        growth_period: 0.0,
        threads_per_process: 3,
        job_comm_update_period: 0.0,
        ..Config::default()
    };

    let formula = clause_stream(&[&[1, 2, 3], &[-1, 2], &[-2, 3], &[-3, 1]]);
    let mut harness = Harness::single(&config, &formula);

    let result = harness.drive(PATIENCE).expect("a verdict");
    assert_eq!(result.result, SolveReport::Satisfiable);

    harness.shutdown();
}

#[test]
fn result_carries_the_job_identity() {
    let formula = clause_stream(&[&[1], &[-1]]);
    let mut harness = Harness::single(&quick_config(), &formula);

    let result = harness.drive(PATIENCE).expect("a verdict");
    assert_eq!(result.id, 0);
    assert_eq!(result.revision, 0);

    harness.shutdown();
}
