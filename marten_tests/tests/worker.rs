use std::sync::Arc;
use std::time::{Duration, Instant};

use marten_sat::{
    cube::{
        comm::{ChannelOutbox, CubeCommunicator, MessageTag},
        worker::{CubeWorker, WorkerState},
        VerdictCell,
    },
    misc::Timer,
    solver::{SolveReport, Terminator},
    structures::Cube,
};

fn wait_for_state(worker: &CubeWorker, state: WorkerState) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while worker.state() != state {
        assert!(Instant::now() < deadline, "worker stuck in {}", worker.state());
        std::thread::sleep(Duration::from_millis(1));
    }
}

struct Rig {
    worker: CubeWorker,
    terminator: Arc<Terminator>,
    verdict: Arc<VerdictCell>,
    comm: CubeCommunicator,
    inbox: crossbeam::channel::Receiver<marten_sat::cube::comm::Envelope>,
}

fn rig_with(formula: Vec<i32>) -> Rig {
    let terminator = Arc::new(Terminator::new());
    let verdict = Arc::new(VerdictCell::default());
    let (outbox, inbox) = ChannelOutbox::new();
    let comm = CubeCommunicator::new(0, 1, 0, Arc::new(outbox));

    let worker = CubeWorker::new(
        Arc::new(formula),
        terminator.clone(),
        verdict.clone(),
        Timer::start(),
    );

    Rig {
        worker,
        terminator,
        verdict,
        comm,
        inbox,
    }
}

#[test]
fn failed_cubes_prune_the_batch() {
    // No clauses: every non-contradictory assumption set is satisfiable, so a
    // solved cube is visible through the literals of the reported solution.
    let rig = rig_with(Vec::new());
    rig.worker.start();

    wait_for_state(&rig.worker, WorkerState::Waiting);

    rig.worker.begin_communication(&rig.comm);
    assert_eq!(rig.worker.state(), WorkerState::Requesting);

    // The injected failed cube [1] must skip [1, 2] and [1, -2].
    rig.worker.digest_send_cubes(
        vec![Cube::new(vec![1])],
        vec![
            Cube::new(vec![1, 2]),
            Cube::new(vec![1, -2]),
            Cube::new(vec![-1, 3]),
        ],
    );

    wait_for_state(&rig.worker, WorkerState::Solved);

    assert_eq!(rig.verdict.get(), SolveReport::Satisfiable);

    let solution = rig.verdict.solution();
    assert!(solution.contains(&-1), "solved cube was not [-1, 3]: {solution:?}");
    assert!(solution.contains(&3));

    rig.terminator.interrupt();
    rig.worker.stop();
}

#[test]
fn exhausted_batches_return_failed_cubes() {
    // Assuming 1 fails against the unit clause -1; assuming 2 fails against -2.
    let rig = rig_with(vec![-1, 0, -2, 0]);
    rig.worker.start();

    wait_for_state(&rig.worker, WorkerState::Waiting);

    rig.worker.begin_communication(&rig.comm);
    let request = rig.inbox.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(request.message.tag, MessageTag::RequestCubes.code());

    rig.worker
        .digest_send_cubes(Vec::new(), vec![Cube::new(vec![1]), Cube::new(vec![2])]);

    wait_for_state(&rig.worker, WorkerState::Failed);

    rig.worker.begin_communication(&rig.comm);
    assert_eq!(rig.worker.state(), WorkerState::Returning);

    let returned = rig.inbox.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(returned.message.tag, MessageTag::ReturnFailed.code());
    assert_eq!(returned.message.payload, vec![1, 0, 2, 0]);

    rig.worker.digest_failed_ack();
    assert_eq!(rig.worker.state(), WorkerState::Waiting);

    rig.terminator.interrupt();
    rig.worker.stop();
}

#[test]
fn empty_cores_settle_the_formula() {
    // The formula itself is unsatisfiable, whatever the cube.
    let rig = rig_with(vec![1, 0, -1, 0]);
    rig.worker.start();

    wait_for_state(&rig.worker, WorkerState::Waiting);

    rig.worker.begin_communication(&rig.comm);
    rig.worker
        .digest_send_cubes(Vec::new(), vec![Cube::new(vec![2])]);

    wait_for_state(&rig.worker, WorkerState::Solved);
    assert_eq!(rig.verdict.get(), SolveReport::Unsatisfiable);

    rig.terminator.interrupt();
    rig.worker.stop();
}

#[test]
fn interruption_owns_the_next_state() {
    let rig = rig_with(Vec::new());
    rig.worker.start();

    wait_for_state(&rig.worker, WorkerState::Waiting);

    rig.terminator.interrupt();
    rig.worker.stop();

    // No verdict was reached, and the worker left its loop.
    assert_eq!(rig.verdict.get(), SolveReport::Unknown);
}
