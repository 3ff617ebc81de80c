/*!
The cube generator --- root-side threads which expand the frontier.

# Overview

Each generator thread owns two solver instances over the same formula: the *main
solver*, whose lookahead selects split literals, and the *cube checker*, which
vets a cube against everything learned before any expansion work is spent on it.
Both are connected to the engine terminator.

An iteration:

1. Publish the previous outcome to the root and pull the next cube.
2. Drain the ingestion buffer --- fresh failed cubes, negated into clauses --- into
   both solvers, tracking the ingested literal count.
3. Check the cube: a satisfiable checker admits it; an unsatisfiable checker with a
   core restricted to the path reports the cube failed; an unsatisfiable checker
   with an empty core proves the formula unsatisfiable outright; an unknown checker
   was interrupted.
4. Expand an admitted cube through lookahead: a nonzero literal is the split; zero
   defers to the solver status, re-solving when the status is also undecided.

A verdict from any thread ends every generator's loop.
*/

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread::JoinHandle;

use crate::{
    cube::{
        root::{CubeRoot, Expansion},
        store::IngestionBuffer,
        VerdictCell,
    },
    misc::log::targets::{self},
    solver::{Engine, SolveReport, Terminator},
    structures::{Cube, Lit},
};

static INSTANCE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A generator thread and its ingestion buffer.
pub struct CubeGenerator {
    instance: usize,
    formula: Arc<Vec<Lit>>,
    root: Arc<CubeRoot>,
    buffer: Arc<IngestionBuffer>,
    terminator: Arc<Terminator>,
    verdict: Arc<VerdictCell>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CubeGenerator {
    pub fn new(
        formula: Arc<Vec<Lit>>,
        root: Arc<CubeRoot>,
        terminator: Arc<Terminator>,
        verdict: Arc<VerdictCell>,
    ) -> Self {
        CubeGenerator {
            instance: INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed),
            formula,
            root,
            buffer: Arc::new(IngestionBuffer::new()),
            terminator,
            verdict,
            handle: Mutex::new(None),
        }
    }

    /// The ingestion buffer of this generator, for registration with the root.
    pub fn buffer(&self) -> Arc<IngestionBuffer> {
        self.buffer.clone()
    }

    /// Reads the formula into fresh solvers and spawns the generator thread.
    pub fn start(&self) {
        let mut solver = Engine::new();
        let mut checker = Engine::new();
        solver.connect_terminator(self.terminator.clone());
        checker.connect_terminator(self.terminator.clone());

        for literal in self.formula.iter() {
            solver.add_literal(*literal);
            checker.add_literal(*literal);
        }

        let instance = self.instance;
        let root = self.root.clone();
        let buffer = self.buffer.clone();
        let terminator = self.terminator.clone();
        let verdict = self.verdict.clone();

        let handle = std::thread::spawn(move || {
            run(instance, root, buffer, terminator, verdict, solver, checker)
        });

        *self.handle.lock().unwrap() = Some(handle);
    }

    /// Joins the generator thread.
    ///
    /// The terminator must have been interrupted beforehand; this is checked.
    pub fn stop(&self) {
        assert!(self.terminator.is_interrupted());

        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

fn run(
    instance: usize,
    root: Arc<CubeRoot>,
    buffer: Arc<IngestionBuffer>,
    terminator: Arc<Terminator>,
    verdict: Arc<VerdictCell>,
    mut solver: Engine,
    mut checker: Engine,
) {
    let mut ingested_literals = 0_usize;
    let mut outcome = Expansion::default();

    while !terminator.is_interrupted() {
        // Publish the previous outcome and pull the next cube.
        let cube = root.exchange(outcome);
        outcome = Expansion::default();

        let clauses = buffer.drain();
        if !clauses.is_empty() {
            log::debug!(
                target: targets::GENERATOR,
                "Generator {instance}: ingesting failed clauses, stream length {}",
                clauses.len(),
            );

            for literal in &clauses {
                solver.add_literal(*literal);
                checker.add_literal(*literal);
            }

            ingested_literals += clauses.len();
        }

        generate(
            instance,
            cube,
            &mut solver,
            &mut checker,
            &mut outcome,
            &terminator,
            &verdict,
            ingested_literals,
        );

        if verdict.get().is_decided() {
            return;
        }
    }

    log::debug!(target: targets::GENERATOR, "Generator {instance}: leaving the main loop");
}

#[allow(clippy::too_many_arguments)]
fn generate(
    instance: usize,
    cube: Option<Cube>,
    solver: &mut Engine,
    checker: &mut Engine,
    outcome: &mut Expansion,
    terminator: &Terminator,
    verdict: &VerdictCell,
    ingested_literals: usize,
) {
    let Some(cube) = cube else {
        log::trace!(target: targets::GENERATOR, "Generator {instance}: no cube available");
        return;
    };

    log::trace!(
        target: targets::GENERATOR,
        "Generator {instance}: checking a cube with size {}",
        cube.len(),
    );

    for literal in cube.path() {
        checker.assume(*literal);
    }

    match checker.solve() {
        SolveReport::Satisfiable => {
            // The cube is consistent with everything learned.
        }

        SolveReport::Unknown => {
            debug_assert!(terminator.is_interrupted());
            return;
        }

        SolveReport::Unsatisfiable => {
            let failed: Vec<Lit> = cube
                .path()
                .iter()
                .copied()
                .filter(|literal| checker.failed(*literal))
                .collect();

            if failed.is_empty() {
                log::info!(
                    target: targets::GENERATOR,
                    "Generator {instance}: found a solution: UNSAT, ingested {ingested_literals} literals",
                );

                // The ingested failed cubes alone are unsatisfiable.
                verdict.set(SolveReport::Unsatisfiable, &[]);
            } else {
                outcome.cube = Some(cube);
                outcome.failed = Some(failed);
            }

            return;
        }
    }

    log::trace!(
        target: targets::GENERATOR,
        "Generator {instance}: expanding a cube with size {}",
        cube.len(),
    );

    for literal in cube.path() {
        solver.assume(*literal);
    }

    let split = solver.lookahead();

    if split == 0 {
        if terminator.is_interrupted() {
            return;
        }

        if solver.status() == SolveReport::Unknown {
            // Split literal and status both undecided: solve to force a verdict.
            log::debug!(
                target: targets::GENERATOR,
                "Generator {instance}: lookahead and status undecided, solving",
            );

            for literal in cube.path() {
                solver.assume(*literal);
            }
            solver.solve();
        }

        match solver.status() {
            SolveReport::Satisfiable => {
                log::info!(
                    target: targets::GENERATOR,
                    "Generator {instance}: found a solution: SAT, cube size {}, ingested {ingested_literals} literals",
                    cube.len(),
                );

                verdict.set(SolveReport::Satisfiable, solver.model());
            }

            SolveReport::Unsatisfiable => {
                let failed: Vec<Lit> = cube
                    .path()
                    .iter()
                    .copied()
                    .filter(|literal| solver.failed(*literal))
                    .collect();

                if failed.is_empty() {
                    log::info!(
                        target: targets::GENERATOR,
                        "Generator {instance}: found a solution: UNSAT, cube size {}, ingested {ingested_literals} literals",
                        cube.len(),
                    );

                    verdict.set(SolveReport::Unsatisfiable, &[]);
                } else {
                    outcome.cube = Some(cube);
                    outcome.failed = Some(failed);
                }
            }

            SolveReport::Unknown => {
                // Interrupted during the fallback solve.
                debug_assert!(terminator.is_interrupted());
            }
        }

        return;
    }

    log::trace!(target: targets::GENERATOR, "Generator {instance}: found split literal {split}");

    outcome.cube = Some(cube);
    outcome.split = split;
}
