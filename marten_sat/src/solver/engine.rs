/*!
A reference engine behind the adapter surface.

# Overview

The engine casts a solve as an iterative DPLL loop over a trail of assignments:

- Assumptions are forced onto the trail before the loop, lowest first.
- Unit propagation sweeps the clauses until fixpoint or conflict.
- On fixpoint with a free atom, a decision is pushed; with no free atom the trail is
  a model.
- On conflict the trail unwinds chronologically to the most recent unflipped
  decision, which is flipped; with no such decision the assumed formula is
  unsatisfiable.

Roughly, the loop is as diagrammed:

```none
          +----------+
  +-------|  decide  |
  |       +----------+
  |            ⌃
  |            | fixpoint, and a free atom remains
  |            |
  |            |           +-----> satisfiable, if no atom is free
  ⌄   +-----------------+  |
--+-->|    propagate    |--+
  ⌃   +-----------------+  |
  |            |           +-----> unsatisfiable, if no decision can be flipped
  |            | conflict
  |            ⌄
  |      +-----------+
  +------| backtrack |
         +-----------+
```

# Failed-assumption cores

When a solve under assumptions is unsatisfiable the engine distinguishes an empty
core from a nonempty core by re-searching without assumptions: unsatisfiability of
the bare formula gives the empty core.
Otherwise a core is obtained from the assumptions by deletion --- each literal is
dropped in turn and kept out whenever the remainder stays unsatisfiable --- so the
reported core is minimal.

# Interruption and suspension

Every search step polls the connected [Terminator], and holds at its pause gate
while the owning engine is suspended.
An interrupted call reports [Unknown](SolveReport::Unknown) and leaves no core or
model behind.
*/

use std::sync::Arc;

use crate::{
    generic::splitmix::SplitMix64,
    misc::log::targets::{self},
    solver::{SolveReport, Terminator},
    structures::{Lit, STREAM_END},
};

/// An engine which uses [SplitMix64] as a source of randomness.
pub type Engine = GenericEngine<SplitMix64>;

/// A generic engine, parameterised to a source of randomness.
///
/// Requires a source of [rng](rand::Rng) which (also) implements
/// [Default](std::default::Default), used when leaning the polarity of a free
/// decision.
pub struct GenericEngine<R: rand::Rng + std::default::Default> {
    /// The formula, one literal vector per clause.
    clauses: Vec<Vec<Lit>>,

    /// The clause under construction through [add_literal](GenericEngine::add_literal).
    partial: Vec<Lit>,

    /// Assumptions staged for the next solve or lookahead.
    assumptions: Vec<Lit>,

    /// The failed-assumption core of the most recent unsatisfiable solve.
    failed: Vec<Lit>,

    /// The model of the most recent satisfiable solve.
    model: Vec<Lit>,

    /// The verdict of the most recent solve.
    status: SolveReport,

    /// The highest atom seen in the formula.
    max_atom: Lit,

    /// The probability of assigning positive polarity to a free decision.
    polarity_lean: f64,

    /// The connected terminator, if any.
    terminator: Option<Arc<Terminator>>,

    /// The source of rng.
    rng: R,
}

impl<R: rand::Rng + std::default::Default> Default for GenericEngine<R> {
    fn default() -> Self {
        GenericEngine {
            clauses: Vec::default(),
            partial: Vec::default(),
            assumptions: Vec::default(),
            failed: Vec::default(),
            model: Vec::default(),
            status: SolveReport::Unknown,
            max_atom: 0,
            polarity_lean: 0.0,
            terminator: None,
            rng: R::default(),
        }
    }
}

impl<R: rand::Rng + std::default::Default> GenericEngine<R> {
    pub fn new() -> Self {
        GenericEngine::default()
    }

    /// Connects the shared terminator, polled inside every long-running call.
    pub fn connect_terminator(&mut self, terminator: Arc<Terminator>) {
        self.terminator = Some(terminator);
    }

    /// Appends a literal to the formula, with the sentinel closing the current clause.
    pub fn add_literal(&mut self, literal: Lit) {
        match literal {
            STREAM_END => {
                let clause = std::mem::take(&mut self.partial);
                self.clauses.push(clause);
            }
            non_zero => {
                self.max_atom = self.max_atom.max(non_zero.abs());
                self.partial.push(non_zero);
            }
        }
    }

    /// Stages an assumption, valid until the next solve or lookahead.
    pub fn assume(&mut self, literal: Lit) {
        debug_assert!(literal != 0);
        self.assumptions.push(literal);
    }

    /// Determines the satisfiability of the formula under the staged assumptions.
    pub fn solve(&mut self) -> SolveReport {
        let assumptions = std::mem::take(&mut self.assumptions);
        self.solve_assuming(&assumptions)
    }

    /// The verdict of the most recent solve.
    pub fn status(&self) -> SolveReport {
        self.status
    }

    /// True iff the literal is part of the failed-assumption core of the most recent
    /// unsatisfiable solve.
    pub fn failed(&self, literal: Lit) -> bool {
        self.failed.contains(&literal)
    }

    /// The model of the most recent satisfiable solve.
    pub fn model(&self) -> &[Lit] {
        &self.model
    }

    /// Requests interruption of any in-flight call through the connected terminator.
    pub fn interrupt(&self) {
        if let Some(terminator) = &self.terminator {
            terminator.interrupt();
        }
    }

    /// Closes the pause gate of the connected terminator.
    pub fn suspend(&self) {
        if let Some(terminator) = &self.terminator {
            terminator.pause();
        }
    }

    /// Opens the pause gate of the connected terminator.
    pub fn resume(&self) {
        if let Some(terminator) = &self.terminator {
            terminator.unpause();
        }
    }

    /// Selects a branching literal under the staged assumptions.
    ///
    /// Returns `0` when the assumed formula was decided without branching, in which
    /// case [status](GenericEngine::status) holds the verdict --- unless the call was
    /// interrupted, in which case the status remains unknown.
    pub fn lookahead(&mut self) -> Lit {
        let assumptions = std::mem::take(&mut self.assumptions);

        self.failed.clear();
        self.model.clear();
        self.status = SolveReport::Unknown;

        let mut trail = Trail::new(self.width(&assumptions));

        for assumption in &assumptions {
            match trail.value_of(*assumption) {
                Some(true) => {}
                Some(false) => {
                    self.conclude_unsatisfiable(&assumptions);
                    return 0;
                }
                None => trail.force(*assumption),
            }
        }

        match self.propagate(&mut trail) {
            Propagation::Interrupted => 0,

            Propagation::Conflict => {
                self.conclude_unsatisfiable(&assumptions);
                0
            }

            Propagation::Fixpoint => match self.informed_literal(&trail) {
                Some(literal) => literal,

                None => {
                    // Fixpoint with every clause satisfied, so any completion models.
                    self.model = trail.completed_model();
                    self.status = SolveReport::Satisfiable;
                    0
                }
            },
        }
    }

    fn solve_assuming(&mut self, assumptions: &[Lit]) -> SolveReport {
        self.failed.clear();
        self.model.clear();
        self.status = SolveReport::Unknown;

        match self.search(assumptions) {
            Outcome::Interrupted => {
                log::trace!(target: targets::SOLVER, "Search interrupted");
            }

            Outcome::Satisfiable(model) => {
                self.model = model;
                self.status = SolveReport::Satisfiable;
            }

            Outcome::Unsatisfiable => self.conclude_unsatisfiable(assumptions),
        }

        self.status
    }

    /// Settles the status and core after an unsatisfiable search under assumptions.
    fn conclude_unsatisfiable(&mut self, assumptions: &[Lit]) {
        if assumptions.is_empty() {
            self.status = SolveReport::Unsatisfiable;
            return;
        }

        match self.search(&[]) {
            Outcome::Interrupted => {}

            Outcome::Unsatisfiable => {
                // The bare formula is unsatisfiable, and the core is empty.
                self.status = SolveReport::Unsatisfiable;
            }

            Outcome::Satisfiable(_) => match self.shrink_core(assumptions) {
                Some(core) => {
                    self.failed = core;
                    self.status = SolveReport::Unsatisfiable;
                }

                None => {}
            },
        }
    }

    /// A minimal unsatisfiable core of the given assumptions, by deletion.
    fn shrink_core(&mut self, assumptions: &[Lit]) -> Option<Vec<Lit>> {
        let mut core = assumptions.to_vec();

        let mut index = 0;
        while index < core.len() {
            let mut trial = core.clone();
            trial.remove(index);

            match self.search(&trial) {
                Outcome::Unsatisfiable => core = trial,
                Outcome::Satisfiable(_) => index += 1,
                Outcome::Interrupted => return None,
            }
        }

        Some(core)
    }

    fn search(&mut self, assumptions: &[Lit]) -> Outcome {
        let mut trail = Trail::new(self.width(assumptions));

        for assumption in assumptions {
            match trail.value_of(*assumption) {
                Some(true) => {}
                Some(false) => return Outcome::Unsatisfiable,
                None => trail.force(*assumption),
            }
        }

        'search_loop: loop {
            if self.should_stop() {
                return Outcome::Interrupted;
            }

            match self.propagate(&mut trail) {
                Propagation::Interrupted => return Outcome::Interrupted,

                Propagation::Conflict => {
                    if !trail.backtrack() {
                        return Outcome::Unsatisfiable;
                    }
                }

                Propagation::Fixpoint => match trail.free_atom() {
                    None => return Outcome::Satisfiable(trail.model()),

                    Some(atom) => {
                        let polarity = self.rng.gen_bool(self.polarity_lean);
                        trail.decide(if polarity { atom } else { -atom });
                        continue 'search_loop;
                    }
                },
            }
        }
    }

    /// Sweeps the clauses until fixpoint or conflict, forcing unit literals.
    fn propagate(&self, trail: &mut Trail) -> Propagation {
        loop {
            if self.should_stop() {
                return Propagation::Interrupted;
            }

            let mut change = false;

            'clause_sweep: for clause in &self.clauses {
                let mut open = 0;
                let mut unit = 0;

                for literal in clause {
                    match trail.value_of(*literal) {
                        Some(true) => continue 'clause_sweep,
                        Some(false) => {}
                        None => {
                            open += 1;
                            unit = *literal;
                        }
                    }
                }

                match open {
                    0 => return Propagation::Conflict,

                    1 => {
                        trail.force(unit);
                        change = true;
                    }

                    _ => {}
                }
            }

            if !change {
                return Propagation::Fixpoint;
            }
        }
    }

    /// The unassigned literal occurring most often in unsatisfied clauses.
    ///
    /// Ties break toward the lowest atom, and a positive literal over its negation.
    fn informed_literal(&self, trail: &Trail) -> Option<Lit> {
        let width = trail.width();
        let mut counts = vec![0_usize; 2 * (width + 1)];

        'clause_sweep: for clause in &self.clauses {
            for literal in clause {
                if trail.value_of(*literal) == Some(true) {
                    continue 'clause_sweep;
                }
            }

            for literal in clause {
                if trail.value_of(*literal).is_none() {
                    let atom = literal.unsigned_abs() as usize;
                    let slot = 2 * atom + usize::from(*literal < 0);
                    counts[slot] += 1;
                }
            }
        }

        let mut choice = None;
        let mut best = 0;

        for atom in 1..=width {
            for (slot, literal) in [
                (2 * atom, atom as Lit),
                (2 * atom + 1, -(atom as Lit)),
            ] {
                if counts[slot] > best {
                    best = counts[slot];
                    choice = Some(literal);
                }
            }
        }

        choice
    }

    fn should_stop(&self) -> bool {
        match &self.terminator {
            None => false,
            Some(terminator) => {
                terminator.hold_while_paused();
                terminator.is_interrupted()
            }
        }
    }

    fn width(&self, assumptions: &[Lit]) -> usize {
        let assumed = assumptions.iter().map(|l| l.abs()).max().unwrap_or(0);
        self.max_atom.max(assumed) as usize
    }
}

enum Outcome {
    Satisfiable(Vec<Lit>),
    Unsatisfiable,
    Interrupted,
}

enum Propagation {
    Conflict,
    Fixpoint,
    Interrupted,
}

/// The valuation under construction, with its assignment history.
struct Trail {
    values: Vec<Option<bool>>,
    entries: Vec<Entry>,
}

struct Entry {
    literal: Lit,
    decision: bool,
    flipped: bool,
}

impl Trail {
    fn new(width: usize) -> Self {
        Trail {
            values: vec![None; width + 1],
            entries: Vec::default(),
        }
    }

    fn width(&self) -> usize {
        self.values.len() - 1
    }

    fn value_of(&self, literal: Lit) -> Option<bool> {
        self.values[literal.unsigned_abs() as usize].map(|value| value == (literal > 0))
    }

    fn force(&mut self, literal: Lit) {
        self.assign(literal, false, false);
    }

    fn decide(&mut self, literal: Lit) {
        self.assign(literal, true, false);
    }

    fn assign(&mut self, literal: Lit, decision: bool, flipped: bool) {
        debug_assert!(self.value_of(literal).is_none());

        self.values[literal.unsigned_abs() as usize] = Some(literal > 0);
        self.entries.push(Entry {
            literal,
            decision,
            flipped,
        });
    }

    /// Unwinds to the most recent unflipped decision and flips it.
    ///
    /// Returns false iff no decision remains to flip.
    fn backtrack(&mut self) -> bool {
        while let Some(entry) = self.entries.pop() {
            self.values[entry.literal.unsigned_abs() as usize] = None;

            if entry.decision && !entry.flipped {
                self.assign(-entry.literal, true, true);
                return true;
            }
        }

        false
    }

    fn free_atom(&self) -> Option<Lit> {
        (1..self.values.len())
            .find(|atom| self.values[*atom].is_none())
            .map(|atom| atom as Lit)
    }

    fn model(&self) -> Vec<Lit> {
        (1..self.values.len())
            .filter_map(|atom| {
                self.values[atom].map(|value| if value { atom as Lit } else { -(atom as Lit) })
            })
            .collect()
    }

    /// As [model](Trail::model), with unassigned atoms completed negatively.
    fn completed_model(&self) -> Vec<Lit> {
        (1..self.values.len())
            .map(|atom| {
                match self.values[atom].unwrap_or(false) {
                    true => atom as Lit,
                    false => -(atom as Lit),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod engine_tests {
    use super::*;

    fn engine_with(clauses: &[&[Lit]]) -> Engine {
        let mut engine = Engine::new();
        for clause in clauses {
            for literal in *clause {
                engine.add_literal(*literal);
            }
            engine.add_literal(STREAM_END);
        }
        engine
    }

    #[test]
    fn empty_formula_is_satisfiable() {
        let mut engine = Engine::new();
        assert_eq!(engine.solve(), SolveReport::Satisfiable);
    }

    #[test]
    fn contradictory_units_are_unsatisfiable() {
        let mut engine = engine_with(&[&[1], &[-1]]);

        assert_eq!(engine.solve(), SolveReport::Unsatisfiable);
        assert!(!engine.failed(1));
    }

    #[test]
    fn model_satisfies_the_formula() {
        let mut engine = engine_with(&[&[1, 2], &[-1, 2], &[-2, 3]]);

        assert_eq!(engine.solve(), SolveReport::Satisfiable);

        let model = engine.model().to_vec();
        assert!(model.contains(&2));
        assert!(model.contains(&3));
    }

    #[test]
    fn failed_assumptions_restrict_to_the_conflict() {
        let mut engine = engine_with(&[&[-1, 2], &[-2]]);

        engine.assume(1);
        engine.assume(3);

        assert_eq!(engine.solve(), SolveReport::Unsatisfiable);
        assert!(engine.failed(1));
        assert!(!engine.failed(3));
    }

    #[test]
    fn unsatisfiable_formula_has_an_empty_core() {
        let mut engine = engine_with(&[&[1], &[-1]]);

        engine.assume(2);

        assert_eq!(engine.solve(), SolveReport::Unsatisfiable);
        assert!(!engine.failed(2));
    }

    #[test]
    fn assumptions_are_cleared_by_a_solve() {
        let mut engine = engine_with(&[&[-1]]);

        engine.assume(1);
        assert_eq!(engine.solve(), SolveReport::Unsatisfiable);
        assert_eq!(engine.solve(), SolveReport::Satisfiable);
    }

    #[test]
    fn lookahead_selects_a_branching_literal() {
        let mut engine = engine_with(&[&[1, 2], &[-1, 2]]);

        let split = engine.lookahead();
        assert_ne!(split, 0);
        assert_eq!(engine.status(), SolveReport::Unknown);
    }

    #[test]
    fn lookahead_decides_a_forced_formula() {
        let mut engine = engine_with(&[&[1], &[-1, 2]]);

        let split = engine.lookahead();
        assert_eq!(split, 0);
        assert_eq!(engine.status(), SolveReport::Satisfiable);
    }

    #[test]
    fn lookahead_reports_a_failed_path() {
        let mut engine = engine_with(&[&[-1, 2], &[-2]]);

        engine.assume(1);

        assert_eq!(engine.lookahead(), 0);
        assert_eq!(engine.status(), SolveReport::Unsatisfiable);
        assert!(engine.failed(1));
    }

    #[test]
    fn interrupted_solve_is_unknown() {
        let mut engine = engine_with(&[&[1, 2], &[-1, 2]]);

        let terminator = Arc::new(Terminator::new());
        engine.connect_terminator(terminator.clone());
        terminator.interrupt();

        assert_eq!(engine.solve(), SolveReport::Unknown);
    }
}
