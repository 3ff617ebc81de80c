/*!
The solver seam --- the adapter surface the engine consumes, and a reference engine
behind it.

# The adapter surface

Every component which solves does so through the same narrow surface:

- [add_literal](GenericEngine::add_literal) appends to the formula, with `0` closing
  the clause under construction.
- [assume](GenericEngine::assume) stages an assumption, valid until the next
  [solve](GenericEngine::solve) or [lookahead](GenericEngine::lookahead).
- [solve](GenericEngine::solve) returns a [SolveReport], `10`/`20`/`0` coded.
- [lookahead](GenericEngine::lookahead) selects a branching literal, with `0`
  signalling the assumed formula was decided without branching --- in which case
  [status](GenericEngine::status) holds the verdict.
- [failed](GenericEngine::failed) inspects the failed-assumption core after an
  unsatisfiable solve.
- [connect_terminator](GenericEngine::connect_terminator) attaches the shared
  [Terminator], polled inside every long-running call.

# The reference engine

[GenericEngine] is a deliberately small iterative DPLL --- unit propagation by clause
sweeps, chronological backtracking, rng-leaned polarity on free decisions.
It exists so the cube protocol can be driven end-to-end without an external solver
library, and it honours the full adapter contract, including cooperative interruption
and the suspend gate.
*/

mod engine;
pub use engine::{Engine, GenericEngine};

mod report;
pub use report::SolveReport;

mod terminator;
pub use terminator::Terminator;
