//! The result of a job.

use crate::{solver::SolveReport, structures::Lit};

/// A verdict, tagged with the job and the revision the verdict was reached under.
#[derive(Clone, Debug)]
pub struct JobResult {
    pub id: i32,

    /// The revision of the description in effect when the verdict was reached.
    pub revision: i32,

    pub result: SolveReport,

    /// A satisfying assignment, when the verdict is satisfiable.
    pub solution: Vec<Lit>,
}
