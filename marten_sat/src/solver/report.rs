/*!
Verdicts of a solve, and their integer codes.
*/

/// High-level reports regarding a solve.
///
/// The integer codes follow the conventional exit codes of satisfiability solvers:
/// `10` for satisfiable, `20` for unsatisfiable, and `0` when no verdict was reached.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum SolveReport {
    /// The (assumed) formula is satisfiable.
    Satisfiable,

    /// The (assumed) formula is unsatisfiable.
    Unsatisfiable,

    /// No verdict --- the solve was interrupted, or has not happened.
    Unknown,
}

impl SolveReport {
    /// The integer code of the report.
    pub fn code(&self) -> i32 {
        match self {
            Self::Satisfiable => 10,
            Self::Unsatisfiable => 20,
            Self::Unknown => 0,
        }
    }

    /// The report with the given integer code, with unrecognised codes read as unknown.
    pub fn from_code(code: i32) -> Self {
        match code {
            10 => Self::Satisfiable,
            20 => Self::Unsatisfiable,
            _ => Self::Unknown,
        }
    }

    /// True iff the report is a verdict.
    pub fn is_decided(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for SolveReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Satisfiable => write!(f, "Satisfiable"),
            Self::Unsatisfiable => write!(f, "Unsatisfiable"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
