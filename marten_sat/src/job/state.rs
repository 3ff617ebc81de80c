/*!
The lifecycle states of a job.

Transitions are restricted to the edges of the lifecycle graph; any other transition
is a programmer error and fails an assertion naming the source and target states.
*/

/// The lifecycle state of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    /// Constructed, and possibly committed, but not solving.
    Inactive,

    /// Solving.
    Active,

    /// Solving paused, volume withdrawn.
    Suspended,

    /// Interrupted, awaiting a restart or termination.
    Standby,

    /// Terminated. Terminal.
    Past,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => write!(f, "INACTIVE"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Suspended => write!(f, "SUSPENDED"),
            Self::Standby => write!(f, "STANDBY"),
            Self::Past => write!(f, "PAST"),
        }
    }
}
