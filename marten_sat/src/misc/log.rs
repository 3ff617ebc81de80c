/*!
Miscellaneous items related to [logging](log).

Calls to the log macro are made throughout the library.
These are intended to provide useful information for extending the library and/or fixing issues.

Note, no log implementation is provided.
For more details, see [log].
*/

/// Targets to be used within a [log]! macro.
pub mod targets {
    pub const COMM: &str = "comm";
    pub const GENERATOR: &str = "generator";
    pub const JOB: &str = "job";
    pub const ROOT: &str = "root";
    pub const SOLVER: &str = "solver";
    pub const STORE: &str = "store";
    pub const WORKER: &str = "worker";
}
