//! A request to adopt a node of a job's tree.
//!
//! Valid only between [commit](crate::job::Job::commit) and a subsequent start or
//! [uncommit](crate::job::Job::uncommit).

use crate::cube::comm::Rank;

/// A balancer request binding a process to a node of a job's tree.
#[derive(Clone, Copy, Debug)]
pub struct JobRequest {
    /// The job the request belongs to.
    pub job_id: i32,

    /// The rank which issued the request --- the parent in the tree.
    pub requesting_node_rank: Rank,

    /// The tree index the receiving process is to adopt.
    pub requested_node_index: usize,

    /// The rank of the job's root process.
    pub root_rank: Rank,
}
