/*!
The capability seam between a job's lifecycle and its application.

A [Job](crate::job::Job) owns its application behind this trait and drives it on
lifecycle transitions.
The application never reaches back into the job: everything it needs --- description,
tree view --- arrives as arguments, and everything it produces is pulled through
[result](JobApplication::result).
*/

use crate::{
    cube::comm::{JobMessage, Rank},
    job::{description::JobDescription, result::JobResult, tree::JobTree},
};

/// The operations a job application provides to the lifecycle.
pub trait JobApplication: Send {
    /// Begins solving under the given description.
    ///
    /// `threads` is the solver thread count settled by the job, after any cut
    /// against the per-process literal limit.
    fn start(&mut self, description: &JobDescription, tree: &JobTree, threads: usize);

    /// Tears solving down, leaving the application restartable.
    fn stop(&mut self);

    /// Pauses solving without releasing resources.
    fn suspend(&mut self);

    /// Resumes paused solving.
    fn resume(&mut self);

    /// Interrupts solving; the application settles into an inert, restartable state.
    fn interrupt(&mut self);

    /// Begins solving anew under an updated description.
    fn restart(&mut self, description: &JobDescription, tree: &JobTree, threads: usize);

    /// Interrupts and releases everything; cleanup may complete in the background.
    fn terminate(&mut self);

    /// True iff the application has a message to dispatch.
    fn wants_to_begin_communication(&self) -> bool;

    /// Dispatches exactly one message.
    fn begin_communication(&mut self);

    /// Applies an inbound message, on the event thread.
    fn communicate(&mut self, source: Rank, message: JobMessage);

    /// True iff background cleanup has completed.
    fn is_destructible(&self) -> bool;

    /// The application's result, once one exists.
    fn result(&mut self) -> Option<JobResult>;

    /// A demand the application substitutes for the job's own, if any.
    ///
    /// Used to hold the demand of a job at one while its initialization runs.
    fn demand_override(&self) -> Option<i32> {
        None
    }
}
