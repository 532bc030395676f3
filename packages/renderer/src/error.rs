use crate::arena::FiberId;
use thiserror::Error;
use trellis_dom::DomError;

/// Failure while applying one queued mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommitError {
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Element handle used before its create operation committed")]
    UnresolvedHandle,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Commit scheduler is closed")]
    Closed,

    #[error("Commit failed: {0}")]
    Commit(#[from] CommitError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Unknown fiber {0}")]
    UnknownFiber(FiberId),

    #[error("Fiber {0} has no mounted ancestor element")]
    Detached(FiberId),

    #[error("Update limit of {0} re-renders per pass exceeded")]
    TooManyUpdates(usize),

    #[error("Reconciler invariant violated: {0}")]
    Invariant(&'static str),
}

impl From<CommitError> for RenderError {
    fn from(err: CommitError) -> Self {
        RenderError::Scheduler(SchedulerError::Commit(err))
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
