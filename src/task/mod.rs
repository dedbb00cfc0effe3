//! Task lifecycle: submission to a backend and waiting for its result.
//!
//! - [`dispatcher`]: builds the generation payload and submits it
//! - [`poller`]: polls task status with bounded backoff until a terminal state

pub mod dispatcher;
pub mod poller;

use std::fmt;

/// Lifecycle of one task as seen from the gateway.
///
/// `Submitted -> Pending -> {Completed | Failed}`; `Pending` may repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Submitted,
    Pending,
    Completed,
    Failed,
}

impl TaskState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Submitted, TaskState::Pending)
                | (TaskState::Pending, TaskState::Pending)
                | (TaskState::Pending, TaskState::Completed)
                | (TaskState::Pending, TaskState::Failed)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Submitted => write!(f, "submitted"),
            TaskState::Pending => write!(f, "pending"),
            TaskState::Completed => write!(f, "completed"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}
