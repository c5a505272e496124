use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{ErrorKind, ExecutionError, ValidationError};
use crate::ports::FsError;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid task options: {0}")]
    Validation(#[from] ValidationError),

    #[error("io: {0}")]
    Io(#[from] FsError),

    #[error("payload codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("task '{0}' is already registered")]
    DuplicateRegistration(String),

    #[error("task '{0}' is not registered")]
    UnregisteredTask(String),

    #[error("lock already held: {}", .0.display())]
    LockHeld(PathBuf),

    #[error("attempt to release a lock that was not acquired: {}", .0.display())]
    LockMisuse(PathBuf),

    #[error("execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),

    #[error("worker failed: {0}")]
    Worker(String),

    #[error("config: {0}")]
    Config(String),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::LockHeld(_) => ErrorKind::Expected,
            QueueError::UnregisteredTask(_) | QueueError::LockMisuse(_) => ErrorKind::Fatal,
            QueueError::Validation(_)
            | QueueError::Execution(_)
            | QueueError::DuplicateRegistration(_)
            | QueueError::MissingTaskTypes(_)
            | QueueError::Config(_) => ErrorKind::Permanent,
            QueueError::Io(_) | QueueError::Codec(_) | QueueError::Worker(_) => {
                ErrorKind::Infrastructure
            }
        }
    }

    /// Programmer error: hosts may prefer to abort and restart.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programmer_errors_are_fatal() {
        assert!(QueueError::UnregisteredTask("stone".into()).is_fatal());
        assert!(QueueError::LockMisuse(PathBuf::from("/q/a.lock")).is_fatal());
        assert!(!QueueError::LockHeld(PathBuf::from("/q/a.lock")).is_fatal());
        assert_eq!(
            QueueError::LockHeld(PathBuf::from("/q/a.lock")).kind(),
            ErrorKind::Expected
        );
    }

    #[test]
    fn unregistered_message_names_the_task() {
        let err = QueueError::UnregisteredTask("stone".into());
        assert_eq!(err.to_string(), "task 'stone' is not registered");
    }
}
