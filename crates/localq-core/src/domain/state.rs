//! Instance state as observed on disk.

use serde::{Deserialize, Serialize};

/// Classification of one instance directory.
///
/// Derived from which of the three artifacts exist; nothing is cached.
///
/// Transitions driven by this crate:
/// - (new) -> Locked -> Ready            (send)
/// - Ready -> Locked -> removed          (execute, success)
/// - Ready -> Locked -> Errored          (execute, failure)
///
/// `Incomplete` only appears when a producer died between creating the
/// directory and writing its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    /// Directory does not exist.
    Missing,

    /// Directory exists but holds no payload, lock or error.
    Incomplete,

    /// Payload present, unlocked, no error. Eligible for claiming.
    Ready,

    /// Lock file present: being written or being executed.
    Locked,

    /// Error file present: dead-lettered until an operator intervenes.
    Errored,
}

impl InstanceState {
    /// Classify from artifact presence. An error file wins over a lock.
    pub fn classify(exists: bool, has_payload: bool, is_locked: bool, has_error: bool) -> Self {
        if !exists {
            InstanceState::Missing
        } else if has_error {
            InstanceState::Errored
        } else if is_locked {
            InstanceState::Locked
        } else if has_payload {
            InstanceState::Ready
        } else {
            InstanceState::Incomplete
        }
    }

    pub fn is_ready(self) -> bool {
        matches!(self, InstanceState::Ready)
    }
}
