//! Outcome of one `execute` call against a task instance.

use serde::{Deserialize, Serialize};

use super::ids::InstanceId;

/// What happened to the instance.
///
/// Serialized as SCREAMING_SNAKE_CASE so scan reports read the same in logs
/// and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    /// Executor succeeded; the instance directory was removed.
    Completed,

    /// Executor failed; an error record was appended and the lock released.
    DeadLettered,

    /// Another worker held the lock. Nothing was touched.
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub instance_id: InstanceId,
    pub kind: OutcomeKind,

    /// Executor message for `DeadLettered`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Outcome {
    pub fn completed(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            kind: OutcomeKind::Completed,
            reason: None,
        }
    }

    pub fn dead_lettered(instance_id: InstanceId, reason: impl Into<String>) -> Self {
        Self {
            instance_id,
            kind: OutcomeKind::DeadLettered,
            reason: Some(reason.into()),
        }
    }

    pub fn blocked(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            kind: OutcomeKind::Blocked,
            reason: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.kind == OutcomeKind::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_kind_serializes_as_screaming_snake() {
        let s = serde_json::to_string(&OutcomeKind::DeadLettered).unwrap();
        assert_eq!(s, "\"DEAD_LETTERED\"");

        let s = serde_json::to_string(&OutcomeKind::Blocked).unwrap();
        assert_eq!(s, "\"BLOCKED\"");
    }

    #[test]
    fn reason_is_omitted_when_absent() {
        let o = Outcome::completed(InstanceId::from_name("abc"));
        let v = serde_json::to_value(&o).unwrap();
        assert_eq!(v["kind"], "COMPLETED");
        assert!(v.get("reason").is_none());
    }
}
