//! Persisted failure history of one task instance (`<id>.error`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One failed execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub trace: String,
}

impl ErrorRecord {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            trace: trace.into(),
        }
    }
}

/// Ordered list of error records, oldest first. Stored as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorLog(Vec<ErrorRecord>);

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ErrorRecord) {
        self.0.push(record);
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&ErrorRecord> {
        self.0.last()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.0
    }
}
