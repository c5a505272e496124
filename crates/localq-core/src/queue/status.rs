//! Status views over a queue directory (counts, find filters).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::InstanceState;

/// Per-state instance counts for one task type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub ready: usize,
    pub locked: usize,
    pub errored: usize,
    pub incomplete: usize,
}

impl QueueCounts {
    pub fn record(&mut self, state: InstanceState) {
        match state {
            InstanceState::Ready => self.ready += 1,
            InstanceState::Locked => self.locked += 1,
            InstanceState::Errored => self.errored += 1,
            InstanceState::Incomplete => self.incomplete += 1,
            InstanceState::Missing => {}
        }
    }

    pub fn total(&self) -> usize {
        self.ready + self.locked + self.errored + self.incomplete
    }
}

/// Which instances `TaskQueue::find` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    /// Dead-lettered.
    Error,
    /// Locked, or missing a payload: a claimer or producer may have died.
    Orphaned,
    /// Ready to be claimed.
    Open,
}

impl StatusFilter {
    pub fn matches(self, state: InstanceState) -> bool {
        match self {
            StatusFilter::All => state != InstanceState::Missing,
            StatusFilter::Error => state == InstanceState::Errored,
            StatusFilter::Orphaned => {
                matches!(state, InstanceState::Locked | InstanceState::Incomplete)
            }
            StatusFilter::Open => state == InstanceState::Ready,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "error" => Ok(StatusFilter::Error),
            "orphaned" => Ok(StatusFilter::Orphaned),
            "open" => Ok(StatusFilter::Open),
            other => Err(format!(
                "unknown status '{other}' (expected all, error, orphaned or open)"
            )),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusFilter::All => "all",
            StatusFilter::Error => "error",
            StatusFilter::Orphaned => "orphaned",
            StatusFilter::Open => "open",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_select_states() {
        assert!(StatusFilter::Open.matches(InstanceState::Ready));
        assert!(!StatusFilter::Open.matches(InstanceState::Locked));
        assert!(StatusFilter::Orphaned.matches(InstanceState::Incomplete));
        assert!(StatusFilter::Orphaned.matches(InstanceState::Locked));
        assert!(StatusFilter::Error.matches(InstanceState::Errored));
        assert!(!StatusFilter::All.matches(InstanceState::Missing));
    }

    #[test]
    fn parses_cli_names() {
        for filter in [
            StatusFilter::All,
            StatusFilter::Error,
            StatusFilter::Orphaned,
            StatusFilter::Open,
        ] {
            assert_eq!(filter.to_string().parse::<StatusFilter>(), Ok(filter));
        }
        assert!("stale".parse::<StatusFilter>().is_err());
    }

    #[test]
    fn counts_ignore_missing() {
        let mut counts = QueueCounts::default();
        counts.record(InstanceState::Ready);
        counts.record(InstanceState::Errored);
        counts.record(InstanceState::Missing);
        assert_eq!(counts.total(), 2);
    }
}
