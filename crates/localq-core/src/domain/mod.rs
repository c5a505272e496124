//! Domain model (ids, instance state, outcomes, error records).

pub mod error_log;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod state;

pub use self::error_log::{ErrorLog, ErrorRecord};
pub use self::errors::{ErrorKind, ExecutionError, ValidationError};
pub use self::ids::InstanceId;
pub use self::outcome::{Outcome, OutcomeKind};
pub use self::state::InstanceState;
