//! Queue module: task instances, per-type queues and status views.

mod instance;
mod status;
mod task_queue;
mod typed;

pub use instance::TaskInstance;
pub use status::{QueueCounts, StatusFilter};
pub use task_queue::TaskQueue;
pub use typed::TypedQueue;
