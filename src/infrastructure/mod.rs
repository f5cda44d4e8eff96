// Infrastructure module - Timers, retry policy and background task tracking
pub mod backoff;
pub mod heartbeat;
pub mod task_manager;
pub mod timer;

pub use backoff::{Backoff, BackoffPolicy};
pub use heartbeat::HeartbeatManager;
pub use task_manager::TaskManager;
pub use timer::Deadline;
