// Monitor module - Idle and visibility tracking
pub mod environment;
pub mod idle;

pub use environment::{ActivityKind, EnvironmentEvent, EnvironmentHandle, Visibility};
pub use idle::{IdleAction, IdleMonitor};
