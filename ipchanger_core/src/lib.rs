pub mod core;
pub mod network;
pub mod utils;

// re‑export ergonomic entry points
pub use crate::core::applier::{
    ApplierConfig, ApplyOutcome, ApplyState, ConnectionApplier, CycleHandle, Notification,
    DEFAULT_CYCLE_DELAY,
};
pub use crate::network::errors::{ApplyError, CycleWarning};
pub use crate::network::runner::{CommandOutput, CommandRunner, TokioCommandRunner};
