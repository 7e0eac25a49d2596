pub mod applier;

pub use applier::{
    ApplierConfig, ApplyOutcome, ApplyState, ConnectionApplier, CycleHandle, Notification,
    DEFAULT_CYCLE_DELAY,
};
