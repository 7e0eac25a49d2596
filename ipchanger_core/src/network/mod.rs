pub mod errors;
pub mod nmcli;
pub mod runner;

pub use errors::{ApplyError, CycleWarning};
pub use nmcli::{Ipv4Settings, Nmcli};
pub use runner::{CommandOutput, CommandRunner, TokioCommandRunner};
