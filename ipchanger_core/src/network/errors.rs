use thiserror::Error;

/// Why an apply (or DHCP reset) did not take effect.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("No active connection found")]
    NoActiveConnection,
    /// nmcli exited nonzero; `stderr` is its diagnostic, untouched.
    #[error("{}", .stderr.trim())]
    Rejected { stderr: String },
    #[error("could not launch nmcli: {0}")]
    Launch(#[from] std::io::Error),
}

/// Non-fatal trouble while cycling a connection after a successful modify.
#[derive(Debug, Error)]
pub enum CycleWarning {
    #[error("bringing '{connection}' up failed: {}", .stderr.trim())]
    UpFailed { connection: String, stderr: String },
    #[error("could not launch nmcli: {0}")]
    Launch(#[from] std::io::Error),
    #[error("connection cycle cancelled")]
    Cancelled,
    #[error("connection cycle task failed: {0}")]
    Panicked(String),
}
