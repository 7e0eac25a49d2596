use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::errors::ApplyError;
use super::runner::{CommandOutput, CommandRunner};

/// The IPv4 part of a connection that an apply rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ipv4Settings {
    /// Static address. `dns` is left alone on the connection when `None`.
    Manual {
        address: String,
        gateway: String,
        dns: Option<String>,
    },
    /// DHCP, with any manual address, gateway and DNS cleared.
    Auto,
}

/// Thin wrapper that owns every nmcli argument list.
#[derive(Clone)]
pub struct Nmcli {
    runner: Arc<dyn CommandRunner>,
    program: PathBuf,
}

impl Nmcli {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Name of the first active connection, un-escaped.
    ///
    /// Any failure (launch error, nonzero exit, empty listing) is `None`.
    pub async fn active_connection(&self) -> Option<String> {
        let args = strings(&["-t", "-f", "NAME", "connection", "show", "--active"]);
        match self.runner.run(&self.program, &args).await {
            Ok(out) if out.success => {
                let name = first_connection_name(&out.stdout);
                debug!("Active connection: {:?}", name);
                name
            }
            Ok(out) => {
                warn!("Listing active connections failed: {}", out.stderr.trim());
                None
            }
            Err(e) => {
                warn!("Error getting active connection: {e}");
                None
            }
        }
    }

    pub async fn modify(&self, connection: &str, settings: &Ipv4Settings) -> Result<(), ApplyError> {
        let args = modify_args(connection, settings);
        let out = self.runner.run(&self.program, &args).await?;
        if out.success {
            Ok(())
        } else {
            Err(ApplyError::Rejected { stderr: out.stderr })
        }
    }

    pub async fn down(&self, connection: &str) -> std::io::Result<CommandOutput> {
        self.runner
            .run(&self.program, &strings(&["connection", "down", connection]))
            .await
    }

    pub async fn up(&self, connection: &str) -> std::io::Result<CommandOutput> {
        self.runner
            .run(&self.program, &strings(&["connection", "up", connection]))
            .await
    }
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn modify_args(connection: &str, settings: &Ipv4Settings) -> Vec<String> {
    let mut args = strings(&["connection", "modify", connection]);
    match settings {
        Ipv4Settings::Manual {
            address,
            gateway,
            dns,
        } => {
            args.extend(strings(&[
                "ipv4.method",
                "manual",
                "ipv4.addresses",
                address.as_str(),
                "ipv4.gateway",
                gateway.as_str(),
            ]));
            if let Some(dns) = dns.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
                args.extend(strings(&["ipv4.dns", dns]));
            }
        }
        Ipv4Settings::Auto => {
            args.extend(strings(&[
                "ipv4.method",
                "auto",
                "ipv4.addresses",
                "",
                "ipv4.gateway",
                "",
                "ipv4.dns",
                "",
            ]));
        }
    }
    args
}

/// First non-blank line of a terse `NAME` listing with nmcli's escaping
/// removed. Only the line ending is stripped; spaces belong to the name.
pub(crate) fn first_connection_name(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .find(|line| !line.trim().is_empty())
        .map(unescape)
}

/// Removes one level of backslash escaping: `\:` becomes `:`, `\\` becomes `\`.
pub(crate) fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
