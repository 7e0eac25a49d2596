//! A deterministic **in‑process stand‑in** for `nmcli`, implementing
//! `ipchanger_core::CommandRunner`.
//!
//! *  **From the test’s perspective**
//!    * Script how each nmcli verb (`show`, `modify`, `down`, `up`) answers
//!      with `respond(verb, FakeResponse::…)`.
//!    * Inspect every argument list the applier issued via `calls(verb)`
//!      or `invocations()`.
//!
//! *  Nothing is spawned, so the real async machinery (lock, cycle task,
//!    delay timer) runs against a scripted tool.
#![allow(dead_code)]

use async_trait::async_trait;
use ipchanger_core::{CommandOutput, CommandRunner};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum FakeResponse {
    Exit(CommandOutput),
    /// Behave as if the binary could not be started.
    LaunchError,
}

impl FakeResponse {
    pub fn ok(stdout: &str) -> Self {
        FakeResponse::Exit(CommandOutput {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        })
    }

    pub fn fail(stderr: &str) -> Self {
        FakeResponse::Exit(CommandOutput {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub args: Vec<String>,
    pub started: Instant,
    pub finished: Instant,
}

impl Invocation {
    pub fn verb(&self) -> &str {
        verb(&self.args)
    }
}

#[derive(Default)]
pub struct FakeRunner {
    responses: Mutex<HashMap<String, FakeResponse>>,
    latency: Mutex<HashMap<String, Duration>>,
    history: Mutex<Vec<Invocation>>,
}

/// The word after `connection`: `show`, `modify`, `down` or `up`.
fn verb(args: &[String]) -> &str {
    args.iter()
        .position(|a| a == "connection")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or("")
}

impl FakeRunner {
    /// Every verb succeeds with empty output until told otherwise, which
    /// means "no active connection" for `show`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner whose active connection listing prints `listing`.
    pub fn with_active(listing: &str) -> Self {
        Self::new().respond("show", FakeResponse::ok(listing))
    }

    pub fn respond(self, verb: &str, response: FakeResponse) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(verb.to_string(), response);
        self
    }

    /// Make `verb` take `delay` before it "exits".
    pub fn latency(self, verb: &str, delay: Duration) -> Self {
        self.latency.lock().unwrap().insert(verb.to_string(), delay);
        self
    }

    /// All invocations in start order.
    pub fn invocations(&self) -> Vec<Invocation> {
        let mut all = self.history.lock().unwrap().clone();
        all.sort_by_key(|i| i.started);
        all
    }

    pub fn calls(&self, verb: &str) -> Vec<Vec<String>> {
        self.invocations()
            .into_iter()
            .filter(|i| i.verb() == verb)
            .map(|i| i.args)
            .collect()
    }

    pub fn verbs(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|i| i.verb().to_string())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, _program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        let started = Instant::now();
        let verb = verb(args).to_string();

        let delay = self.latency.lock().unwrap().get(&verb).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.history.lock().unwrap().push(Invocation {
            args: args.to_vec(),
            started,
            finished: Instant::now(),
        });

        let response = self.responses.lock().unwrap().get(&verb).cloned();
        match response.unwrap_or_else(|| FakeResponse::ok("")) {
            FakeResponse::Exit(out) => Ok(out),
            FakeResponse::LaunchError => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "nmcli: No such file or directory",
            )),
        }
    }
}
