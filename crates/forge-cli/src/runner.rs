//! External command execution for configure and build invocations.

use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{info, warn};

/// Exit code reported when the program could not be found.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code reported when the command was killed by the timeout.
pub const EXIT_TIMED_OUT: i32 = -1;

/// A program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Kill the command after `secs` seconds; zero disables the limit.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    /// Shell-like rendering for logs and run records.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(|part| {
                if part.is_empty() || part.contains(char::is_whitespace) {
                    format!("\"{part}\"")
                } else {
                    part.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of one command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,

    /// Process exit code; 127 when not found, -1 on timeout or signal.
    pub exit_code: i32,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr, the form build inspection reads.
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            return self.stdout.clone();
        }
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        text.push_str(&self.stdout);
        if !self.stdout.is_empty() && !self.stdout.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&self.stderr);
        text
    }
}

/// Runs external commands on behalf of the CLI.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> anyhow::Result<CommandOutput>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> anyhow::Result<CommandOutput> {
        let started_at = Utc::now();
        let start = Instant::now();
        info!(event = "command.started", command = %spec.display());

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(event = "command.not_found", program = %spec.program);
                return Ok(finish(
                    String::new(),
                    format!("{}: command not found\n", spec.program),
                    EXIT_NOT_FOUND,
                    started_at,
                    start,
                ));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to spawn {}", spec.program));
            }
        };

        let waited = match spec.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .ok(),
            None => Some(child.wait_with_output().await),
        };

        let output = match waited {
            Some(result) => {
                let output =
                    result.with_context(|| format!("Failed to wait for {}", spec.program))?;
                finish(
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                    String::from_utf8_lossy(&output.stderr).into_owned(),
                    output.status.code().unwrap_or(EXIT_TIMED_OUT),
                    started_at,
                    start,
                )
            }
            None => {
                let secs = spec.timeout.map(|t| t.as_secs()).unwrap_or_default();
                warn!(event = "command.timed_out", program = %spec.program, timeout_secs = secs);
                finish(
                    String::new(),
                    format!("command timed out after {secs} seconds\n"),
                    EXIT_TIMED_OUT,
                    started_at,
                    start,
                )
            }
        };

        info!(
            event = "command.finished",
            exit_code = output.exit_code,
            duration_ms = output.duration_ms,
        );
        Ok(output)
    }
}

fn finish(
    stdout: String,
    stderr: String,
    exit_code: i32,
    started_at: DateTime<Utc>,
    start: Instant,
) -> CommandOutput {
    CommandOutput {
        stdout,
        stderr,
        exit_code,
        duration_ms: start.elapsed().as_millis() as u64,
        started_at,
        finished_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str) -> CommandOutput {
        let now = Utc::now();
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code: 0,
            duration_ms: 0,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_combined_joins_streams() {
        assert_eq!(output("out", "err").combined(), "out\nerr");
        assert_eq!(output("out\n", "err").combined(), "out\nerr");
        assert_eq!(output("out", "").combined(), "out");
        assert_eq!(output("", "err").combined(), "err");
    }

    #[test]
    fn test_spec_display_quotes_spaces() {
        let spec = CommandSpec::new("cmake")
            .args(["-S", "my project", "-B", "build"])
            .timeout_secs(0);
        assert_eq!(spec.display(), "cmake -S \"my project\" -B build");
        assert!(spec.timeout.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_simple_command() {
        let spec = CommandSpec::new("echo").arg("hello");
        let result = ProcessRunner.run(&spec).await.expect("run");
        assert!(result.success());
        assert!(result.stdout.contains("hello"));
        assert!(result.finished_at >= result.started_at);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_failing_command() {
        let result = ProcessRunner
            .run(&CommandSpec::new("false"))
            .await
            .expect("run");
        assert!(!result.success());
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_missing_program_exits_127() {
        let spec = CommandSpec::new("forge-definitely-not-a-real-program");
        let result = ProcessRunner.run(&spec).await.expect("run");
        assert_eq!(result.exit_code, EXIT_NOT_FOUND);
        assert!(result.stderr.contains("command not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_reports_minus_one() {
        let spec = CommandSpec::new("sleep").arg("5").timeout_secs(1);
        let result = ProcessRunner.run(&spec).await.expect("run");
        assert_eq!(result.exit_code, EXIT_TIMED_OUT);
        assert!(result.stderr.contains("timed out after 1 seconds"));
        assert!(result.duration_ms < 5_000);
    }
}
