//! Crash test harness for subprocess management
//!
//! Runs the `flashsafe` binary, optionally with `FLASHSAFE_CRASH_POINT`
//! set, and parses the response line it prints.

use std::path::Path;
use std::process::{Command, ExitStatus};

use flashsafe::crash_point::CRASH_POINT_ENV;
use flashsafe::observability::LOG_LEVEL_ENV;
use serde_json::Value;

/// Result of one CLI invocation
#[derive(Debug)]
pub struct CliRun {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliRun {
    /// Whether the process ended without exiting normally
    pub fn crashed(&self) -> bool {
        !self.status.success() && self.response().is_none()
    }

    /// The last JSON object printed on stdout
    pub fn response(&self) -> Option<Value> {
        self.stdout
            .lines()
            .rev()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .find(|value| value.get("status").is_some())
    }

    /// `data` of a success response; panics with the output otherwise
    pub fn data(&self) -> Value {
        match self.response() {
            Some(response) if response["status"] == "ok" => response["data"].clone(),
            _ => panic!(
                "expected success\nstdout:\n{}\nstderr:\n{}",
                self.stdout, self.stderr
            ),
        }
    }

    /// `code` of an error response
    pub fn error_code(&self) -> Option<String> {
        let response = self.response()?;
        if response["status"] != "error" {
            return None;
        }
        response["code"].as_str().map(str::to_string)
    }
}

/// Run `flashsafe <command> --config <config> <args>`
pub fn run_flashsafe(config: &Path, command: &str, args: &[&str]) -> CliRun {
    execute(config, command, args, None)
}

/// Same as [`run_flashsafe`] with a crash point enabled
pub fn run_with_crash_point(
    crash_point: &str,
    config: &Path,
    command: &str,
    args: &[&str],
) -> CliRun {
    execute(config, command, args, Some(crash_point))
}

fn execute(config: &Path, command: &str, args: &[&str], crash_point: Option<&str>) -> CliRun {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_flashsafe"));
    cmd.arg(command)
        .arg("--config")
        .arg(config)
        .args(args)
        .env(LOG_LEVEL_ENV, "error")
        .env_remove(CRASH_POINT_ENV);
    if let Some(point) = crash_point {
        cmd.env(CRASH_POINT_ENV, point);
    }

    let output = cmd.output().expect("failed to spawn flashsafe");
    CliRun {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Print a crash test failure with everything needed to reproduce it
pub fn report_failure(crash_point: &str, operation: &str, expected: &str, run: &CliRun) {
    eprintln!("=== CRASH TEST FAILURE ===");
    eprintln!("Crash point: {}", crash_point);
    eprintln!("Operation: {}", operation);
    eprintln!("Expected: {}", expected);
    eprintln!("stdout:\n{}", run.stdout);
    eprintln!("stderr:\n{}", run.stderr);
    eprintln!("==========================");
}
