use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test harness for running CLI commands with temporary databases
pub struct CliTestHarness {
    temp_dir: TempDir,
    db_path: PathBuf,
}

impl CliTestHarness {
    /// Create a new test harness with a temporary database
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");

        Self { temp_dir, db_path }
    }

    /// Get a Command instance configured for testing
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("almanac").expect("Failed to find almanac binary");

        // Run inside the temp dir so no almanac.toml from the checkout is picked up.
        cmd.current_dir(self.temp_dir.path());
        cmd.env("ALMANAC_DATABASE_PATH", &self.db_path);
        cmd.env_remove("RUST_LOG");

        cmd
    }

    /// Helper to run a command and assert success
    pub fn run_success(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().success()
    }

    /// Helper to run a command and assert failure
    pub fn run_failure(&self, args: &[&str]) -> assert_cmd::assert::Assert {
        self.command().args(args).assert().failure()
    }
}

/// Common test fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Wednesdays at 10:00 through 2024
    pub fn weekly_rule_args() -> Vec<&'static str> {
        vec![
            "add", "weekly", "Team sync",
            "--from", "2024-01-01",
            "--until", "2024-12-31",
            "--at", "10:00",
            "--on", "wed",
        ]
    }

    /// February 29th at 09:00, 2023 through 2030
    pub fn leap_day_rule_args() -> Vec<&'static str> {
        vec![
            "add", "yearly", "Leap anniversary",
            "--from", "2023-01-01",
            "--until", "2030-12-31",
            "--at", "09:00",
            "--date", "02-29",
        ]
    }
}

/// Reusable output predicates
pub mod assertions {
    use super::*;

    pub fn rule_created_successfully() -> impl Predicate<str> {
        predicate::str::contains("✓ Created")
    }

    pub fn error_reported(message: &'static str) -> impl Predicate<str> {
        predicate::str::contains("Error:").and(predicate::str::contains(message))
    }
}
