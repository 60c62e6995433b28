//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for driving the rvt binary against an isolated
//! state directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Returns a Command configured to run the rvt binary
pub fn rvt_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin("rvt"))
}

/// Create a CLI builder for rvt commands
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            dir: None,
            envs: vec![
                ("NO_COLOR".into(), "1".into()),
                ("RVT_USER".into(), "operator".into()),
            ],
        }
    }

    /// Add CLI arguments
    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set working directory
    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    /// Set environment variable
    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = rvt_cmd();
        cmd.args(&self.args);

        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }

        // Keep the caller's config and log filter out of the specs.
        cmd.env_remove("RVT_CONFIG");
        cmd.env_remove("RUST_LOG");

        for (key, value) in self.envs {
            cmd.env(key, value);
        }

        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    /// Parse stdout as JSON (for `-o json` runs).
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.output.stdout).expect("stdout should be JSON")
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }
}

// =============================================================================
// Workspace
// =============================================================================

/// Temporary working directory plus an isolated state directory.
pub struct Workspace {
    dir: tempfile::TempDir,
    state_dir: tempfile::TempDir,
}

impl Workspace {
    pub fn empty() -> Self {
        let ws = Self {
            dir: tempfile::tempdir().unwrap(),
            state_dir: tempfile::tempdir().unwrap(),
        };
        // Desktop popups have no place in a test run.
        ws.state_file("config.toml", "[notify]\nbackend = \"none\"\n");
        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_path(&self) -> &Path {
        self.state_dir.path()
    }

    /// Write a file in the working directory
    pub fn file(&self, path: impl AsRef<Path>, content: &str) {
        let full_path = self.dir.path().join(path.as_ref());
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full_path, content).unwrap();
    }

    /// Write a file in the state directory
    pub fn state_file(&self, path: impl AsRef<Path>, content: &str) {
        std::fs::write(self.state_dir.path().join(path.as_ref()), content).unwrap();
    }

    /// Run rvt in this workspace's context
    pub fn rvt(&self) -> CliBuilder {
        cli()
            .pwd(self.path())
            .env("RVT_STATE_DIR", self.state_path())
    }
}

/// A one-step RelVal whose approval needs no remote calls: concrete
/// conditions and no input dataset.
pub const DRIVER_DRAFT: &str = r#"{
    "cmssw_release": "CMSSW_14_0_0",
    "batch_name": "fall",
    "workflow_name": "TTbar",
    "scram_arch": "el8_amd64_gcc12",
    "steps": [
        {
            "name": "GEN-SIM",
            "spec": {
                "type": "command_driven",
                "command": "cmsDriver.py TTbar_14TeV_TuneCP5_cfi",
                "conditions": "140X_mcRun3_2024_realistic_v1",
                "datatiers": ["GEN-SIM"]
            }
        }
    ]
}"#;

/// Id minted for the first RelVal created from [`DRIVER_DRAFT`].
pub const FIRST_ID: &str = "CMSSW_14_0_0__fall-TTbar-00001";
