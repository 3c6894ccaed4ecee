//! Shared helpers for CLI specs

#![allow(dead_code)]

use assert_cmd::assert::Assert;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Two-job workflow that passes
pub const MINIMAL_WORKFLOW: &str = r#"
name = "ci"
on = "push"

[job.build]
runs-on = "linux"
step = [{ run = "echo building" }]

[job.test]
runs-on = "linux"
needs = ["build"]
step = [{ run = "echo testing" }]
"#;

/// A project directory with its own isolated state directory
pub struct Project {
    dir: TempDir,
    state: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            state: TempDir::new().unwrap(),
        }
    }

    /// Project with `.oc/workflow.toml` holding `content`
    pub fn with_workflow(content: &str) -> Self {
        let project = Self::empty();
        project.file(".oc/workflow.toml", content);
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_path(&self) -> &Path {
        self.state.path()
    }

    pub fn file(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn oc(&self) -> Cli {
        let mut cmd = Command::cargo_bin("oc").unwrap();
        cmd.current_dir(self.dir.path())
            .env("OC_STATE_DIR", self.state.path())
            .env_remove("OC_LOG")
            .env_remove("OC_PROJECT_ROOT")
            .env_remove("OC_MAX_PARALLEL")
            .env_remove("OC_ACTIONS_DIR");
        Cli { cmd }
    }

    /// Id of the only recorded run
    pub fn only_run_id(&self) -> String {
        let runs = self.state.path().join("runs");
        let mut ids: Vec<String> = std::fs::read_dir(runs)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(ids.len(), 1, "expected one run, found {:?}", ids);
        ids.remove(0)
    }
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run and expect exit code 0
    pub fn passes(mut self) -> RunAssert {
        RunAssert(self.cmd.assert().success())
    }

    /// Run and expect the given exit code
    pub fn exits(mut self, code: i32) -> RunAssert {
        RunAssert(self.cmd.assert().code(code))
    }
}

pub struct RunAssert(Assert);

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.0.get_output().stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.0.get_output().stderr).into_owned()
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        Self(self.0.stdout(predicate::str::contains(needle)))
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        Self(self.0.stdout(predicate::str::contains(needle).not()))
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        Self(self.0.stderr(predicate::str::contains(needle)))
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout()).unwrap()
    }
}
