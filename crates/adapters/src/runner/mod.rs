// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command execution for steps

mod output;
mod shell;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use output::parse_output_file;
pub use shell::ShellRunner;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeResponse, FakeRunner, RunnerCall};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("action {action} not found at {}", path.display())]
    ActionNotFound { action: String, path: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// Script run with `sh -c`
    Shell { script: String },
    /// Pinned local action
    Action {
        owner: String,
        name: String,
        git_ref: String,
    },
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Program::Shell { script } => f.write_str(script),
            Program::Action {
                owner,
                name,
                git_ref,
            } => write!(f, "{}/{}@{}", owner, name, git_ref),
        }
    }
}

/// A fully resolved command: program, working directory and environment
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub program: Program,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    /// File exported as `OC_OUTPUT` for `key=value` step outputs
    pub output_path: PathBuf,
}

/// Result of a command that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub outputs: BTreeMap<String, String>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs step commands.
///
/// Dropping the returned future must stop the command.
#[async_trait]
pub trait CommandRunner: Clone + Send + Sync + 'static {
    async fn run(&self, request: CommandRequest) -> Result<CommandOutput, RunnerError>;
}
