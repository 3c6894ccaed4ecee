// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local process runner

use super::{parse_output_file, CommandOutput, CommandRequest, CommandRunner, Program, RunnerError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Runs shell steps with `sh -c` and actions from a local directory.
///
/// An action `owner/name@ref` resolves to `<actions_dir>/owner/name/ref/run`.
#[derive(Clone, Debug)]
pub struct ShellRunner {
    actions_dir: PathBuf,
}

impl ShellRunner {
    pub fn new(actions_dir: impl Into<PathBuf>) -> Self {
        Self {
            actions_dir: actions_dir.into(),
        }
    }

    /// Executable for an action, if installed
    pub fn action_path(&self, owner: &str, name: &str, git_ref: &str) -> PathBuf {
        self.actions_dir
            .join(owner)
            .join(name)
            .join(git_ref)
            .join("run")
    }

    fn command(&self, program: &Program) -> Result<Command, RunnerError> {
        match program {
            Program::Shell { script } => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(script);
                Ok(cmd)
            }
            Program::Action {
                owner,
                name,
                git_ref,
            } => {
                let path = self.action_path(owner, name, git_ref);
                if !path.is_file() {
                    return Err(RunnerError::ActionNotFound {
                        action: program.to_string(),
                        path,
                    });
                }
                let mut cmd = Command::new(&path);
                if let Some(dir) = path.parent() {
                    cmd.env("OC_ACTION_PATH", dir);
                }
                Ok(cmd)
            }
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, request: CommandRequest) -> Result<CommandOutput, RunnerError> {
        let mut cmd = self.command(&request.program)?;

        if let Some(parent) = request.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&request.output_path, b"").await?;

        cmd.current_dir(&request.cwd)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env("OC_OUTPUT", &request.output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = cmd.output().await.map_err(|source| RunnerError::Spawn {
            program: request.program.to_string(),
            source,
        })?;

        let outputs = match tokio::fs::read_to_string(&request.output_path).await {
            Ok(content) => parse_output_file(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Default::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(CommandOutput {
            // Killed by a signal: report as the shell would (128 + signal)
            exit_code: output.status.code().unwrap_or_else(|| signal_code(&output.status)),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            outputs,
        })
    }
}

#[cfg(unix)]
fn signal_code(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|s| 128 + s).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_code(_status: &std::process::ExitStatus) -> i32 {
    -1
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
