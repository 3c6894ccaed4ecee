// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake command runner for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CommandOutput, CommandRequest, CommandRunner, RunnerError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Recorded command invocation
#[derive(Debug, Clone)]
pub struct RunnerCall {
    /// Script text or `owner/name@ref`
    pub program: String,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl RunnerCall {
    pub fn env(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Scripted result for matching commands
#[derive(Debug, Clone, Default)]
pub struct FakeResponse {
    pub exit_code: i32,
    pub stdout: String,
    pub outputs: BTreeMap<String, String>,
    pub delay: Option<Duration>,
    /// Fail to start instead of running
    pub error: Option<String>,
}

impl FakeResponse {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    pub fn spawn_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Default)]
struct FakeState {
    rules: Vec<(String, FakeResponse)>,
    calls: Vec<RunnerCall>,
    running: usize,
    max_running: usize,
}

/// Fake runner: records every call and answers from registered rules.
///
/// The first rule whose pattern is contained in the program text wins;
/// unmatched commands succeed immediately.
#[derive(Clone, Default)]
pub struct FakeRunner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, pattern: impl Into<String>, response: FakeResponse) -> &Self {
        self.lock().rules.push((pattern.into(), response));
        self
    }

    pub fn calls(&self) -> Vec<RunnerCall> {
        self.lock().calls.clone()
    }

    /// Program text of every call, in start order
    pub fn programs(&self) -> Vec<String> {
        self.lock().calls.iter().map(|c| c.program.clone()).collect()
    }

    /// Highest number of commands that were running at once
    pub fn max_concurrent(&self) -> usize {
        self.lock().max_running
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Decrements the running count even when the future is dropped
struct RunningGuard(Arc<Mutex<FakeState>>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut state = self.0.lock().unwrap_or_else(|e| e.into_inner());
        state.running = state.running.saturating_sub(1);
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, request: CommandRequest) -> Result<CommandOutput, RunnerError> {
        let program = request.program.to_string();
        let response = {
            let mut state = self.lock();
            state.calls.push(RunnerCall {
                program: program.clone(),
                cwd: request.cwd.clone(),
                env: request.env.clone(),
            });
            state.running += 1;
            state.max_running = state.max_running.max(state.running);
            state
                .rules
                .iter()
                .find(|(pattern, _)| program.contains(pattern.as_str()))
                .map(|(_, response)| response.clone())
                .unwrap_or_default()
        };
        let _guard = RunningGuard(Arc::clone(&self.state));

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = response.error {
            return Err(RunnerError::Spawn {
                program,
                source: std::io::Error::other(message),
            });
        }
        Ok(CommandOutput {
            exit_code: response.exit_code,
            stdout: response.stdout,
            stderr: String::new(),
            outputs: response.outputs,
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
