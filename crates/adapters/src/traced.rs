// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability
//!
//! Script text and payloads are never logged here: they may carry
//! interpolated secrets. The executor logs the redacted form.

use crate::notify::{NotifyAdapter, NotifyError};
use crate::runner::{CommandOutput, CommandRequest, CommandRunner, Program, RunnerError};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any CommandRunner
#[derive(Clone)]
pub struct TracedRunner<R> {
    inner: R,
}

impl<R> TracedRunner<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: CommandRunner> CommandRunner for TracedRunner<R> {
    async fn run(&self, request: CommandRequest) -> Result<CommandOutput, RunnerError> {
        let kind = match &request.program {
            Program::Shell { .. } => "shell".to_string(),
            Program::Action { .. } => request.program.to_string(),
        };
        let span = tracing::info_span!("runner.run", program = %kind, cwd = %request.cwd.display());

        async move {
            tracing::info!(env_count = request.env.len(), "starting");

            // Precondition: cwd must exist
            if !request.cwd.is_dir() {
                tracing::error!("working directory does not exist");
                return Err(RunnerError::Spawn {
                    program: kind,
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("working directory does not exist: {}", request.cwd.display()),
                    ),
                });
            }

            let start = std::time::Instant::now();
            let result = self.inner.run(request).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(output) => tracing::info!(
                    exit_code = output.exit_code,
                    outputs = output.outputs.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "command finished"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "command failed to start"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any NotifyAdapter
#[derive(Clone)]
pub struct TracedNotifier<N> {
    inner: N,
}

impl<N> TracedNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<N: NotifyAdapter> NotifyAdapter for TracedNotifier<N> {
    async fn send(&self, endpoint: &str, payload: &serde_json::Value) -> Result<(), NotifyError> {
        let span = tracing::info_span!("notify.send", endpoint);
        async move {
            let start = std::time::Instant::now();
            let result = self.inner.send(endpoint, payload).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            // Delivery failures never fail a run
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "notification sent"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "notification failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
