// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-facing errors with context and suggestions

use std::fmt;
use std::path::Path;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct CliError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn workflow_not_found(path: &Path) -> Self {
        CliError::new(format!("workflow file {} not found", path.display()))
            .with_context("oc looks for .oc/workflow.toml in the project root by default")
            .with_suggestion("Create .oc/workflow.toml")
            .with_suggestion("Pass a workflow explicitly: oc run --file <path>")
    }

    pub fn run_not_found(id: &str) -> Self {
        CliError::new(format!("run `{}` not found", id))
            .with_context("The run may have been pruned")
            .with_suggestion("List recorded runs: oc runs")
    }

    pub fn ambiguous_run(prefix: &str, count: usize) -> Self {
        CliError::new(format!("run id prefix `{}` matches {} runs", prefix, count))
            .with_suggestion("Use a longer prefix or the full id from: oc runs")
    }

    pub fn bad_secret(entry: &str, reason: &str) -> Self {
        CliError::new(format!("invalid secret `{}`: {}", entry, reason))
            .with_suggestion("Use --secret NAME=VALUE, or --secret NAME to read $NAME")
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for CliError {}
