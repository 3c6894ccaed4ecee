// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oc run` - Run a workflow for a trigger event

use crate::adapters::make_engine;
use crate::error::CliError;
use crate::output::{self, OutputFormat};
use crate::render::ReportView;
use anyhow::Result;
use clap::Args;
use oc_core::{EventKind, RunStatus, SecretStore, TriggerEvent};
use oc_engine::{EngineConfig, EngineError, RunRequest};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Args)]
pub struct RunArgs {
    /// Workflow file (default: .oc/workflow.toml in the project root)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Trigger event: push, pull_request, tag or manual
    #[arg(long, default_value = "push", value_parser = parse_event_kind)]
    pub event: EventKind,

    /// Branch or tag the event refers to
    #[arg(long = "ref", default_value = "main")]
    pub git_ref: String,

    /// Who triggered the run
    #[arg(long, default_value = "local")]
    pub actor: String,

    /// Secret as NAME=VALUE, or NAME to read it from the environment
    #[arg(short, long = "secret", value_name = "NAME[=VALUE]")]
    pub secrets: Vec<String>,

    /// File of NAME=VALUE lines
    #[arg(long)]
    pub secrets_file: Option<PathBuf>,

    /// Maximum job instances running at once
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_event_kind(s: &str) -> Result<EventKind, String> {
    s.parse::<EventKind>().map_err(|e| e.to_string())
}

pub async fn run(root: &Path, args: RunArgs) -> Result<ExitCode> {
    let mut config = EngineConfig::load(root)?;
    if let Some(max_parallel) = args.max_parallel {
        config.max_parallel = max_parallel;
        config.validate()?;
    }
    let workflow = super::load(root, args.file.as_deref(), &config)?;

    let file_content = match &args.secrets_file {
        Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
            CliError::new(format!("cannot read secrets file {}", path.display()))
                .with_context(e.to_string())
        })?),
        None => None,
    };
    let secrets = collect_secrets(&args.secrets, file_content.as_deref(), |name| {
        std::env::var(name).ok()
    })?;

    let request = RunRequest {
        event: TriggerEvent::new(args.event, args.git_ref, args.actor),
        secrets: SecretStore::new(secrets),
        source_dir: root.to_path_buf(),
    };
    let engine = make_engine(root, config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("interrupted, cancelling run");
        on_interrupt.cancel();
    })?;

    let format = OutputFormat::from_json_flag(args.json);
    match engine.run(&workflow, request, cancel).await {
        Ok(report) => {
            output::print(&report, ReportView::summary(&report), format)?;
            Ok(exit_code(report.status))
        }
        Err(EngineError::NotTriggered { workflow, event }) => {
            println!("workflow `{}` is not triggered by {}", workflow, event);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn exit_code(status: RunStatus) -> ExitCode {
    match status {
        RunStatus::Succeeded => ExitCode::SUCCESS,
        RunStatus::Failed => ExitCode::from(1),
        RunStatus::Cancelled => ExitCode::from(130),
    }
}

/// Build the secret mapping from `--secret` flags and a secrets file.
///
/// Flags win over the file; a bare `NAME` flag reads `lookup(NAME)`.
pub fn collect_secrets(
    flags: &[String],
    file: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Vec<(String, String)>, CliError> {
    let mut secrets = Vec::new();
    if let Some(content) = file {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = line
                .split_once('=')
                .ok_or_else(|| CliError::bad_secret(line, "expected NAME=VALUE"))?;
            secrets.push((checked_name(name.trim(), line)?, value.to_string()));
        }
    }
    for flag in flags {
        let (name, value) = match flag.split_once('=') {
            Some((name, value)) => (name, value.to_string()),
            None => {
                let value = lookup(flag)
                    .ok_or_else(|| CliError::bad_secret(flag, "not set in the environment"))?;
                (flag.as_str(), value)
            }
        };
        secrets.push((checked_name(name, flag)?, value));
    }
    Ok(secrets)
}

fn checked_name(name: &str, entry: &str) -> Result<String, CliError> {
    if name.is_empty() {
        return Err(CliError::bad_secret(entry, "empty name"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    fn env(name: &str) -> Option<String> {
        (name == "FROM_ENV").then(|| "env-value".to_string())
    }

    #[test]
    fn flags_and_file_are_merged() {
        let file = "# deploy credentials\nAPI_KEY=abc=def\n\nREGION=eu\n";
        let flags = vec!["TOKEN=t0k".to_string(), "FROM_ENV".to_string()];

        let secrets = collect_secrets(&flags, Some(file), env).unwrap();

        assert_eq!(
            secrets,
            vec![
                ("API_KEY".to_string(), "abc=def".to_string()),
                ("REGION".to_string(), "eu".to_string()),
                ("TOKEN".to_string(), "t0k".to_string()),
                ("FROM_ENV".to_string(), "env-value".to_string()),
            ]
        );
    }

    #[parameterized(
        unset_env = { &["MISSING"], None, "not set in the environment" },
        empty_name = { &["=value"], None, "empty name" },
        file_line = { &[], Some("JUST_A_NAME"), "expected NAME=VALUE" },
    )]
    fn invalid_secrets(flags: &[&str], file: Option<&str>, reason: &str) {
        let flags: Vec<String> = flags.iter().map(|s| s.to_string()).collect();
        let err = collect_secrets(&flags, file, env).unwrap_err();
        assert!(err.message.ends_with(reason), "{}", err.message);
    }

    #[test]
    fn exit_codes_follow_run_status() {
        assert_eq!(exit_code(RunStatus::Succeeded), ExitCode::SUCCESS);
        assert_eq!(exit_code(RunStatus::Failed), ExitCode::from(1));
        assert_eq!(exit_code(RunStatus::Cancelled), ExitCode::from(130));
    }
}
