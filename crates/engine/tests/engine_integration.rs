// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

//! Integration tests for the Engine with the real shell runner
//!
//! Runs workflows end to end through `sh`, the local action directory,
//! the store and the run history.

use oc_adapters::{FakeNotifyAdapter, ShellRunner, TracedRunner};
use oc_core::{FakeClock, JobStatus, RunStatus, SecretStore, SequentialIdGen, TriggerEvent};
use oc_engine::{Engine, EngineConfig, EngineDeps, RunReport, RunRequest};
use oc_workflow::{parse_workflow, ParseOptions};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

type ShellEngine = Engine<TracedRunner<ShellRunner>, FakeNotifyAdapter, FakeClock, SequentialIdGen>;

fn make_engine(root: &Path) -> ShellEngine {
    let deps = EngineDeps {
        runner: TracedRunner::new(ShellRunner::new(root.join("actions"))),
        notifier: FakeNotifyAdapter::new(),
    };
    Engine::new(
        deps,
        FakeClock::new(),
        SequentialIdGen::new("run"),
        EngineConfig::default(),
        root.join("state"),
    )
}

fn install_action(root: &Path, owner: &str, name: &str, git_ref: &str, script: &str) {
    let dir = root.join("actions").join(owner).join(name).join(git_ref);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("run");
    fs::write(&path, script).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

async fn run(engine: &ShellEngine, root: &Path, workflow: &str) -> RunReport {
    let workflow = parse_workflow(workflow, &ParseOptions::default()).unwrap();
    let request = RunRequest {
        event: TriggerEvent::push("main"),
        secrets: SecretStore::new([("DEPLOY_TOKEN", "tok-123")]),
        source_dir: root.to_path_buf(),
    };
    engine
        .run(&workflow, request, CancellationToken::new())
        .await
        .unwrap()
}

// =============================================================================
// Shell steps
// =============================================================================

#[tokio::test]
async fn shell_steps_share_a_workspace_and_pass_outputs() {
    let temp = TempDir::new().unwrap();
    let engine = make_engine(temp.path());

    let report = run(
        &engine,
        temp.path(),
        r#"
name = "ci"
on = "push"
env = { GREETING = "hello" }

[job.build]
runs-on = "linux"
step = [
  { run = "echo \"$GREETING\" > greeting.txt" },
  { id = "read", run = "echo text=$(cat greeting.txt) >> \"$OC_OUTPUT\"" },
  { run = "test \"${{ steps.read.outputs.text }}\" = hello" },
]
"#,
    )
    .await;

    assert_eq!(report.status, RunStatus::Succeeded);
    let build = report.instance("build").unwrap();
    assert_eq!(build.outputs.get("text").map(String::as_str), Some("hello"));
    assert_eq!(build.steps.len(), 3);
}

#[tokio::test]
async fn step_logs_are_written_per_instance() {
    let temp = TempDir::new().unwrap();
    let engine = make_engine(temp.path());

    let report = run(
        &engine,
        temp.path(),
        r#"
name = "ci"
on = "push"

[job.test]
runs-on = "linux"
matrix = { os = ["linux", "macos"] }
step = [{ run = "echo testing on ${{ matrix.os }}" }]
"#,
    )
    .await;

    let logs = engine.history().run_dir(&report.run_id).join("logs");
    let macos = fs::read_to_string(logs.join("test-macos.log")).unwrap();
    assert!(macos.contains("testing on macos"), "{}", macos);
}

// =============================================================================
// Actions
// =============================================================================

#[tokio::test]
async fn actions_run_from_the_local_directory_with_inputs() {
    let temp = TempDir::new().unwrap();
    install_action(
        temp.path(),
        "acme",
        "greet",
        "v1.0.0",
        "#!/bin/sh\necho \"message=hi $INPUT_WHO\" >> \"$OC_OUTPUT\"\n",
    );
    let engine = make_engine(temp.path());

    let report = run(
        &engine,
        temp.path(),
        r#"
name = "ci"
on = "push"

[job.greet]
runs-on = "linux"
step = [{ uses = "acme/greet@v1.0.0", with = { who = "otter" } }]
"#,
    )
    .await;

    assert_eq!(report.status, RunStatus::Succeeded);
    let greet = report.instance("greet").unwrap();
    assert_eq!(greet.outputs.get("message").map(String::as_str), Some("hi otter"));
}

#[tokio::test]
async fn missing_action_fails_the_step() {
    let temp = TempDir::new().unwrap();
    let engine = make_engine(temp.path());

    let report = run(
        &engine,
        temp.path(),
        r#"
name = "ci"
on = "push"

[job.greet]
runs-on = "linux"
step = [{ uses = "acme/absent@v2" }]
"#,
    )
    .await;

    assert_eq!(report.status, RunStatus::Failed);
    let greet = report.instance("greet").unwrap();
    assert_eq!(greet.status, JobStatus::Failed);
    let reason = greet.reason.as_deref().unwrap();
    assert!(reason.contains("action acme/absent@v2 not found"), "{}", reason);
}

// =============================================================================
// Secrets
// =============================================================================

#[tokio::test]
async fn secrets_reach_steps_but_not_the_report() {
    let temp = TempDir::new().unwrap();
    let engine = make_engine(temp.path());

    let report = run(
        &engine,
        temp.path(),
        r#"
name = "ci"
on = "push"

[job.deploy]
runs-on = "linux"
permissions = ["secrets:read"]
step = [{ run = "test \"$TOKEN\" = tok-123 && echo seen=$TOKEN >> \"$OC_OUTPUT\"", env = { TOKEN = "${{ secrets.DEPLOY_TOKEN }}" } }]
"#,
    )
    .await;

    assert_eq!(report.status, RunStatus::Succeeded);
    let deploy = report.instance("deploy").unwrap();
    assert_eq!(deploy.outputs.get("seen").map(String::as_str), Some("***"));
    let saved = fs::read_to_string(engine.history().run_dir(&report.run_id).join("report.json")).unwrap();
    assert!(!saved.contains("tok-123"));
}
