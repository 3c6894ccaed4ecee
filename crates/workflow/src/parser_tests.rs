// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job::{Access, Scope};
use oc_core::TriggerEvent;
use yare::parameterized;

const FULL: &str = r#"
name = "ci"

[on]
push = { branches = ["main", "release/*"] }
pull_request = { branches = ["main"] }
tag = { tags = ["v*"] }
manual = {}

[env]
CARGO_TERM_COLOR = "always"
RETRIES = 3

[[notify]]
url = "https://hooks.example.com/ci"
when = "failure"

[job.lint]
runs-on = "linux"

[[job.lint.step]]
run = "cargo clippy"

[job.build]
runs-on = "linux"
needs = ["lint"]
permissions = ["cache:write", "artifacts:write", "secrets:read"]
timeout = "30m"
if = "event.ref == 'main'"
env = { RUST_LOG = "info" }
cache = { key = "cargo-${{ matrix.os }}", restore-keys = ["cargo-"], paths = ["target"] }
artifacts = [{ name = "bin", paths = ["out/app"], retention-days = 7 }]

[job.build.matrix]
os = ["linux", "macos"]
rust = ["stable", "nightly"]
exclude = [{ os = "macos", rust = "nightly" }]
include = [{ os = "windows", rust = "stable" }]

[[job.build.step]]
id = "version"
run = "echo version=1.2 >> $OC_OUTPUT"
outputs = ["version"]

[[job.build.step]]
uses = "acme/publish@v2"
with = { version = "${{ steps.version.outputs.version }}" }
if = "success() && matrix.os == 'linux'"
continue-on-error = true
timeout = "5m"
"#;

fn parse(content: &str) -> Result<Workflow, ParseError> {
    parse_workflow(content, &ParseOptions::default())
}

fn invalid_path(content: &str) -> String {
    match parse(content) {
        Err(ParseError::Invalid { path, .. }) => path,
        Err(ParseError::MissingField(path)) => path,
        other => panic!("expected a path-bearing error, got {:?}", other),
    }
}

#[test]
fn parses_full_document() {
    let wf = parse(FULL).unwrap();
    assert_eq!(wf.name, "ci");
    assert_eq!(wf.triggers.len(), 4);
    assert_eq!(wf.env.get("RETRIES").map(String::as_str), Some("3"));
    assert_eq!(wf.notify.len(), 1);
    assert_eq!(wf.notify[0].when, NotifyWhen::Failure);
    assert_eq!(wf.job_names().collect::<Vec<_>>(), vec!["lint", "build"]);

    let build = wf.get_job("build").unwrap();
    assert_eq!(build.needs, vec!["lint"]);
    assert_eq!(build.timeout, Some(Duration::from_secs(30 * 60)));
    assert!(build.permissions.allows(Scope::Secrets, Access::Read));
    assert!(build.permissions.allows(Scope::Cache, Access::Read));
    assert_eq!(build.steps.len(), 2);
    assert_eq!(build.instances().unwrap().len(), 4);

    let cache = build.cache.as_ref().unwrap();
    assert_eq!(cache.restore_keys, vec!["cargo-"]);
    assert_eq!(build.artifacts[0].retention_days, 7);

    let publish = &build.steps[1];
    assert!(publish.continue_on_error);
    assert_eq!(publish.timeout, Some(Duration::from_secs(300)));
    match &publish.kind {
        StepKind::Uses { action, inputs } => {
            assert_eq!(action.to_string(), "acme/publish@v2");
            assert_eq!(
                inputs.get("version").map(String::as_str),
                Some("${{ steps.version.outputs.version }}")
            );
        }
        other => panic!("expected uses step, got {:?}", other),
    }
    assert_eq!(build.steps[0].outputs, vec!["version"]);
}

#[test]
fn matrix_axes_keep_declaration_order() {
    let wf = parse(FULL).unwrap();
    let matrix = wf.get_job("build").unwrap().matrix.as_ref().unwrap();
    let axes: Vec<&str> = matrix.axes.iter().map(|(a, _)| a.as_str()).collect();
    assert_eq!(axes, vec!["os", "rust"]);
}

#[test]
fn trigger_matching() {
    let wf = parse(FULL).unwrap();
    assert!(wf.triggered_by(&TriggerEvent::push("release/1.2")));
    assert!(!wf.triggered_by(&TriggerEvent::push("feature/x")));
    assert!(wf.triggered_by(&TriggerEvent::new(EventKind::Tag, "v1.0", "me")));
    assert!(wf.triggered_by(&TriggerEvent::new(EventKind::Manual, "anything", "me")));
}

#[test]
fn name_defaults_and_on_shorthand() {
    let wf = parse(
        r#"
on = ["push", "manual"]
[job.a]
runs-on = "linux"
steps = [{ run = "true" }]
"#,
    )
    .unwrap();
    assert_eq!(wf.name, "workflow");
    assert_eq!(wf.triggers.len(), 2);
    assert!(wf.triggers.iter().all(|t| t.patterns.is_empty()));
}

#[test]
fn forward_needs_reference_is_accepted() {
    let wf = parse(
        r#"
on = "push"
[job.b]
runs-on = "linux"
needs = "a"
steps = [{ run = "true" }]
[job.a]
runs-on = "linux"
steps = [{ run = "true" }]
"#,
    )
    .unwrap();
    assert_eq!(wf.get_job("b").unwrap().needs, vec!["a"]);
}

#[test]
fn self_reference_passes_parse() {
    // the graph builder reports it as a cycle
    let wf = parse(
        r#"
on = "push"
[job.a]
runs-on = "linux"
needs = ["a"]
steps = [{ run = "true" }]
"#,
    )
    .unwrap();
    assert_eq!(wf.jobs.len(), 1);
}

#[parameterized(
    missing_on = { "[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true' }]", "on" },
    missing_jobs = { "on = 'push'", "job" },
    missing_runs_on = { "on = 'push'\n[job.a]\nsteps = [{ run = 'true' }]", "job.a.runs-on" },
    missing_steps = { "on = 'push'\n[job.a]\nruns-on = 'x'", "job.a.step" },
    empty_steps = { "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = []", "job.a.steps" },
    unknown_root_key = { "on = 'push'\nworkflows = 1\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true' }]", "workflows" },
    unknown_job_key = { "on = 'push'\n[job.a]\nruns-on = 'x'\nruns_on = 'y'\nsteps = [{ run = 'true' }]", "job.a.runs_on" },
    unknown_event = { "on = 'deploy'\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true' }]", "on" },
    empty_branch_list = { "[on]\npush = { branches = [] }\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true' }]", "on.push.branches" },
    tag_with_branches = { "[on]\ntag = { branches = ['main'] }\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true' }]", "on.tag.branches" },
    run_and_uses = { "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true', uses = 'a/b@v1' }]", "job.a.steps[0]" },
    neither_run_nor_uses = { "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = [{ name = 'nothing' }]", "job.a.steps[0]" },
    unpinned = { "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true' }, { run = 'true' }, { uses = 'acme/x' }]", "job.a.steps[2].uses" },
    floating = { "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = [{ uses = 'acme/x@latest' }]", "job.a.steps[0].uses" },
    unknown_needs = { "on = 'push'\n[job.a]\nruns-on = 'x'\nneeds = ['ghost']\nsteps = [{ run = 'true' }]", "job.a.needs" },
    duplicate_step_id = { "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = [{ id = 's', run = 'a' }, { id = 's', run = 'b' }]", "job.a.steps[1].id" },
    bad_permission = { "on = 'push'\n[job.a]\nruns-on = 'x'\npermissions = ['cache:admin']\nsteps = [{ run = 'true' }]", "job.a.permissions[0]" },
    bad_duration = { "on = 'push'\n[job.a]\nruns-on = 'x'\ntimeout = 'soon'\nsteps = [{ run = 'true' }]", "job.a.timeout" },
    bad_if = { "on = 'push'\n[job.a]\nruns-on = 'x'\nif = 'matrix.os =='\nsteps = [{ run = 'true' }]", "job.a.if" },
    bad_template = { "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'echo ${{ github.sha }}' }]", "job.a.steps[0].run" },
    exclude_unknown_axis = { "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true' }]\n[job.a.matrix]\nos = ['linux']\nexclude = [{ arch = 'arm' }]", "job.a.matrix.exclude[0].arch" },
    duplicate_axis_value = { "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true' }]\n[job.a.matrix]\nos = ['linux', 'linux']", "job.a.matrix.os[1]" },
    absolute_cache_path = { "on = 'push'\n[job.a]\nruns-on = 'x'\ncache = { key = 'k', paths = ['/etc'] }\nsteps = [{ run = 'true' }]", "job.a.cache.paths[0]" },
    with_on_run = { "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true', with = { a = 'b' } }]", "job.a.steps[0].with" },
    bad_notify_when = { "on = 'push'\n[[notify]]\nurl = 'https://x'\nwhen = 'sometimes'\n[job.a]\nruns-on = 'x'\nsteps = [{ run = 'true' }]", "notify[0].when" },
)]
fn rejects_with_path(content: &str, expected_path: &str) {
    assert_eq!(invalid_path(content), expected_path);
}

#[test]
fn strict_policy_rejects_branch_refs() {
    let content = "on = 'push'\n[job.a]\nruns-on = 'x'\nsteps = [{ uses = 'acme/x@stable-branch' }]";
    assert!(parse(content).is_ok());
    let strict = ParseOptions {
        pin_policy: PinPolicy::Strict,
    };
    let err = parse_workflow(content, &strict).unwrap_err();
    assert_eq!(err.path(), Some("job.a.steps[0].uses"));
}

#[test]
fn toml_syntax_error_is_reported() {
    assert!(matches!(parse("on = ["), Err(ParseError::Toml(_))));
}

#[test]
fn matrix_values_are_stringified() {
    let wf = parse(
        r#"
on = "push"
[job.a]
runs-on = "linux"
steps = [{ run = "true" }]
[job.a.matrix]
node = [18, 20]
experimental = [false, true]
"#,
    )
    .unwrap();
    let instances = wf.jobs[0].instances().unwrap();
    assert_eq!(instances[0].label(), "18, false");
    assert_eq!(instances[3].label(), "20, true");
}

#[test]
fn load_workflow_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ci.toml");
    std::fs::write(&path, FULL).unwrap();
    let wf = load_workflow(&path, &ParseOptions::default()).unwrap();
    assert_eq!(wf.name, "ci");

    let missing = load_workflow(&dir.path().join("nope.toml"), &ParseOptions::default());
    assert!(matches!(missing, Err(ParseError::Io { .. })));
}
