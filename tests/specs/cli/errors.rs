//! Usage and workflow error specs
//!
//! Everything rejected before a job starts exits with code 2.

use crate::prelude::*;

#[test]
fn unknown_command_is_a_usage_error() {
    let project = Project::empty();
    project.oc().args(&["deploy"]).exits(2);
}

#[test]
fn missing_workflow_suggests_a_fix() {
    let project = Project::empty();
    project
        .oc()
        .args(&["run"])
        .exits(2)
        .stderr_has("workflow file")
        .stderr_has("not found")
        .stderr_has("suggestions:");
}

#[test]
fn unknown_keys_are_rejected() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.build]
runs-on = "linux"
stpes = [{ run = "make" }]
"#,
    );
    project
        .oc()
        .args(&["validate"])
        .exits(2)
        .stderr_has("stpes");
}

#[test]
fn cycles_are_rejected_before_running() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.a]
runs-on = "linux"
needs = ["b"]
step = [{ run = "touch ran-a" }]

[job.b]
runs-on = "linux"
needs = ["a"]
step = [{ run = "touch ran-b" }]
"#,
    );
    project
        .oc()
        .args(&["run"])
        .exits(2)
        .stderr_has("cyclic dependency");
    assert!(!project.state_path().join("runs").exists());
}

#[test]
fn floating_action_refs_are_rejected() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.build]
runs-on = "linux"
step = [{ uses = "acme/setup@latest" }]
"#,
    );
    project
        .oc()
        .args(&["validate"])
        .exits(2)
        .stderr_has("floating ref");
}

#[test]
fn zero_parallelism_is_rejected() {
    let project = Project::with_workflow(MINIMAL_WORKFLOW);
    project
        .oc()
        .args(&["run", "--max-parallel", "0"])
        .exits(2);
}
