//! Run show specs
//!
//! Verify show by full id, by prefix, and of the event journal.

use crate::prelude::*;

#[test]
fn show_by_prefix_prints_steps() {
    let project = Project::with_workflow(MINIMAL_WORKFLOW);
    project.oc().args(&["run"]).passes();
    let id = project.only_run_id();

    project
        .oc()
        .args(&["show", &id[..6]])
        .passes()
        .stdout_has(&format!("run {}", &id[..8]))
        .stdout_has("status: succeeded")
        .stdout_has("succeeded  echo building (exit 0)");
}

#[test]
fn show_json_round_trips_the_report() {
    let project = Project::with_workflow(MINIMAL_WORKFLOW);
    project.oc().args(&["run"]).passes();
    let id = project.only_run_id();

    let json = project.oc().args(&["show", &id, "--json"]).passes().json();

    assert_eq!(json["run_id"], id.as_str());
    assert_eq!(json["instances"].as_array().unwrap().len(), 2);
}

#[test]
fn show_events_prints_the_journal() {
    let project = Project::with_workflow(MINIMAL_WORKFLOW);
    project.oc().args(&["run"]).passes();
    let id = project.only_run_id();

    project
        .oc()
        .args(&["show", &id, "--events"])
        .passes()
        .stdout_has("run started: ci (push on main by local)")
        .stdout_has("build -> running")
        .stdout_has("test -> succeeded")
        .stdout_has("run finished: succeeded");
}

#[test]
fn show_unknown_run_fails() {
    let project = Project::with_workflow(MINIMAL_WORKFLOW);
    project
        .oc()
        .args(&["show", "nonexistent"])
        .exits(2)
        .stderr_has("run `nonexistent` not found")
        .stderr_has("oc runs");
}
