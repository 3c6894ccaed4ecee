//! Run listing and pruning specs

use crate::prelude::*;

#[test]
fn no_runs_yet() {
    let project = Project::with_workflow(MINIMAL_WORKFLOW);
    project.oc().args(&["runs"]).passes().stdout_eq("No runs\n");
}

#[test]
fn finished_runs_are_listed() {
    let project = Project::with_workflow(MINIMAL_WORKFLOW);
    project.oc().args(&["run"]).passes();
    let id = project.only_run_id();

    project
        .oc()
        .args(&["runs"])
        .passes()
        .stdout_has("WORKFLOW")
        .stdout_has(&id[..8])
        .stdout_has("push main")
        .stdout_has("succeeded");

    let json = project.oc().args(&["runs", "--json"]).passes().json();
    assert_eq!(json[0]["id"], id.as_str());
    assert_eq!(json[0]["workflow"], "ci");
}

#[test]
fn failed_runs_are_listed_as_failed() {
    let project = Project::with_workflow(&MINIMAL_WORKFLOW.replace("echo testing", "false"));
    project.oc().args(&["run"]).exits(1);

    project.oc().args(&["runs"]).passes().stdout_has("failed");
}

#[test]
fn prune_removes_finished_runs() {
    let project = Project::with_workflow(MINIMAL_WORKFLOW);
    project.oc().args(&["run"]).passes();

    project
        .oc()
        .args(&["prune", "--keep", "7d"])
        .passes()
        .stdout_eq("removed 0 runs and 0 expired artifacts\n");

    project
        .oc()
        .args(&["prune", "--keep", "0s"])
        .passes()
        .stdout_eq("removed 1 runs and 0 expired artifacts\n");
    project.oc().args(&["runs"]).passes().stdout_eq("No runs\n");
}
