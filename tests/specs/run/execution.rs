//! Workflow execution specs

use crate::prelude::*;

#[test]
fn passing_workflow_exits_zero() {
    let project = Project::with_workflow(MINIMAL_WORKFLOW);
    project
        .oc()
        .args(&["run"])
        .passes()
        .stdout_has("status: succeeded")
        .stdout_has("build")
        .stdout_has("test");
}

#[test]
fn failed_step_fails_run_and_skips_dependents() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.build]
runs-on = "linux"
step = [{ name = "compile", run = "exit 3" }]

[job.deploy]
runs-on = "linux"
needs = ["build"]
step = [{ run = "echo deploying" }]
"#,
    );
    project
        .oc()
        .args(&["run"])
        .exits(1)
        .stdout_has("status: failed")
        .stdout_has("step `compile` failed: exit code 3")
        .stdout_has("dependency `build` failed");
}

#[test]
fn continue_on_error_keeps_run_green() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.flaky]
runs-on = "linux"
continue-on-error = true
step = [{ run = "exit 1" }]

[job.after]
runs-on = "linux"
needs = ["flaky"]
step = [{ run = "true" }]
"#,
    );
    project
        .oc()
        .args(&["run"])
        .passes()
        .stdout_has("status: succeeded")
        .stdout_has("(continue-on-error)");
}

#[test]
fn outputs_flow_between_jobs() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.build]
runs-on = "linux"
step = [{ id = "meta", run = "echo version=1.2.3 >> \"$OC_OUTPUT\"" }]

[job.deploy]
runs-on = "linux"
needs = ["build"]
step = [{ run = "echo got=${{ needs.build.outputs.version }} >> \"$OC_OUTPUT\"" }]
"#,
    );
    let json = project.oc().args(&["run", "--json"]).passes().json();

    assert_eq!(json["status"], "succeeded");
    assert_eq!(json["instances"][0]["outputs"]["version"], "1.2.3");
    assert_eq!(json["instances"][1]["outputs"]["got"], "1.2.3");
}

#[test]
fn matrix_expands_into_instances() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.test]
runs-on = "linux"
matrix = { os = ["linux", "macos"], rust = ["stable", "beta"] }
step = [{ run = "echo os=${{ matrix.os }} >> \"$OC_OUTPUT\"" }]
"#,
    );
    let json = project.oc().args(&["run", "--json"]).passes().json();

    let ids: Vec<&str> = json["instances"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            "test (linux, stable)",
            "test (linux, beta)",
            "test (macos, stable)",
            "test (macos, beta)",
        ]
    );
    assert_eq!(json["instances"][2]["outputs"]["os"], "macos");
}

#[test]
fn steps_see_the_project_source() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.check]
runs-on = "linux"
step = [{ run = "test -f \"$OC_SOURCE/marker.txt\"" }]
"#,
    );
    project.file("marker.txt", "present");
    project.oc().args(&["run"]).passes();
}

#[test]
fn step_timeout_fails_the_job() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.slow]
runs-on = "linux"
step = [{ name = "wait", run = "sleep 5", timeout = "200ms" }]
"#,
    );
    project
        .oc()
        .args(&["run"])
        .exits(1)
        .stdout_has("step `wait` failed: timed out after 200ms");
}

#[test]
fn untriggered_event_is_not_an_error() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = { push = { branches = ["main"] } }

[job.build]
runs-on = "linux"
step = [{ run = "true" }]
"#,
    );
    project
        .oc()
        .args(&["run", "--ref", "feature/x"])
        .passes()
        .stdout_has("workflow `ci` is not triggered by push on feature/x");
}

#[test]
fn artifacts_are_recorded_in_the_report() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.build]
runs-on = "linux"
permissions = ["artifacts:write"]
artifacts = [{ name = "bin", paths = ["out"], retention-days = 3 }]
step = [{ run = "mkdir -p out && echo binary > out/app" }]
"#,
    );
    project
        .oc()
        .args(&["run"])
        .passes()
        .stdout_has("artifacts:")
        .stdout_has("bin  1 file");
}

#[test]
fn validate_prints_stages() {
    let project = Project::with_workflow(
        r#"
name = "ci"
on = "push"

[job.build]
runs-on = "linux"
step = [{ run = "make" }]

[job.test]
runs-on = "linux"
needs = ["build"]
matrix = { os = ["linux", "macos"] }
step = [{ run = "make test" }]

[job.lint]
runs-on = "linux"
step = [{ run = "make lint" }]
"#,
    );
    project
        .oc()
        .args(&["validate"])
        .passes()
        .stdout_has("workflow `ci` is valid")
        .stdout_has("stage 2: test (2 instances)")
        .stdout_has("3 jobs, 4 instances");
}
