//! Secret injection and redaction specs

use crate::prelude::*;
use std::path::Path;

const LEAKY: &str = r#"
name = "ci"
on = "push"

[job.deploy]
runs-on = "linux"
permissions = ["secrets:read"]
step = [
  { run = "echo token=${{ secrets.TOKEN }}" },
  { run = "echo leaked=${{ secrets.TOKEN }} >> \"$OC_OUTPUT\"" },
]
"#;

fn files_containing(dir: &Path, needle: &str, found: &mut Vec<String>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            files_containing(&path, needle, found);
        } else if let Ok(content) = std::fs::read_to_string(&path) {
            if content.contains(needle) {
                found.push(path.display().to_string());
            }
        }
    }
}

#[test]
fn secrets_are_redacted_from_reports_journals_and_logs() {
    let project = Project::with_workflow(LEAKY);

    project
        .oc()
        .args(&["run", "--json", "--secret", "TOKEN=hunter2-secret"])
        .passes()
        .stdout_lacks("hunter2-secret")
        .stdout_has("***");

    let run_dir = project.state_path().join("runs").join(project.only_run_id());
    for file in ["report.json", "events.jsonl"] {
        let content = std::fs::read_to_string(run_dir.join(file)).unwrap();
        assert!(!content.contains("hunter2-secret"), "{} leaks the secret", file);
    }
    let mut leaks = Vec::new();
    files_containing(&run_dir.join("logs"), "hunter2-secret", &mut leaks);
    assert!(leaks.is_empty(), "secret found in {:?}", leaks);
}

#[test]
fn secret_flags_can_read_the_environment() {
    let project = Project::with_workflow(LEAKY);
    project
        .oc()
        .env("TOKEN", "from-env")
        .args(&["run", "--json", "--secret", "TOKEN"])
        .passes()
        .stdout_lacks("from-env");
}

#[test]
fn secrets_file_supplies_values() {
    let project = Project::with_workflow(LEAKY);
    project.file("secrets.env", "# local only\nTOKEN=file-secret\n");
    project
        .oc()
        .args(&["run", "--secrets-file", "secrets.env"])
        .passes();
}

#[test]
fn unset_secret_is_a_usage_error() {
    let project = Project::with_workflow(LEAKY);
    project
        .oc()
        .args(&["run", "--secret", "OC_SPECS_UNSET_SECRET"])
        .exits(2)
        .stderr_has("not set in the environment");
}

#[test]
fn secrets_need_permission() {
    let project = Project::with_workflow(&LEAKY.replace("permissions = [\"secrets:read\"]\n", ""));
    project
        .oc()
        .args(&["run", "--secret", "TOKEN=x"])
        .exits(1)
        .stdout_has("lacks secrets:read");
}
