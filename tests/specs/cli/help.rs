//! Help, version and completion specs

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    let project = Project::empty();
    project
        .oc()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("validate")
        .stdout_has("runs")
        .stdout_has("show")
        .stdout_has("prune")
        .stdout_has("completions");
}

#[test]
fn version_is_printed() {
    let project = Project::empty();
    project
        .oc()
        .args(&["--version"])
        .passes()
        .stdout_has(env!("CARGO_PKG_VERSION"));
}

#[test]
fn bash_completions_name_the_binary() {
    let project = Project::empty();
    project
        .oc()
        .args(&["completions", "bash"])
        .passes()
        .stdout_has("_oc()");
}
