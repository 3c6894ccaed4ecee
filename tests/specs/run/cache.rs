//! Cache specs

use crate::prelude::*;

const CACHED: &str = r#"
name = "ci"
on = "push"

[job.build]
runs-on = "linux"
permissions = ["cache:read", "cache:write"]
cache = { key = "deps-v1", paths = ["target"] }
step = [{ id = "compile", run = """
if [ -f target/out.txt ]; then
  echo hit=yes >> "$OC_OUTPUT"
else
  mkdir -p target && echo built > target/out.txt
  echo hit=no >> "$OC_OUTPUT"
fi
""" }]
"#;

#[test]
fn cache_saved_by_one_run_is_restored_by_the_next() {
    let project = Project::with_workflow(CACHED);

    let first = project.oc().args(&["run", "--json"]).passes().json();
    assert_eq!(first["instances"][0]["outputs"]["hit"], "no");
    assert_eq!(first["instances"][0]["cache"]["saved"], true);
    assert_eq!(first["cache"]["misses"], 1);

    let second = project.oc().args(&["run", "--json"]).passes().json();
    assert_eq!(second["instances"][0]["outputs"]["hit"], "yes");
    assert_eq!(second["instances"][0]["cache"]["restored"], "deps-v1");
    assert_eq!(second["cache"]["exact_hits"], 1);
}

#[test]
fn cache_without_permission_only_warns() {
    let project = Project::with_workflow(&CACHED.replace(
        "permissions = [\"cache:read\", \"cache:write\"]\n",
        "",
    ));

    project
        .oc()
        .args(&["run"])
        .passes()
        .stdout_has("warnings:")
        .stdout_has("cache:read");
}
