//! Behavioral specifications for the oc CLI.
//!
//! These tests are black-box: they invoke the CLI binary and verify
//! stdout, stderr, and exit codes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// cli/
#[path = "specs/cli/errors.rs"]
mod cli_errors;
#[path = "specs/cli/help.rs"]
mod cli_help;

// run/
#[path = "specs/run/execution.rs"]
mod run_execution;
#[path = "specs/run/cache.rs"]
mod run_cache;
#[path = "specs/run/secrets.rs"]
mod run_secrets;

// history/
#[path = "specs/history/runs.rs"]
mod history_runs;
#[path = "specs/history/show.rs"]
mod history_show;
