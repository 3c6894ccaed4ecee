// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod prune;
pub mod run;
pub mod runs;
pub mod show;
pub mod validate;

use crate::error::CliError;
use crate::project;
use anyhow::Result;
use oc_engine::EngineConfig;
use oc_workflow::{load_workflow, ParseOptions, Workflow};
use std::path::Path;

/// Load the workflow at `explicit` (or the project default) under the
/// configured pin policy
pub(crate) fn load(
    root: &Path,
    explicit: Option<&Path>,
    config: &EngineConfig,
) -> Result<Workflow> {
    let path = project::workflow_path(root, explicit);
    if !path.is_file() {
        return Err(CliError::workflow_not_found(&path).into());
    }
    let options = ParseOptions {
        pin_policy: config.pin_policy,
    };
    Ok(load_workflow(&path, &options)?)
}
