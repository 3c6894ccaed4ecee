// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project discovery

use std::path::{Path, PathBuf};

/// Workflow file used when none is given
pub const DEFAULT_WORKFLOW: &str = ".oc/workflow.toml";

/// Find the project root.
///
/// `OC_PROJECT_ROOT` wins; otherwise the nearest ancestor of `start` holding
/// an `.oc` directory; otherwise `start` itself.
pub fn find_project_root(start: &Path) -> PathBuf {
    if let Some(root) = std::env::var_os("OC_PROJECT_ROOT") {
        return PathBuf::from(root);
    }
    start
        .ancestors()
        .find(|dir| dir.join(".oc").is_dir())
        .unwrap_or(start)
        .to_path_buf()
}

/// Resolve the workflow path: explicit paths are relative to the working
/// directory, the default is relative to the project root
pub fn workflow_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => root.join(DEFAULT_WORKFLOW),
    }
}
