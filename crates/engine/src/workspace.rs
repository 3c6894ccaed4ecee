// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance directories under the run directory
//!
//! ```text
//! <run_dir>/work/<slug>/        working directory for every step
//! <run_dir>/outputs/<slug>/     one OC_OUTPUT file per step
//! <run_dir>/logs/<slug>.log     redacted step output
//! ```

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Directories owned by one job instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceDirs {
    pub workspace: PathBuf,
    pub outputs: PathBuf,
    pub log: PathBuf,
}

impl InstanceDirs {
    pub fn new(run_dir: &Path, slug: &str) -> Self {
        Self {
            workspace: run_dir.join("work").join(slug),
            outputs: run_dir.join("outputs").join(slug),
            log: run_dir.join("logs").join(format!("{}.log", slug)),
        }
    }

    /// Create the workspace and output directories
    pub fn prepare(&self) -> io::Result<()> {
        fs::create_dir_all(&self.workspace)?;
        fs::create_dir_all(&self.outputs)?;
        if let Some(parent) = self.log.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Output file for the step at `index`
    pub fn output_file(&self, index: usize) -> PathBuf {
        self.outputs.join(format!("step-{}.env", index + 1))
    }

    /// Append an already-redacted section to the instance log
    pub fn append_log(&self, header: &str, body: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log)?;
        writeln!(file, "==> {}", header)?;
        if !body.is_empty() {
            file.write_all(body.as_bytes())?;
            if !body.ends_with('\n') {
                writeln!(file)?;
            }
        }
        Ok(())
    }
}

/// `build (linux, stable)` -> `build-linux-stable`
pub fn slug(instance_id: &str) -> String {
    let mut out = String::with_capacity(instance_id.len());
    for c in instance_id.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.') {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "instance".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Slugs for every instance id, suffixed `-2`, `-3`... on collision
pub fn unique_slugs<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|id| {
            let base = slug(id);
            let mut candidate = base.clone();
            let mut n = 2;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{}-{}", base, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
