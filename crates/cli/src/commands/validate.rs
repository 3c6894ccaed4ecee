// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oc validate` - Parse a workflow and print its execution plan

use anyhow::Result;
use clap::Args;
use oc_engine::{EngineConfig, RunPlan};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct ValidateArgs {
    /// Workflow file (default: .oc/workflow.toml in the project root)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

pub fn validate(root: &Path, args: ValidateArgs) -> Result<()> {
    let config = EngineConfig::load(root)?;
    let workflow = super::load(root, args.file.as_deref(), &config)?;
    let plan = RunPlan::build(&workflow)?;
    let counts: HashMap<&str, usize> = plan.instance_counts().into_iter().collect();

    println!("workflow `{}` is valid", workflow.name);
    for (idx, layer) in plan.graph.layers().iter().enumerate() {
        let jobs: Vec<String> = layer
            .iter()
            .map(|job| match counts.get(job.as_str()).copied().unwrap_or(0) {
                0 => format!("{} (empty matrix)", job),
                1 => job.clone(),
                n => format!("{} ({} instances)", job, n),
            })
            .collect();
        println!("  stage {}: {}", idx + 1, jobs.join(", "));
    }
    let instances: usize = counts.values().sum();
    println!("{} jobs, {} instances", workflow.jobs.len(), instances);
    Ok(())
}
