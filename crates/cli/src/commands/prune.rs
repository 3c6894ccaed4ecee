// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `oc prune` - Remove expired artifacts and old runs

use crate::adapters::make_engine;
use anyhow::Result;
use clap::Args;
use oc_engine::EngineConfig;
use std::path::Path;
use std::time::Duration;

#[derive(Args)]
pub struct PruneArgs {
    /// Keep finished runs younger than this (e.g. "7d", "12h")
    #[arg(long, default_value = "7d", value_parser = humantime::parse_duration)]
    pub keep: Duration,
}

pub fn prune(root: &Path, args: PruneArgs) -> Result<()> {
    let engine = make_engine(root, EngineConfig::load(root)?)?;
    let summary = engine.prune(args.keep)?;
    println!(
        "removed {} runs and {} expired artifacts",
        summary.runs, summary.store.artifacts
    );
    Ok(())
}
