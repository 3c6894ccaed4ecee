// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine factory for CLI commands

use anyhow::Result;
use oc_adapters::{ShellRunner, TracedNotifier, TracedRunner, WebhookNotifier};
use oc_core::{SystemClock, UuidIdGen};
use oc_engine::{Engine, EngineConfig, EngineDeps};
use std::path::Path;

pub type CliEngine = Engine<
    TracedRunner<ShellRunner>,
    TracedNotifier<WebhookNotifier>,
    SystemClock,
    UuidIdGen,
>;

/// Create a production engine for the project at `root`
pub fn make_engine(root: &Path, config: EngineConfig) -> Result<CliEngine> {
    let state_dir = config.resolve_state_dir()?;
    let actions_dir = config.resolve_actions_dir(root);
    tracing::debug!(
        state_dir = %state_dir.display(),
        actions_dir = %actions_dir.display(),
        "engine paths"
    );
    let deps = EngineDeps {
        runner: TracedRunner::new(ShellRunner::new(actions_dir)),
        notifier: TracedNotifier::new(WebhookNotifier::new()),
    };
    Ok(Engine::new(deps, SystemClock, UuidIdGen, config, state_dir))
}
