// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Otter CI execution engine
//!
//! Plans a workflow into job instances, schedules them over a bounded
//! pool, runs their steps through a [`oc_adapters::CommandRunner`] and
//! records the outcome as a [`RunReport`].

mod config;
mod context;
mod error;
mod events;
mod executor;
mod notifier;
mod plan;
mod report;
mod runtime;
mod scheduler;
mod workspace;

pub use config::{ConfigError, EngineConfig, CONFIG_FILE};
pub use context::{NeedsView, RunContext, StepView};
pub use error::{CacheError, EngineError, StepFailure};
pub use events::{spawn_journal_writer, EventSink, JournalStats};
pub use executor::{InstanceOutcome, InstancePlan, StepExecutor};
pub use notifier::payload as notification_payload;
pub use plan::{PlannedInstance, RunPlan};
pub use report::{
    aggregate, CacheReport, CacheStats, InstanceReport, RunReport, StepReport,
};
pub use runtime::{Engine, EngineDeps, PruneSummary, RunRequest};
pub use scheduler::Scheduler;
pub use workspace::slug;
