// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: step commands and run notifications

pub mod notify;
pub mod runner;
pub mod traced;

pub use notify::{NotifyAdapter, NotifyError, WebhookNotifier};
pub use runner::{
    parse_output_file, CommandOutput, CommandRequest, CommandRunner, Program, RunnerError,
    ShellRunner,
};
pub use traced::{TracedNotifier, TracedRunner};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
#[cfg(any(test, feature = "test-support"))]
pub use runner::{FakeResponse, FakeRunner, RunnerCall};
