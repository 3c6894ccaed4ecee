// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oc-core: shared vocabulary for the Otter CI engine
//!
//! Ids, clocks, status state machines, trigger events and the secret store.

pub mod clock;
pub mod event;
pub mod id;
pub mod matrix;
pub mod secret;
pub mod status;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{EventKind, RunEvent, TriggerEvent, UnknownEventKind};
pub use id::{IdGen, RunId, SequentialIdGen, UuidIdGen};
pub use matrix::MatrixValues;
pub use secret::{SecretStore, REDACTED};
pub use status::{JobState, JobStatus, RunStatus, StepStatus, TransitionError};
