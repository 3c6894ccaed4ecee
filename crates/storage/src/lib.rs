// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oc-storage: durable state for the Otter CI engine
//!
//! Content-addressed cache and artifact store, per-run event journals and
//! the run history built from them.

mod blob;
mod error;
mod history;
mod journal;
mod store;

pub use blob::{BlobStore, Manifest, ManifestEntry};
pub use error::StoreError;
pub use history::{RunHistory, RunRecord};
pub use journal::{Journal, JournalEntry, JournalError, JournalRead};
pub use store::{
    artifact_name, ArtifactHandle, CacheEntry, CacheHit, PruneStats, SaveOutcome, Store,
};
