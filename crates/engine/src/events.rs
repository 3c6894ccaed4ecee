// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-in of run events into the journal.
//!
//! Job tasks emit into an unbounded channel; a blocking-pool task owns the
//! [`Journal`] and appends each event in arrival order.

use oc_core::{Clock, RunEvent};
use oc_storage::Journal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Cloneable handle for emitting run events
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<RunEvent>>,
}

impl EventSink {
    /// A sink that drops every event
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: RunEvent) {
        tracing::debug!(event = event.name(), "run event");
        if let Some(tx) = &self.tx {
            // Receiver only goes away once the run is over
            let _ = tx.send(event);
        }
    }
}

/// Summary returned by the journal writer once every sink is dropped
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JournalStats {
    pub written: u64,
    pub failed: u64,
}

/// Append every event to `journal` until all senders are dropped
pub fn spawn_journal_writer<C: Clock + 'static>(
    mut journal: Journal,
    clock: C,
) -> (EventSink, JoinHandle<JournalStats>) {
    let (sink, mut rx) = EventSink::channel();
    let handle = tokio::task::spawn_blocking(move || {
        let mut stats = JournalStats::default();
        while let Some(event) = rx.blocking_recv() {
            match journal.append(event, clock.now()) {
                Ok(_) => stats.written += 1,
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(path = %journal.path().display(), error = %e, "journal append failed");
                }
            }
        }
        stats
    });
    (sink, handle)
}
