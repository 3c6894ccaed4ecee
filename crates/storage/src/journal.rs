// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run event journal
//!
//! Newline-delimited JSON, one [`JournalEntry`] per line, each carrying a
//! CRC32 of its serialized event. Torn or corrupt lines are skipped on read.

use chrono::{DateTime, Utc};
use oc_core::RunEvent;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub event: RunEvent,
    pub checksum: u32,
}

impl JournalEntry {
    pub fn new(seq: u64, at: DateTime<Utc>, event: RunEvent) -> Self {
        let checksum = checksum(&event);
        Self {
            seq,
            at,
            event,
            checksum,
        }
    }

    pub fn verify(&self) -> bool {
        self.checksum == checksum(&self.event)
    }
}

fn checksum(event: &RunEvent) -> u32 {
    // RunEvent holds only strings, enums and integers, so serialization cannot fail
    let json = serde_json::to_string(event).unwrap_or_default();
    crc32fast::hash(json.as_bytes())
}

/// Append-only writer for one run's journal
pub struct Journal {
    file: File,
    path: PathBuf,
    sequence: u64,
}

impl Journal {
    /// Open or create a journal, continuing after its last valid entry
    pub fn open(path: &Path) -> Result<Self, JournalError> {
        let sequence = Self::read(path)?
            .entries
            .last()
            .map(|e| e.seq)
            .unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
            sequence,
        })
    }

    pub fn append(&mut self, event: RunEvent, at: DateTime<Utc>) -> Result<u64, JournalError> {
        self.sequence += 1;
        let entry = JournalEntry::new(self.sequence, at, event);
        let line = serde_json::to_string(&entry)?;
        writeln!(self.file, "{}", line)?;
        self.file.sync_data()?;
        Ok(self.sequence)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every valid entry. A missing file reads as empty.
    pub fn read(path: &Path) -> Result<JournalRead, JournalError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(JournalRead::default()),
            Err(e) => return Err(e.into()),
        };

        let mut read = JournalRead::default();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalEntry>(&line) {
                Ok(entry) if entry.verify() => read.entries.push(entry),
                Ok(_) => {
                    tracing::warn!(path = %path.display(), line = idx + 1, "journal checksum mismatch, skipping");
                    read.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), line = idx + 1, error = %e, "corrupt journal line, skipping");
                    read.skipped += 1;
                }
            }
        }
        Ok(read)
    }
}

/// Result of reading a journal
#[derive(Debug, Default)]
pub struct JournalRead {
    pub entries: Vec<JournalEntry>,
    /// Lines dropped for failing to parse or verify
    pub skipped: usize,
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
