// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact and cache store
//!
//! ```text
//! <root>/blobs/<ab>/<cdef...>            file content by SHA-256
//! <root>/cache/<namespace>/<sha>.json    cache entry, one per key
//! <root>/artifacts/<run>/<name>.json     artifact handle + manifest
//! ```
//!
//! Entries are written once and never modified.

use crate::blob::{hex_encode, BlobStore, Manifest};
use crate::error::{IoContext, StoreError};
use chrono::{DateTime, Duration, Utc};
use oc_core::{Clock, MatrixValues, RunId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A saved cache entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub manifest: Manifest,
}

/// Result of a successful restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHit {
    /// Key of the entry that was restored
    pub key: String,
    /// True when the requested key matched exactly
    pub exact: bool,
    pub files: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { files: usize, bytes: u64 },
    /// Another writer saved this key first
    AlreadyExists,
}

/// Stored output of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub run_id: RunId,
    pub name: String,
    /// Digest of the artifact's manifest
    pub digest: String,
    pub files: usize,
    pub bytes: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactRecord {
    handle: ArtifactHandle,
    manifest: Manifest,
}

/// Counts from [`Store::prune_expired`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneStats {
    pub artifacts: usize,
    pub runs: usize,
}

/// Content-addressed artifact and cache store rooted at one directory
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    blobs: BlobStore,
}

impl Store {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for sub in ["blobs", "cache", "artifacts"] {
            let dir = root.join(sub);
            fs::create_dir_all(&dir).at(&dir)?;
        }
        Ok(Self {
            blobs: BlobStore::new(root.join("blobs")),
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> PathBuf {
        self.root.join("cache").join(sanitize(namespace))
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        let digest = hex_encode(&Sha256::digest(key.as_bytes()));
        self.namespace_dir(namespace).join(format!("{}.json", digest))
    }

    /// Restore a cache entry into `dest`.
    ///
    /// Tries `key` exactly, then each fallback in order as a prefix, taking
    /// the newest matching entry. A miss is `Ok(None)`.
    pub fn restore(
        &self,
        namespace: &str,
        key: &str,
        fallback_keys: &[String],
        dest: &Path,
    ) -> Result<Option<CacheHit>, StoreError> {
        let entry = match self.read_entry(&self.entry_path(namespace, key))? {
            Some(entry) => Some((entry, true)),
            None => self.newest_by_prefix(namespace, fallback_keys)?.map(|e| (e, false)),
        };
        let Some((entry, exact)) = entry else {
            return Ok(None);
        };

        self.blobs.restore(&entry.manifest, dest)?;
        tracing::debug!(namespace, key = %entry.key, exact, "cache restored");
        Ok(Some(CacheHit {
            files: entry.manifest.files.len(),
            bytes: entry.manifest.total_bytes(),
            key: entry.key,
            exact,
        }))
    }

    fn newest_by_prefix(
        &self,
        namespace: &str,
        prefixes: &[String],
    ) -> Result<Option<CacheEntry>, StoreError> {
        if prefixes.is_empty() {
            return Ok(None);
        }
        let entries = self.cache_entries(namespace)?;
        for prefix in prefixes {
            let newest = entries
                .iter()
                .filter(|e| e.key.starts_with(prefix.as_str()))
                .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.key.cmp(&b.key)));
            if let Some(entry) = newest {
                return Ok(Some(entry.clone()));
            }
        }
        Ok(None)
    }

    /// All readable entries in a namespace
    pub fn cache_entries(&self, namespace: &str) -> Result<Vec<CacheEntry>, StoreError> {
        let dir = self.namespace_dir(namespace);
        let read = match fs::read_dir(&dir) {
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io { path: dir, source: e }),
        };
        let mut entries = Vec::new();
        for item in read.filter_map(Result::ok) {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(entry) = self.read_entry(&path)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn read_entry(&self, path: &Path) -> Result<Option<CacheEntry>, StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        match serde_json::from_str(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                // An unreadable entry is a miss; `save` replaces it
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable cache entry");
                Ok(None)
            }
        }
    }

    /// Save `paths` under `key`. The first writer of a key wins.
    pub fn save(
        &self,
        namespace: &str,
        key: &str,
        paths: &[String],
        src: &Path,
        now: DateTime<Utc>,
    ) -> Result<SaveOutcome, StoreError> {
        let path = self.entry_path(namespace, key);
        if path.exists() {
            if self.read_entry(&path)?.is_some() {
                return Ok(SaveOutcome::AlreadyExists);
            }
            tracing::warn!(path = %path.display(), "replacing unreadable cache entry");
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    return Err(StoreError::Io { path, source: e });
                }
            }
        }

        let manifest = self.blobs.capture(src, paths)?;
        let entry = CacheEntry {
            key: key.to_string(),
            created_at: now,
            manifest,
        };
        let json = serde_json::to_vec_pretty(&entry)?;

        let dir = self.namespace_dir(namespace);
        fs::create_dir_all(&dir).at(&dir)?;
        if !publish_new(&dir, &path, &json)? {
            return Ok(SaveOutcome::AlreadyExists);
        }

        tracing::debug!(namespace, key, files = entry.manifest.files.len(), "cache saved");
        Ok(SaveOutcome::Saved {
            files: entry.manifest.files.len(),
            bytes: entry.manifest.total_bytes(),
        })
    }

    fn artifact_path(&self, run_id: &RunId, name: &str) -> Result<PathBuf, StoreError> {
        if sanitize(name) != name || name.is_empty() {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self
            .root
            .join("artifacts")
            .join(sanitize(run_id.as_str()))
            .join(format!("{}.json", name)))
    }

    /// Capture `paths` from `src` as a named artifact of a run
    pub fn store_artifact(
        &self,
        run_id: &RunId,
        name: &str,
        paths: &[String],
        src: &Path,
        retention_days: u32,
        now: DateTime<Utc>,
    ) -> Result<ArtifactHandle, StoreError> {
        let path = self.artifact_path(run_id, name)?;
        let manifest = self.blobs.capture(src, paths)?;
        let handle = ArtifactHandle {
            run_id: run_id.clone(),
            name: name.to_string(),
            digest: manifest.digest()?,
            files: manifest.files.len(),
            bytes: manifest.total_bytes(),
            created_at: now,
            expires_at: now + Duration::days(i64::from(retention_days)),
        };

        let dir = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(dir).at(dir)?;
        let record = ArtifactRecord {
            handle: handle.clone(),
            manifest,
        };
        if !publish_new(dir, &path, &serde_json::to_vec_pretty(&record)?)? {
            let reason = format!("{} (artifact already stored for this run)", name);
            return Err(StoreError::InvalidName(reason));
        }
        Ok(handle)
    }

    /// Artifacts stored for a run, sorted by name
    pub fn artifacts(&self, run_id: &RunId) -> Result<Vec<ArtifactHandle>, StoreError> {
        let dir = self.root.join("artifacts").join(sanitize(run_id.as_str()));
        let mut handles: Vec<ArtifactHandle> = self
            .artifact_records(&dir)?
            .into_iter()
            .map(|(_, record)| record.handle)
            .collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(handles)
    }

    /// Copy an artifact's files into `dest`
    pub fn fetch_artifact(
        &self,
        run_id: &RunId,
        name: &str,
        dest: &Path,
    ) -> Result<ArtifactHandle, StoreError> {
        let path = self.artifact_path(run_id, name)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(format!("artifact {} of run {}", name, run_id)))
            }
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };
        let record: ArtifactRecord = serde_json::from_str(&content)?;
        self.blobs.restore(&record.manifest, dest)?;
        Ok(record.handle)
    }

    fn artifact_records(&self, dir: &Path) -> Result<Vec<(PathBuf, ArtifactRecord)>, StoreError> {
        let read = match fs::read_dir(dir) {
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    path: dir.to_path_buf(),
                    source: e,
                })
            }
        };
        let mut records = Vec::new();
        for item in read.filter_map(Result::ok) {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            match serde_json::from_str::<ArtifactRecord>(&content) {
                Ok(record) => records.push((path, record)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable artifact")
                }
            }
        }
        Ok(records)
    }

    /// Remove artifacts whose retention has passed.
    ///
    /// Blobs are left in place; identical content may still be referenced
    /// by cache entries or other artifacts.
    pub fn prune_expired(&self, clock: &impl Clock) -> Result<PruneStats, StoreError> {
        let now = clock.now();
        let mut stats = PruneStats::default();
        let root = self.root.join("artifacts");
        let runs = match fs::read_dir(&root) {
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(StoreError::Io { path: root, source: e }),
        };

        for run_dir in runs.filter_map(Result::ok).map(|e| e.path()) {
            if !run_dir.is_dir() {
                continue;
            }
            for (path, record) in self.artifact_records(&run_dir)? {
                if record.handle.expires_at <= now {
                    fs::remove_file(&path).at(&path)?;
                    stats.artifacts += 1;
                    tracing::info!(
                        run = %record.handle.run_id,
                        artifact = %record.handle.name,
                        "pruned expired artifact"
                    );
                }
            }
            let empty = fs::read_dir(&run_dir)
                .map(|mut d| d.next().is_none())
                .unwrap_or(false);
            if empty {
                fs::remove_dir(&run_dir).at(&run_dir)?;
                stats.runs += 1;
            }
        }
        Ok(stats)
    }
}

/// Artifact name for one job instance: `bin` or `bin-linux-stable`
pub fn artifact_name(base: &str, values: &MatrixValues) -> String {
    if values.is_empty() {
        return sanitize(base);
    }
    let suffix = values.iter().map(|(_, v)| v).collect::<Vec<_>>().join("-");
    sanitize(&format!("{}-{}", base, suffix))
}

/// Map a name onto a safe single path component
/// Write `bytes` to a temp file in `dir` and link it into place at `path`.
///
/// Returns false, leaving `path` untouched, when it already exists. The temp
/// file is removed on every path.
fn publish_new(dir: &Path, path: &Path, bytes: &[u8]) -> Result<bool, StoreError> {
    let mut tmp = NamedTempFile::new_in(dir).at(dir)?;
    tmp.write_all(bytes).at(tmp.path())?;
    tmp.as_file().sync_all().at(tmp.path())?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source: e.error,
        }),
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
