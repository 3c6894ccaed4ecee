// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Content-addressed file blobs and manifests

use crate::error::{IoContext, StoreError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// One file captured into the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Path relative to the workspace, `/` separated
    pub path: String,
    pub digest: String,
    pub size: u64,
    #[serde(default)]
    pub executable: bool,
}

/// Ordered list of captured files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub files: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// SHA-256 over the manifest's canonical JSON
    pub fn digest(&self) -> Result<String, StoreError> {
        let json = serde_json::to_vec(self)?;
        Ok(hex_encode(&Sha256::digest(&json)))
    }
}

/// Blob directory keyed by SHA-256 of file content
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, digest: &str) -> PathBuf {
        let (head, tail) = digest.split_at(digest.len().min(2));
        self.root.join(head).join(tail)
    }

    pub fn contains(&self, digest: &str) -> bool {
        self.blob_path(digest).is_file()
    }

    /// Copy a file into the store, returning its digest and size
    pub fn put_file(&self, path: &Path) -> Result<(String, u64), StoreError> {
        let bytes = fs::read(path).at(path)?;
        let digest = hex_encode(&Sha256::digest(&bytes));
        let target = self.blob_path(&digest);
        if !target.is_file() {
            let parent = target.parent().unwrap_or(&self.root);
            fs::create_dir_all(parent).at(parent)?;
            // Each writer gets its own temp file; readers never see a partial blob
            let mut tmp = NamedTempFile::new_in(parent).at(parent)?;
            tmp.write_all(&bytes).at(tmp.path())?;
            tmp.as_file().sync_all().at(tmp.path())?;
            if let Err(e) = tmp.persist(&target) {
                // A concurrent writer already stored the same content
                if !target.is_file() {
                    return Err(StoreError::Io {
                        path: target,
                        source: e.error,
                    });
                }
            }
        }
        Ok((digest, bytes.len() as u64))
    }

    /// Copy a blob out to `dest`, verifying its digest
    pub fn copy_out(&self, digest: &str, dest: &Path) -> Result<(), StoreError> {
        let source = self.blob_path(digest);
        let mut bytes = Vec::new();
        fs::File::open(&source)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .map_err(|_| StoreError::CorruptBlob(digest.to_string()))?;
        if hex_encode(&Sha256::digest(&bytes)) != digest {
            return Err(StoreError::CorruptBlob(digest.to_string()));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        fs::write(dest, &bytes).at(dest)
    }

    /// Capture `paths` (files or directories, relative to `src`) into a manifest
    pub fn capture(&self, src: &Path, paths: &[String]) -> Result<Manifest, StoreError> {
        let mut files = Vec::new();
        for declared in paths {
            let relative = checked_relative(declared)?;
            let full = src.join(&relative);
            let meta = fs::symlink_metadata(&full)
                .map_err(|_| StoreError::MissingPath(declared.clone()))?;
            if meta.is_dir() {
                collect_dir(&full, &relative, &mut files)?;
            } else if meta.is_file() {
                files.push((full, relative));
            }
        }

        let mut manifest = Manifest::default();
        for (full, relative) in files {
            let rel = to_slash(&relative);
            if manifest.files.iter().any(|f| f.path == rel) {
                continue;
            }
            let executable = is_executable(&full);
            let (digest, size) = self.put_file(&full)?;
            manifest.files.push(ManifestEntry {
                path: rel,
                digest,
                size,
                executable,
            });
        }
        Ok(manifest)
    }

    /// Materialize every manifest file under `dest`
    pub fn restore(&self, manifest: &Manifest, dest: &Path) -> Result<(), StoreError> {
        for entry in &manifest.files {
            let relative = checked_relative(&entry.path)?;
            let target = dest.join(relative);
            self.copy_out(&entry.digest, &target)?;
            if entry.executable {
                set_executable(&target)?;
            }
        }
        Ok(())
    }
}

/// Reject absolute paths and `..` so nothing escapes the workspace
fn checked_relative(path: &str) -> Result<PathBuf, StoreError> {
    let candidate = Path::new(path);
    let escapes = candidate.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if path.trim().is_empty() || escapes {
        return Err(StoreError::InvalidName(path.to_string()));
    }
    Ok(candidate
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}

fn collect_dir(
    dir: &Path,
    relative: &Path,
    out: &mut Vec<(PathBuf, PathBuf)>,
) -> Result<(), StoreError> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .at(dir)?
        .filter_map(Result::ok)
        .collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        let rel = relative.join(entry.file_name());
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        // Symlinks are skipped
        if file_type.is_dir() {
            collect_dir(&path, &rel, out)?;
        } else if file_type.is_file() {
            out.push((path, rel));
        }
    }
    Ok(())
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).at(path)?.permissions();
    perms.set_mode(perms.mode() | 0o755);
    fs::set_permissions(path, perms).at(path)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "blob_tests.rs"]
mod tests;
