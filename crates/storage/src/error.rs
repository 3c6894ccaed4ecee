// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the artifact and cache store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("path not found in workspace: {0}")]
    MissingPath(String),
    #[error("blob {0} is missing or corrupt")]
    CorruptBlob(String),
    #[error("invalid name `{0}`")]
    InvalidName(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("`{prefix}` is ambiguous ({count} matches)")]
    Ambiguous { prefix: String, count: usize },
}

/// Attach a path to an IO error
pub(crate) trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T, StoreError>;
}

impl<T> IoContext<T> for Result<T, std::io::Error> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T, StoreError> {
        self.map_err(|source| StoreError::Io {
            path: path.into(),
            source,
        })
    }
}
