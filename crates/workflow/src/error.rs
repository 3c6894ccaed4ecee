// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors that can occur while loading a workflow definition
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("{path}: {reason}")]
    Invalid { path: String, reason: String },
}

impl ParseError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ParseError::Invalid {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Dotted path of the offending field, if the error names one
    pub fn path(&self) -> Option<&str> {
        match self {
            ParseError::MissingField(path) | ParseError::Invalid { path, .. } => Some(path),
            ParseError::Io { path, .. } => Some(path),
            ParseError::Toml(_) => None,
        }
    }
}
