// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definitions

use crate::expr::Condition;
use crate::matrix::{EmptyMatrixError, MatrixDef};
use crate::step::StepDef;
use oc_core::MatrixValues;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default artifact retention when `retention-days` is omitted
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Capability areas a job can be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Cache,
    Artifacts,
    Secrets,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Cache => "cache",
            Scope::Artifacts => "artifacts",
            Scope::Secrets => "secrets",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Read,
    Write,
}

/// A single `scope:access` grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Permission {
    pub scope: Scope,
    pub access: Access,
}

impl Permission {
    pub const fn new(scope: Scope, access: Access) -> Self {
        Self { scope, access }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let access = match self.access {
            Access::Read => "read",
            Access::Write => "write",
        };
        write!(f, "{}:{}", self.scope.as_str(), access)
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scope, access) = s
            .split_once(':')
            .ok_or_else(|| format!("expected scope:read or scope:write, got `{}`", s))?;
        let scope = match scope {
            "cache" => Scope::Cache,
            "artifacts" => Scope::Artifacts,
            "secrets" => Scope::Secrets,
            other => return Err(format!("unknown permission scope `{}`", other)),
        };
        let access = match access {
            "read" => Access::Read,
            "write" => Access::Write,
            other => return Err(format!("unknown access `{}` (expected read or write)", other)),
        };
        Ok(Permission { scope, access })
    }
}

/// Granted capabilities. Empty grants nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(BTreeSet<Permission>);

impl Permissions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, permission: Permission) {
        self.0.insert(permission);
    }

    /// Write access implies read access
    pub fn allows(&self, scope: Scope, access: Access) -> bool {
        self.0
            .iter()
            .any(|p| p.scope == scope && (p.access == access || p.access == Access::Write))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(Permission::to_string)
            .collect::<Vec<_>>()
            .join(",");
        f.write_str(&joined)
    }
}

/// `cache = { key, restore-keys, paths }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDef {
    pub key: String,
    pub restore_keys: Vec<String>,
    pub paths: Vec<String>,
}

/// One `artifacts` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDef {
    pub name: String,
    pub paths: Vec<String>,
    pub retention_days: u32,
}

/// One `[job.<name>]` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDef {
    pub name: String,
    pub runs_on: String,
    pub needs: Vec<String>,
    pub matrix: Option<MatrixDef>,
    pub steps: Vec<StepDef>,
    pub permissions: Permissions,
    pub env: BTreeMap<String, String>,
    pub condition: Option<Condition>,
    pub continue_on_error: bool,
    pub timeout: Option<Duration>,
    pub cache: Option<CacheDef>,
    pub artifacts: Vec<ArtifactDef>,
}

impl JobDef {
    pub fn new(name: impl Into<String>, runs_on: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            runs_on: runs_on.into(),
            needs: Vec::new(),
            matrix: None,
            steps: Vec::new(),
            permissions: Permissions::none(),
            env: BTreeMap::new(),
            condition: None,
            continue_on_error: false,
            timeout: None,
            cache: None,
            artifacts: Vec::new(),
        }
    }

    /// Matrix value tuples this job fans out to.
    ///
    /// A job without a matrix has one instance with empty values.
    pub fn instances(&self) -> Result<Vec<MatrixValues>, EmptyMatrixError> {
        let Some(matrix) = &self.matrix else {
            return Ok(vec![MatrixValues::new()]);
        };
        let tuples = matrix.expand();
        if tuples.is_empty() {
            return Err(EmptyMatrixError {
                job: self.name.clone(),
            });
        }
        Ok(tuples)
    }

    /// `build` or `build (linux, stable)`
    pub fn instance_id(&self, values: &MatrixValues) -> String {
        if values.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, values.label())
        }
    }
}
