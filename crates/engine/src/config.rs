// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration loaded from `.oc/config.toml`

use oc_workflow::PinPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Location of the config file relative to the project root
pub const CONFIG_FILE: &str = ".oc/config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
    #[error("max_parallel must be at least 1")]
    ZeroParallel,
    #[error("could not determine a state directory; set OC_STATE_DIR")]
    NoStateDir,
}

/// Tunables for a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Upper bound on concurrently running job instances
    pub max_parallel: usize,
    #[serde(with = "humantime_serde")]
    pub step_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub job_timeout: Duration,
    /// How long a running step may keep going after cancellation
    #[serde(with = "humantime_serde")]
    pub cancel_grace: Duration,
    #[serde(with = "humantime_serde")]
    pub store_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub notify_timeout: Duration,
    pub pin_policy: PinPolicy,
    /// Labels this host accepts for `runs-on`; empty accepts any label
    pub runner_labels: Vec<String>,
    pub state_dir: Option<PathBuf>,
    pub actions_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            step_timeout: Duration::from_secs(60 * 60),
            job_timeout: Duration::from_secs(6 * 60 * 60),
            cancel_grace: Duration::from_secs(10),
            store_timeout: Duration::from_secs(60),
            notify_timeout: Duration::from_secs(10),
            pin_policy: PinPolicy::Explicit,
            runner_labels: Vec::new(),
            state_dir: None,
            actions_dir: None,
        }
    }
}

impl EngineConfig {
    /// Read `<project_root>/.oc/config.toml` if present, then apply
    /// `OC_*` environment overrides.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(CONFIG_FILE);
        let mut config = if path.is_file() {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            Self::parse(&content).map_err(|source| ConfigError::Toml { path, source })?
        } else {
            Self::default()
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `OC_MAX_PARALLEL`, `OC_STATE_DIR` and `OC_ACTIONS_DIR`
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("OC_MAX_PARALLEL") {
            self.max_parallel = value.trim().parse().map_err(|_| ConfigError::Env {
                var: "OC_MAX_PARALLEL",
                value,
            })?;
        }
        if let Some(dir) = lookup("OC_STATE_DIR").filter(|d| !d.is_empty()) {
            self.state_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("OC_ACTIONS_DIR").filter(|d| !d.is_empty()) {
            self.actions_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_parallel == 0 {
            return Err(ConfigError::ZeroParallel);
        }
        Ok(())
    }

    /// Configured state directory, or `$XDG_STATE_HOME/oc`, or the platform
    /// state dir, or `~/.local/state/oc`.
    pub fn resolve_state_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        if let Some(xdg) = std::env::var_os("XDG_STATE_HOME").filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(xdg).join("oc"));
        }
        if let Some(dir) = dirs::state_dir() {
            return Ok(dir.join("oc"));
        }
        dirs::home_dir()
            .map(|home| home.join(".local/state/oc"))
            .ok_or(ConfigError::NoStateDir)
    }

    /// Configured actions directory, or `<project_root>/.oc/actions`
    pub fn resolve_actions_dir(&self, project_root: &Path) -> PathBuf {
        self.actions_dir
            .clone()
            .unwrap_or_else(|| project_root.join(".oc/actions"))
    }

    /// True if this host may run a job declaring `runs_on`
    pub fn accepts_label(&self, runs_on: &str) -> bool {
        self.runner_labels.is_empty() || self.runner_labels.iter().any(|l| l == runs_on)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
