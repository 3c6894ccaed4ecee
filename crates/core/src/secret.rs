// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-once secret store with log redaction

use std::collections::HashMap;
use std::fmt;

/// Replacement text for redacted secret values
pub const REDACTED: &str = "***";

/// Secrets supplied to a run.
///
/// Populated once at construction; there is no API to change it afterwards.
/// `Debug` prints names only.
#[derive(Clone, Default)]
pub struct SecretStore {
    values: HashMap<String, String>,
    // Longest first so a secret containing another is masked whole
    patterns: Vec<String>,
}

impl SecretStore {
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values: HashMap<String, String> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut patterns: Vec<String> = Vec::new();
        for value in values.values() {
            if value.is_empty() {
                continue;
            }
            patterns.push(value.clone());
            // Multi-line secrets are also masked line by line
            if value.contains('\n') {
                patterns.extend(
                    value
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(String::from),
                );
            }
        }
        patterns.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        patterns.dedup();

        Self { values, patterns }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Secret names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Replace every occurrence of a secret value with [`REDACTED`]
    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();
        for pattern in &self.patterns {
            if result.contains(pattern.as_str()) {
                result = result.replace(pattern.as_str(), REDACTED);
            }
        }
        result
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretStore")
            .field("names", &self.names())
            .finish()
    }
}
