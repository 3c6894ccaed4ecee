// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolved matrix value tuples

use serde::{Deserialize, Serialize};

/// One concrete combination of matrix axis values.
///
/// Keeps axis order for display; equality ignores order so an include rule
/// written in a different key order still matches a product tuple.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatrixValues(Vec<(String, String)>);

impl MatrixValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an axis value, replacing an existing one in place
    pub fn insert(&mut self, axis: impl Into<String>, value: impl Into<String>) {
        let axis = axis.into();
        let value = value.into();
        match self.0.iter_mut().find(|(a, _)| *a == axis) {
            Some(entry) => entry.1 = value,
            None => self.0.push((axis, value)),
        }
    }

    pub fn get(&self, axis: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(a, _)| a == axis)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(a, v)| (a.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if every axis named in `partial` has the same value here
    pub fn matches(&self, partial: &MatrixValues) -> bool {
        partial.iter().all(|(axis, value)| self.get(axis) == Some(value))
    }

    /// Comma separated values in axis order: `linux, stable`
    pub fn label(&self) -> String {
        self.0
            .iter()
            .map(|(_, v)| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl PartialEq for MatrixValues {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.matches(other)
    }
}

impl Eq for MatrixValues {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MatrixValues {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut values = MatrixValues::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_axis_order() {
        let a: MatrixValues = [("os", "linux"), ("rust", "stable")].into_iter().collect();
        let b: MatrixValues = [("rust", "stable"), ("os", "linux")].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.label(), "linux, stable");
        assert_eq!(b.label(), "stable, linux");
    }

    #[test]
    fn partial_match() {
        let tuple: MatrixValues = [("os", "macos"), ("rust", "nightly")].into_iter().collect();
        let rule: MatrixValues = [("os", "macos")].into_iter().collect();
        let other: MatrixValues = [("os", "linux")].into_iter().collect();
        assert!(tuple.matches(&rule));
        assert!(!tuple.matches(&other));
        assert_ne!(tuple, rule);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut values: MatrixValues = [("os", "linux"), ("rust", "stable")].into_iter().collect();
        values.insert("os", "macos");
        assert_eq!(values.label(), "macos, stable");
        assert_eq!(values.len(), 2);
    }
}
