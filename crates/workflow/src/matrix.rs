// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Matrix definitions and expansion

use oc_core::MatrixValues;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("matrix for job `{job}` expands to zero instances")]
pub struct EmptyMatrixError {
    pub job: String,
}

/// `[job.<name>.matrix]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixDef {
    /// Axis name and its values, in declaration order
    pub axes: Vec<(String, Vec<String>)>,
    pub include: Vec<MatrixValues>,
    pub exclude: Vec<MatrixValues>,
}

impl MatrixDef {
    pub fn axis(&self, name: &str) -> Option<&[String]> {
        self.axes
            .iter()
            .find(|(axis, _)| axis == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Size of the cross product before excludes/includes
    pub fn product_len(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// Cross product (last axis varies fastest) minus excludes, plus
    /// includes not already present, appended in declaration order.
    ///
    /// A matrix with no axes has an empty product. May return an empty list.
    pub fn expand(&self) -> Vec<MatrixValues> {
        let mut tuples: Vec<MatrixValues> = if self.axes.is_empty() {
            Vec::new()
        } else {
            self.axes
                .iter()
                .fold(vec![MatrixValues::new()], |acc, (axis, values)| {
                    acc.iter()
                        .flat_map(|prefix| {
                            values.iter().map(move |value| {
                                let mut tuple = prefix.clone();
                                tuple.insert(axis.clone(), value.clone());
                                tuple
                            })
                        })
                        .collect()
                })
        };

        tuples.retain(|tuple| !self.exclude.iter().any(|rule| tuple.matches(rule)));

        for include in &self.include {
            if !tuples.contains(include) {
                tuples.push(include.clone());
            }
        }
        tuples
    }
}

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
