// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger predicates

use oc_core::{EventKind, TriggerEvent};

/// One `[on.<kind>]` predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub kind: EventKind,
    /// Branch patterns, or tag patterns for [`EventKind::Tag`]. Empty matches any ref.
    pub patterns: Vec<String>,
}

impl Trigger {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            patterns: Vec::new(),
        }
    }

    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn matches(&self, event: &TriggerEvent) -> bool {
        self.kind == event.kind
            && (self.patterns.is_empty()
                || self.patterns.iter().any(|p| glob_match(p, &event.git_ref)))
    }
}

/// Match a ref against a glob.
///
/// `*` matches within one path segment, `**` across segments, `?` one
/// character other than `/`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_from(&pattern, &text)
}

fn match_from(pattern: &[char], text: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('*') if pattern.get(1) == Some(&'*') => {
            let rest = &pattern[2..];
            (0..=text.len()).any(|i| match_from(rest, &text[i..]))
        }
        Some('*') => {
            let rest = &pattern[1..];
            for i in 0..=text.len() {
                if match_from(rest, &text[i..]) {
                    return true;
                }
                if text.get(i) == Some(&'/') {
                    break;
                }
            }
            false
        }
        Some('?') => match text.first() {
            Some(c) if *c != '/' => match_from(&pattern[1..], &text[1..]),
            _ => false,
        },
        Some(p) => text.first() == Some(p) && match_from(&pattern[1..], &text[1..]),
    }
}
