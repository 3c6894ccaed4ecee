// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${{ expression }}` interpolation

use crate::expr::{EvalError, Expr, ExprError, Resolver};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static EXPR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{\{(.*?)\}\}").expect("constant regex pattern is valid"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("invalid expression `{source_text}`: {error}")]
    Expr { source_text: String, error: ExprError },
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// Check that every `${{ }}` block in `template` parses
pub fn validate_template(template: &str) -> Result<(), TemplateError> {
    for caps in EXPR_PATTERN.captures_iter(template) {
        let source_text = caps[1].trim();
        Expr::parse(source_text).map_err(|error| TemplateError::Expr {
            source_text: source_text.to_string(),
            error,
        })?;
    }
    Ok(())
}

/// True if the template contains at least one expression
pub fn has_expressions(template: &str) -> bool {
    EXPR_PATTERN.is_match(template)
}

/// Replace every `${{ expr }}` with its evaluated text.
///
/// Unknown references expand to the empty string.
pub fn interpolate(template: &str, resolver: &dyn Resolver) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut last = 0;
    for caps in EXPR_PATTERN.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let source_text = caps[1].trim();
        let expr = Expr::parse(source_text).map_err(|error| TemplateError::Expr {
            source_text: source_text.to_string(),
            error,
        })?;
        result.push_str(&template[last..whole.start()]);
        result.push_str(&expr.eval(resolver)?.into_string());
        last = whole.end();
    }
    result.push_str(&template[last..]);
    Ok(result)
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
