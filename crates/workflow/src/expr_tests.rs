// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;
use yare::parameterized;

struct MapResolver {
    values: HashMap<String, String>,
    failed: bool,
}

impl MapResolver {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            failed: false,
        }
    }

    fn failed(mut self) -> Self {
        self.failed = true;
        self
    }
}

impl Resolver for MapResolver {
    fn resolve(&self, path: &[String]) -> Result<Value, EvalError> {
        if path[0] == "secrets" {
            return Err(EvalError::Denied("secrets are off limits".to_string()));
        }
        Ok(self.values.get(&path.join(".")).cloned().into())
    }

    fn status(&self, function: StatusFn) -> bool {
        match function {
            StatusFn::Success => !self.failed,
            StatusFn::Failure => self.failed,
            StatusFn::Always => true,
            StatusFn::Cancelled => false,
        }
    }
}

fn eval(source: &str, resolver: &MapResolver) -> bool {
    Expr::parse(source).unwrap().eval(resolver).unwrap().truthy()
}

#[parameterized(
    equal = { "matrix.os == 'linux'", true },
    not_equal = { "matrix.os != 'linux'", false },
    and = { "matrix.os == 'linux' && event.ref == 'main'", true },
    or = { "matrix.os == 'macos' || event.ref == 'main'", true },
    negation = { "!(matrix.os == 'linux')", false },
    unknown_is_falsy = { "env.MISSING", false },
    unknown_equals_empty = { "env.MISSING == ''", true },
    contains = { "contains(event.ref, 'AI')", true },
    starts_with = { "startsWith(event.ref, 'ma')", true },
    ends_with = { "endsWith(event.ref, 'x')", false },
    bool_literal = { "true && !false", true },
    number_compare = { "matrix.node == 18", true },
    status = { "success()", true },
    precedence = { "false && false || true", true },
)]
fn evaluates(source: &str, expected: bool) {
    let resolver = MapResolver::new(&[
        ("matrix.os", "linux"),
        ("matrix.node", "18"),
        ("event.ref", "main"),
    ]);
    assert_eq!(eval(source, &resolver), expected, "{}", source);
}

#[test]
fn escaped_quote_in_literal() {
    let expr = Expr::parse("'it''s'").unwrap();
    assert_eq!(expr, Expr::Literal(Value::Str("it's".to_string())));
}

#[test]
fn dotted_reference_with_dashes_and_numbers() {
    let expr = Expr::parse("steps.build-step.outputs.v2").unwrap();
    assert_eq!(
        expr,
        Expr::Ref(vec![
            "steps".to_string(),
            "build-step".to_string(),
            "outputs".to_string(),
            "v2".to_string(),
        ])
    );
}

#[parameterized(
    unterminated = { "'abc" },
    dangling_operator = { "matrix.os ==" },
    single_equals = { "matrix.os = 'x'" },
    unbalanced = { "(success()" },
    trailing = { "success() success()" },
    bad_dot = { "matrix." },
)]
fn syntax_errors(source: &str) {
    assert!(matches!(
        Expr::parse(source),
        Err(ExprError::Syntax { .. })
    ));
}

#[test]
fn unknown_function_rejected() {
    assert_eq!(
        Expr::parse("hashFiles('x')"),
        Err(ExprError::UnknownFunction("hashFiles".to_string()))
    );
}

#[test]
fn arity_checked_at_parse_time() {
    assert_eq!(
        Expr::parse("contains('a')"),
        Err(ExprError::Arity {
            function: "contains",
            expected: 2,
            got: 1
        })
    );
}

#[test]
fn unknown_context_rejected() {
    assert_eq!(
        Expr::parse("github.ref == 'main'"),
        Err(ExprError::UnknownContext("github".to_string()))
    );
}

#[test]
fn resolver_denial_propagates() {
    let resolver = MapResolver::new(&[]);
    let err = Expr::parse("secrets.TOKEN").unwrap().eval(&resolver).unwrap_err();
    assert_eq!(err, EvalError::Denied("secrets are off limits".to_string()));
}

#[test]
fn condition_without_status_function_requires_success() {
    let cond = Condition::parse("matrix.os == 'linux'").unwrap();
    let ok = MapResolver::new(&[("matrix.os", "linux")]);
    let failed = MapResolver::new(&[("matrix.os", "linux")]).failed();

    assert!(!cond.overrides_failure());
    assert!(cond.evaluate(&ok).unwrap());
    assert!(!cond.evaluate(&failed).unwrap());
}

#[test]
fn condition_with_failure_runs_after_failure() {
    let cond = Condition::parse("${{ failure() }}").unwrap();
    let ok = MapResolver::new(&[]);
    let failed = MapResolver::new(&[]).failed();

    assert_eq!(cond.source(), "${{ failure() }}");
    assert!(cond.overrides_failure());
    assert!(!cond.evaluate(&ok).unwrap());
    assert!(cond.evaluate(&failed).unwrap());
}

#[test]
fn always_runs_regardless() {
    let cond = Condition::parse("always()").unwrap();
    assert!(cond.evaluate(&MapResolver::new(&[]).failed()).unwrap());
}

#[test]
fn references_are_collected() {
    let expr = Expr::parse("contains(env.A, matrix.b) && !secrets.C").unwrap();
    let refs: Vec<String> = expr.references().iter().map(|r| r.join(".")).collect();
    assert_eq!(refs, vec!["env.A", "matrix.b", "secrets.C"]);
}
