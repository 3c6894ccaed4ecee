// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expression language used by `if` predicates and `${{ }}` templates
//!
//! ```text
//! expr    := or
//! or      := and ('||' and)*
//! and     := unary ('&&' unary)*
//! unary   := '!' unary | compare
//! compare := primary (('==' | '!=') primary)?
//! primary := 'string' | number | true | false | null
//!          | name '(' args ')' | name ('.' name)* | '(' expr ')'
//! ```

use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Root names a reference may start with
pub const KNOWN_CONTEXTS: [&str; 8] = [
    "matrix", "env", "secrets", "steps", "needs", "event", "run", "job",
];

/// Errors found while parsing an expression
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("syntax error at column {column}: {message}")]
    Syntax { column: usize, message: String },
    #[error("unknown function: {0}()")]
    UnknownFunction(String),
    #[error("{function}() takes {expected} argument(s), got {got}")]
    Arity {
        function: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("unknown context `{0}`")]
    UnknownContext(String),
}

/// Errors raised by a resolver during evaluation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("{0}")]
    Denied(String),
}

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Str(String),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Bool(true) => Cow::Borrowed("true"),
            Value::Bool(false) => Cow::Borrowed("false"),
            Value::Str(s) => Cow::Borrowed(s.as_str()),
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Value::Str(s) => s,
            other => other.as_text().into_owned(),
        }
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map_or(Value::Null, Value::Str)
    }
}

/// Job status functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusFn {
    Success,
    Failure,
    Always,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Status(StatusFn),
    Contains,
    StartsWith,
    EndsWith,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "success" => Function::Status(StatusFn::Success),
            "failure" => Function::Status(StatusFn::Failure),
            "always" => Function::Status(StatusFn::Always),
            "cancelled" => Function::Status(StatusFn::Cancelled),
            "contains" => Function::Contains,
            "startsWith" => Function::StartsWith,
            "endsWith" => Function::EndsWith,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Function::Status(StatusFn::Success) => "success",
            Function::Status(StatusFn::Failure) => "failure",
            Function::Status(StatusFn::Always) => "always",
            Function::Status(StatusFn::Cancelled) => "cancelled",
            Function::Contains => "contains",
            Function::StartsWith => "startsWith",
            Function::EndsWith => "endsWith",
        }
    }

    fn arity(self) -> usize {
        match self {
            Function::Status(_) => 0,
            Function::Contains | Function::StartsWith | Function::EndsWith => 2,
        }
    }
}

/// Supplies reference values and job status to the evaluator
pub trait Resolver {
    /// Resolve a dotted reference such as `matrix.os`. Unknown names are `Null`.
    fn resolve(&self, path: &[String]) -> Result<Value, EvalError>;

    fn status(&self, function: StatusFn) -> bool;
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal(Value),
    Ref(Vec<String>),
    Call(Function, Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn parse(source: &str) -> Result<Expr, ExprError> {
        let tokens = lex(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: source.chars().count() + 1,
        };
        let expr = parser.or()?;
        match parser.peek() {
            None => Ok(expr),
            Some((token, column)) => Err(ExprError::Syntax {
                column,
                message: format!("unexpected {}", token),
            }),
        }
    }

    pub fn eval(&self, resolver: &dyn Resolver) -> Result<Value, EvalError> {
        Ok(match self {
            Expr::Literal(value) => value.clone(),
            Expr::Ref(path) => resolver.resolve(path)?,
            Expr::Call(Function::Status(f), _) => Value::Bool(resolver.status(*f)),
            Expr::Call(function, args) => {
                let haystack = eval_arg(args, 0, resolver)?.to_lowercase();
                let needle = eval_arg(args, 1, resolver)?.to_lowercase();
                Value::Bool(match function {
                    Function::Contains => haystack.contains(&needle),
                    Function::StartsWith => haystack.starts_with(&needle),
                    Function::EndsWith => haystack.ends_with(&needle),
                    Function::Status(_) => false,
                })
            }
            Expr::Not(inner) => Value::Bool(!inner.eval(resolver)?.truthy()),
            Expr::And(lhs, rhs) => {
                Value::Bool(lhs.eval(resolver)?.truthy() && rhs.eval(resolver)?.truthy())
            }
            Expr::Or(lhs, rhs) => {
                Value::Bool(lhs.eval(resolver)?.truthy() || rhs.eval(resolver)?.truthy())
            }
            Expr::Eq(lhs, rhs) => {
                Value::Bool(lhs.eval(resolver)?.as_text() == rhs.eval(resolver)?.as_text())
            }
            Expr::Ne(lhs, rhs) => {
                Value::Bool(lhs.eval(resolver)?.as_text() != rhs.eval(resolver)?.as_text())
            }
        })
    }

    /// True if any status function appears in the tree
    pub fn uses_status_function(&self) -> bool {
        match self {
            Expr::Literal(_) | Expr::Ref(_) => false,
            Expr::Call(Function::Status(_), _) => true,
            Expr::Call(_, args) => args.iter().any(Expr::uses_status_function),
            Expr::Not(inner) => inner.uses_status_function(),
            Expr::And(l, r) | Expr::Or(l, r) | Expr::Eq(l, r) | Expr::Ne(l, r) => {
                l.uses_status_function() || r.uses_status_function()
            }
        }
    }

    /// Every dotted reference in the tree
    pub fn references(&self) -> Vec<&[String]> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a [String]>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ref(path) => out.push(path),
            Expr::Call(_, args) => args.iter().for_each(|a| a.collect_refs(out)),
            Expr::Not(inner) => inner.collect_refs(out),
            Expr::And(l, r) | Expr::Or(l, r) | Expr::Eq(l, r) | Expr::Ne(l, r) => {
                l.collect_refs(out);
                r.collect_refs(out);
            }
        }
    }
}

fn eval_arg(args: &[Expr], idx: usize, resolver: &dyn Resolver) -> Result<String, EvalError> {
    match args.get(idx) {
        Some(arg) => Ok(arg.eval(resolver)?.into_string()),
        None => Ok(String::new()),
    }
}

/// A parsed `if` predicate together with its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    /// Parse a predicate; an enclosing `${{ }}` is accepted and stripped
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let trimmed = source.trim();
        let inner = trimmed
            .strip_prefix("${{")
            .and_then(|rest| rest.strip_suffix("}}"))
            .unwrap_or(trimmed);
        Ok(Self {
            source: trimmed.to_string(),
            expr: Expr::parse(inner)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// True if the predicate opts into running after a failure
    pub fn overrides_failure(&self) -> bool {
        self.expr.uses_status_function()
    }

    /// Evaluate; a predicate without a status function implies `success() && ...`
    pub fn evaluate(&self, resolver: &dyn Resolver) -> Result<bool, EvalError> {
        if !self.expr.uses_status_function() && !resolver.status(StatusFn::Success) {
            return Ok(false);
        }
        Ok(self.expr.eval(resolver)?.truthy())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// --- lexer ---

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Num(String),
    Dot,
    LParen,
    RParen,
    Comma,
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Bang,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "`{}`", name),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Num(n) => write!(f, "{}", n),
            Token::Dot => f.write_str("`.`"),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::Comma => f.write_str("`,`"),
            Token::EqEq => f.write_str("`==`"),
            Token::NotEq => f.write_str("`!=`"),
            Token::AndAnd => f.write_str("`&&`"),
            Token::OrOr => f.write_str("`||`"),
            Token::Bang => f.write_str("`!`"),
        }
    }
}

fn lex(source: &str) -> Result<Vec<(Token, usize)>, ExprError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let syntax = |column: usize, message: &str| ExprError::Syntax {
        column,
        message: message.to_string(),
    };

    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '.' => {
                tokens.push((Token::Dot, column));
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, column));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, column));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, column));
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push((Token::EqEq, column));
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push((Token::NotEq, column));
                i += 2;
            }
            '!' => {
                tokens.push((Token::Bang, column));
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                tokens.push((Token::AndAnd, column));
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                tokens.push((Token::OrOr, column));
                i += 2;
            }
            '\'' => {
                // '' inside a literal is an escaped quote
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(syntax(column, "unterminated string")),
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            value.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            value.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push((Token::Str(value), column));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    // A dot only continues a number when a digit follows
                    if chars[i] == '.' && !chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()) {
                        break;
                    }
                    i += 1;
                }
                tokens.push((Token::Num(chars[start..i].iter().collect()), column));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '-')
                {
                    i += 1;
                }
                tokens.push((Token::Ident(chars[start..i].iter().collect()), column));
            }
            other => {
                return Err(syntax(column, &format!("unexpected character `{}`", other)));
            }
        }
    }
    Ok(tokens)
}

// --- parser ---

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<(&Token, usize)> {
        self.tokens.get(self.pos).map(|(t, c)| (t, *c))
    }

    fn bump(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().map(|(t, _)| t) == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn column(&self) -> usize {
        self.peek().map_or(self.end, |(_, c)| c)
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError::Syntax {
            column: self.column(),
            message: message.into(),
        }
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Bang) {
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.compare()
    }

    fn compare(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.primary()?;
        if self.eat(&Token::EqEq) {
            return Ok(Expr::Eq(Box::new(lhs), Box::new(self.primary()?)));
        }
        if self.eat(&Token::NotEq) {
            return Ok(Expr::Ne(Box::new(lhs), Box::new(self.primary()?)));
        }
        Ok(lhs)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some((token, column)) = self.bump() else {
            return Err(self.error("unexpected end of expression"));
        };
        match token {
            Token::Str(s) | Token::Num(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::LParen => {
                let inner = self.or()?;
                if !self.eat(&Token::RParen) {
                    return Err(self.error("expected `)`"));
                }
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.peek().map(|(t, _)| t) == Some(&Token::LParen) {
                    return self.call(name);
                }
                if self.peek().map(|(t, _)| t) != Some(&Token::Dot) {
                    match name.as_str() {
                        "true" => return Ok(Expr::Literal(Value::Bool(true))),
                        "false" => return Ok(Expr::Literal(Value::Bool(false))),
                        "null" => return Ok(Expr::Literal(Value::Null)),
                        _ => {}
                    }
                }
                self.reference(name)
            }
            other => Err(ExprError::Syntax {
                column,
                message: format!("unexpected {}", other),
            }),
        }
    }

    fn call(&mut self, name: String) -> Result<Expr, ExprError> {
        let function = Function::lookup(&name).ok_or(ExprError::UnknownFunction(name))?;
        self.eat(&Token::LParen);

        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.or()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                if self.eat(&Token::RParen) {
                    break;
                }
                return Err(self.error("expected `,` or `)`"));
            }
        }

        if args.len() != function.arity() {
            return Err(ExprError::Arity {
                function: function.name(),
                expected: function.arity(),
                got: args.len(),
            });
        }
        Ok(Expr::Call(function, args))
    }

    fn reference(&mut self, root: String) -> Result<Expr, ExprError> {
        if !KNOWN_CONTEXTS.contains(&root.as_str()) {
            return Err(ExprError::UnknownContext(root));
        }
        let mut path = vec![root];
        while self.eat(&Token::Dot) {
            match self.bump() {
                Some((Token::Ident(segment), _)) | Some((Token::Num(segment), _)) => {
                    path.push(segment)
                }
                _ => return Err(self.error("expected a name after `.`")),
            }
        }
        Ok(Expr::Ref(path))
    }
}

#[cfg(test)]
#[path = "expr_tests.rs"]
mod tests;
