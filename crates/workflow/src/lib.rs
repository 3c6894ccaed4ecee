// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! oc-workflow: workflow definitions for the Otter CI engine
//!
//! Parses TOML workflow files, builds the job dependency graph, expands
//! matrices and evaluates `if` predicates and `${{ }}` templates.

mod error;
pub mod expr;
mod graph;
mod job;
mod matrix;
mod parser;
mod step;
pub mod template;
mod trigger;
mod workflow;

pub use error::ParseError;
pub use expr::{Condition, EvalError, Expr, ExprError, Resolver, StatusFn, Value};
pub use graph::{CyclicDependencyError, DependencyGraph, GraphError};
pub use job::{
    Access, ArtifactDef, CacheDef, JobDef, Permission, Permissions, Scope, DEFAULT_RETENTION_DAYS,
};
pub use matrix::{EmptyMatrixError, MatrixDef};
pub use parser::{load_workflow, parse_workflow, ParseOptions};
pub use step::{ActionRef, PinError, PinPolicy, StepDef, StepKind};
pub use template::{interpolate, validate_template, TemplateError};
pub use trigger::{glob_match, Trigger};
pub use workflow::{NotifySink, NotifyWhen, Workflow};
