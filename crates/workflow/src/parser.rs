// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow TOML parsing

use crate::error::ParseError;
use crate::expr::Condition;
use crate::job::{ArtifactDef, CacheDef, JobDef, Permission, Permissions, DEFAULT_RETENTION_DAYS};
use crate::matrix::MatrixDef;
use crate::step::{ActionRef, PinPolicy, StepDef, StepKind};
use crate::template::validate_template;
use crate::trigger::Trigger;
use crate::workflow::{NotifySink, NotifyWhen, Workflow};
use oc_core::{EventKind, MatrixValues};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use toml::{Table, Value};

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").expect("constant regex pattern is valid")
});

const DEFAULT_NAME: &str = "workflow";

const ROOT_KEYS: &[&str] = &["name", "on", "env", "notify", "job"];
const JOB_KEYS: &[&str] = &[
    "runs-on",
    "needs",
    "matrix",
    "step",
    "steps",
    "permissions",
    "env",
    "if",
    "continue-on-error",
    "timeout",
    "cache",
    "artifacts",
];
const STEP_KEYS: &[&str] = &[
    "id",
    "name",
    "run",
    "uses",
    "with",
    "if",
    "continue-on-error",
    "timeout",
    "env",
    "outputs",
];

/// Options that change what the parser accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub pin_policy: PinPolicy,
}

/// Read and parse a workflow file
pub fn load_workflow(path: &Path, options: &ParseOptions) -> Result<Workflow, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_workflow(&content, options)
}

/// Parse a workflow from TOML content
pub fn parse_workflow(content: &str, options: &ParseOptions) -> Result<Workflow, ParseError> {
    let root: Table = toml::from_str(content)?;
    check_keys(&root, ROOT_KEYS, "")?;

    let name = match root.get("name") {
        Some(value) => {
            let name = as_str(value, "name")?;
            if name.trim().is_empty() {
                return Err(ParseError::invalid("name", "must not be empty"));
            }
            name.to_string()
        }
        None => DEFAULT_NAME.to_string(),
    };

    let triggers = parse_triggers(
        root.get("on")
            .ok_or_else(|| ParseError::MissingField("on".to_string()))?,
    )?;

    let env = match root.get("env") {
        Some(value) => parse_env(value, "env")?,
        None => BTreeMap::new(),
    };

    let notify = match root.get("notify") {
        Some(value) => parse_notify(value)?,
        None => Vec::new(),
    };

    let jobs_table = root
        .get("job")
        .ok_or_else(|| ParseError::MissingField("job".to_string()))?;
    let jobs_table = as_table(jobs_table, "job")?;
    if jobs_table.is_empty() {
        return Err(ParseError::invalid("job", "at least one job is required"));
    }

    let mut jobs = Vec::with_capacity(jobs_table.len());
    for (job_name, value) in jobs_table {
        jobs.push(parse_job(job_name, value, options)?);
    }

    // needs are resolved after every job is known so forward references work
    let declared: HashSet<&str> = jobs.iter().map(|j| j.name.as_str()).collect();
    for job in &jobs {
        for dep in &job.needs {
            if !declared.contains(dep.as_str()) {
                return Err(ParseError::invalid(
                    format!("job.{}.needs", job.name),
                    format!("unknown job `{}`", dep),
                ));
            }
        }
    }

    Ok(Workflow {
        name,
        triggers,
        env,
        jobs,
        notify,
    })
}

fn parse_triggers(value: &Value) -> Result<Vec<Trigger>, ParseError> {
    let mut triggers = Vec::new();
    match value {
        // on = "push"
        Value::String(kind) => triggers.push(Trigger::new(parse_event_kind(kind, "on")?)),
        // on = ["push", "manual"]
        Value::Array(kinds) => {
            for (i, kind) in kinds.iter().enumerate() {
                let path = format!("on[{}]", i);
                let kind = parse_event_kind(as_str(kind, &path)?, &path)?;
                triggers.push(Trigger::new(kind));
            }
        }
        Value::Table(table) => {
            for (key, spec) in table {
                let path = format!("on.{}", key);
                let kind = parse_event_kind(key, &path)?;
                triggers.push(parse_trigger(kind, spec, &path)?);
            }
        }
        _ => {
            return Err(ParseError::invalid(
                "on",
                "expected an event name, a list of event names or a table",
            ))
        }
    }
    if triggers.is_empty() {
        return Err(ParseError::invalid("on", "at least one trigger is required"));
    }
    Ok(triggers)
}

fn parse_event_kind(kind: &str, path: &str) -> Result<EventKind, ParseError> {
    kind.parse().map_err(|e| ParseError::invalid(path, e))
}

fn parse_trigger(kind: EventKind, value: &Value, path: &str) -> Result<Trigger, ParseError> {
    let trigger = Trigger::new(kind);
    let table = match value {
        // push = true
        Value::Boolean(true) => return Ok(trigger),
        Value::Table(table) => table,
        _ => return Err(ParseError::invalid(path, "expected a table or `true`")),
    };

    let pattern_key = match kind {
        EventKind::Tag => "tags",
        _ => "branches",
    };
    check_keys(table, &[pattern_key], path)?;

    let Some(patterns) = table.get(pattern_key) else {
        return Ok(trigger);
    };
    let patterns_path = format!("{}.{}", path, pattern_key);
    let patterns = string_list(patterns, &patterns_path)?;
    if patterns.is_empty() {
        return Err(ParseError::invalid(
            patterns_path,
            "pattern list must not be empty (omit it to match every ref)",
        ));
    }
    for (i, pattern) in patterns.iter().enumerate() {
        if pattern.trim().is_empty() {
            return Err(ParseError::invalid(
                format!("{}[{}]", patterns_path, i),
                "pattern must not be empty",
            ));
        }
    }
    Ok(trigger.with_patterns(patterns))
}

fn parse_notify(value: &Value) -> Result<Vec<NotifySink>, ParseError> {
    let entries = value
        .as_array()
        .ok_or_else(|| ParseError::invalid("notify", "expected an array of tables"))?;
    let mut sinks = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let path = format!("notify[{}]", i);
        let table = as_table(entry, &path)?;
        check_keys(table, &["url", "when"], &path)?;

        let url_path = format!("{}.url", path);
        let url = as_str(
            table
                .get("url")
                .ok_or_else(|| ParseError::MissingField(url_path.clone()))?,
            &url_path,
        )?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ParseError::invalid(url_path, "expected an http(s) URL"));
        }

        let when = match table.get("when") {
            Some(when) => {
                let when_path = format!("{}.when", path);
                match as_str(when, &when_path)? {
                    "always" => NotifyWhen::Always,
                    "success" => NotifyWhen::Success,
                    "failure" => NotifyWhen::Failure,
                    other => {
                        return Err(ParseError::invalid(
                            when_path,
                            format!("unknown value `{}` (expected always, success or failure)", other),
                        ))
                    }
                }
            }
            None => NotifyWhen::default(),
        };
        sinks.push(NotifySink {
            url: url.to_string(),
            when,
        });
    }
    Ok(sinks)
}

fn parse_job(name: &str, value: &Value, options: &ParseOptions) -> Result<JobDef, ParseError> {
    let path = format!("job.{}", name);
    if !IDENTIFIER.is_match(name) {
        return Err(ParseError::invalid(
            &path,
            "job names may only contain letters, digits, `_` and `-`",
        ));
    }
    let table = as_table(value, &path)?;
    check_keys(table, JOB_KEYS, &path)?;

    let runs_on_path = format!("{}.runs-on", path);
    let runs_on = as_str(
        table
            .get("runs-on")
            .ok_or_else(|| ParseError::MissingField(runs_on_path.clone()))?,
        &runs_on_path,
    )?;
    if runs_on.trim().is_empty() {
        return Err(ParseError::invalid(runs_on_path, "must not be empty"));
    }

    let mut job = JobDef::new(name, runs_on);

    if let Some(needs) = table.get("needs") {
        let needs_path = format!("{}.needs", path);
        job.needs = match needs {
            Value::String(single) => vec![single.clone()],
            other => string_list(other, &needs_path)?,
        };
    }

    if let Some(matrix) = table.get("matrix") {
        job.matrix = Some(parse_matrix(matrix, &format!("{}.matrix", path))?);
    }

    if let Some(permissions) = table.get("permissions") {
        job.permissions = parse_permissions(permissions, &format!("{}.permissions", path))?;
    }

    if let Some(env) = table.get("env") {
        job.env = parse_env(env, &format!("{}.env", path))?;
    }

    if let Some(cond) = table.get("if") {
        job.condition = Some(parse_condition(cond, &format!("{}.if", path))?);
    }

    if let Some(flag) = table.get("continue-on-error") {
        job.continue_on_error = as_bool(flag, &format!("{}.continue-on-error", path))?;
    }

    if let Some(timeout) = table.get("timeout") {
        job.timeout = Some(parse_duration(timeout, &format!("{}.timeout", path))?);
    }

    if let Some(cache) = table.get("cache") {
        job.cache = Some(parse_cache(cache, &format!("{}.cache", path))?);
    }

    if let Some(artifacts) = table.get("artifacts") {
        job.artifacts = parse_artifacts(artifacts, &format!("{}.artifacts", path))?;
    }

    let (steps_key, steps) = match (table.get("step"), table.get("steps")) {
        (Some(_), Some(_)) => {
            return Err(ParseError::invalid(
                &path,
                "use either `step` or `steps`, not both",
            ))
        }
        (Some(steps), None) => ("step", steps),
        (None, Some(steps)) => ("steps", steps),
        (None, None) => return Err(ParseError::MissingField(format!("{}.step", path))),
    };
    let steps_path = format!("{}.{}", path, steps_key);
    let steps = steps
        .as_array()
        .ok_or_else(|| ParseError::invalid(&steps_path, "expected an array of tables"))?;
    if steps.is_empty() {
        return Err(ParseError::invalid(steps_path, "at least one step is required"));
    }

    let mut seen_ids: HashSet<String> = HashSet::new();
    for (i, step) in steps.iter().enumerate() {
        let step_path = format!("{}[{}]", steps_path, i);
        let step = parse_step(step, &step_path, options)?;
        if let Some(id) = &step.id {
            if !seen_ids.insert(id.clone()) {
                return Err(ParseError::invalid(
                    format!("{}.id", step_path),
                    format!("duplicate step id `{}`", id),
                ));
            }
        }
        job.steps.push(step);
    }

    Ok(job)
}

fn parse_step(value: &Value, path: &str, options: &ParseOptions) -> Result<StepDef, ParseError> {
    let table = as_table(value, path)?;
    check_keys(table, STEP_KEYS, path)?;

    let kind = match (table.get("run"), table.get("uses")) {
        (Some(_), Some(_)) => {
            return Err(ParseError::invalid(
                path,
                "a step has either `run` or `uses`, not both",
            ))
        }
        (None, None) => {
            return Err(ParseError::invalid(path, "a step needs `run` or `uses`"));
        }
        (Some(run), None) => {
            if table.contains_key("with") {
                return Err(ParseError::invalid(
                    format!("{}.with", path),
                    "`with` is only valid for `uses` steps",
                ));
            }
            let run_path = format!("{}.run", path);
            let command = as_str(run, &run_path)?;
            if command.trim().is_empty() {
                return Err(ParseError::invalid(run_path, "command must not be empty"));
            }
            check_template(command, &run_path)?;
            StepKind::Run {
                command: command.to_string(),
            }
        }
        (None, Some(uses)) => {
            let uses_path = format!("{}.uses", path);
            let action = ActionRef::parse(as_str(uses, &uses_path)?, options.pin_policy)
                .map_err(|e| ParseError::invalid(&uses_path, e))?;
            let inputs = match table.get("with") {
                Some(with) => parse_env(with, &format!("{}.with", path))?,
                None => BTreeMap::new(),
            };
            StepKind::Uses { action, inputs }
        }
    };

    let mut step = StepDef {
        id: None,
        name: None,
        kind,
        condition: None,
        continue_on_error: false,
        timeout: None,
        env: BTreeMap::new(),
        outputs: Vec::new(),
    };

    if let Some(id) = table.get("id") {
        let id_path = format!("{}.id", path);
        let id = as_str(id, &id_path)?;
        if !IDENTIFIER.is_match(id) {
            return Err(ParseError::invalid(
                id_path,
                "step ids may only contain letters, digits, `_` and `-`",
            ));
        }
        step.id = Some(id.to_string());
    }

    if let Some(name) = table.get("name") {
        step.name = Some(as_str(name, &format!("{}.name", path))?.to_string());
    }

    if let Some(cond) = table.get("if") {
        step.condition = Some(parse_condition(cond, &format!("{}.if", path))?);
    }

    if let Some(flag) = table.get("continue-on-error") {
        step.continue_on_error = as_bool(flag, &format!("{}.continue-on-error", path))?;
    }

    if let Some(timeout) = table.get("timeout") {
        step.timeout = Some(parse_duration(timeout, &format!("{}.timeout", path))?);
    }

    if let Some(env) = table.get("env") {
        step.env = parse_env(env, &format!("{}.env", path))?;
    }

    if let Some(outputs) = table.get("outputs") {
        let outputs_path = format!("{}.outputs", path);
        step.outputs = string_list(outputs, &outputs_path)?;
        for (i, output) in step.outputs.iter().enumerate() {
            if !IDENTIFIER.is_match(output) {
                return Err(ParseError::invalid(
                    format!("{}[{}]", outputs_path, i),
                    format!("invalid output name `{}`", output),
                ));
            }
        }
    }

    Ok(step)
}

fn parse_matrix(value: &Value, path: &str) -> Result<MatrixDef, ParseError> {
    let table = as_table(value, path)?;
    let mut matrix = MatrixDef::default();

    for (key, axis) in table {
        if key == "include" || key == "exclude" {
            continue;
        }
        let axis_path = format!("{}.{}", path, key);
        if !IDENTIFIER.is_match(key) {
            return Err(ParseError::invalid(axis_path, "invalid axis name"));
        }
        let values = axis
            .as_array()
            .ok_or_else(|| ParseError::invalid(&axis_path, "expected an array of values"))?;
        let mut seen = HashSet::new();
        let mut axis_values = Vec::with_capacity(values.len());
        for (i, v) in values.iter().enumerate() {
            let value_path = format!("{}[{}]", axis_path, i);
            let v = scalar(v, &value_path)?;
            if !seen.insert(v.clone()) {
                return Err(ParseError::invalid(
                    value_path,
                    format!("duplicate axis value `{}`", v),
                ));
            }
            axis_values.push(v);
        }
        matrix.axes.push((key.clone(), axis_values));
    }

    if let Some(exclude) = table.get("exclude") {
        let exclude_path = format!("{}.exclude", path);
        matrix.exclude = parse_rules(exclude, &exclude_path)?;
        for (i, rule) in matrix.exclude.iter().enumerate() {
            if rule.is_empty() {
                return Err(ParseError::invalid(
                    format!("{}[{}]", exclude_path, i),
                    "exclude rule must name at least one axis",
                ));
            }
            for (axis, _) in rule.iter() {
                if matrix.axis(axis).is_none() {
                    return Err(ParseError::invalid(
                        format!("{}[{}].{}", exclude_path, i, axis),
                        format!("unknown axis `{}`", axis),
                    ));
                }
            }
        }
    }

    if let Some(include) = table.get("include") {
        let include_path = format!("{}.include", path);
        matrix.include = parse_rules(include, &include_path)?;
        if let Some(i) = matrix.include.iter().position(MatrixValues::is_empty) {
            return Err(ParseError::invalid(
                format!("{}[{}]", include_path, i),
                "include entry must set at least one axis",
            ));
        }
    }

    if matrix.axes.is_empty() && matrix.include.is_empty() {
        return Err(ParseError::invalid(
            path,
            "matrix needs at least one axis or include entry",
        ));
    }

    Ok(matrix)
}

fn parse_rules(value: &Value, path: &str) -> Result<Vec<MatrixValues>, ParseError> {
    let entries = value
        .as_array()
        .ok_or_else(|| ParseError::invalid(path, "expected an array of tables"))?;
    let mut rules = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let entry_path = format!("{}[{}]", path, i);
        let table = as_table(entry, &entry_path)?;
        let mut rule = MatrixValues::new();
        for (axis, v) in table {
            rule.insert(axis.clone(), scalar(v, &format!("{}.{}", entry_path, axis))?);
        }
        rules.push(rule);
    }
    Ok(rules)
}

fn parse_permissions(value: &Value, path: &str) -> Result<Permissions, ParseError> {
    let mut permissions = Permissions::none();
    for (i, entry) in string_list(value, path)?.iter().enumerate() {
        let permission: Permission = entry
            .parse()
            .map_err(|e: String| ParseError::invalid(format!("{}[{}]", path, i), e))?;
        permissions.grant(permission);
    }
    Ok(permissions)
}

fn parse_cache(value: &Value, path: &str) -> Result<CacheDef, ParseError> {
    let table = as_table(value, path)?;
    check_keys(table, &["key", "restore-keys", "paths"], path)?;

    let key_path = format!("{}.key", path);
    let key = as_str(
        table
            .get("key")
            .ok_or_else(|| ParseError::MissingField(key_path.clone()))?,
        &key_path,
    )?;
    if key.trim().is_empty() {
        return Err(ParseError::invalid(key_path, "must not be empty"));
    }
    check_template(key, &key_path)?;

    let restore_keys = match table.get("restore-keys") {
        Some(keys) => {
            let keys_path = format!("{}.restore-keys", path);
            let keys = string_list(keys, &keys_path)?;
            for (i, k) in keys.iter().enumerate() {
                check_template(k, &format!("{}[{}]", keys_path, i))?;
            }
            keys
        }
        None => Vec::new(),
    };

    let paths_path = format!("{}.paths", path);
    let paths = relative_paths(
        table
            .get("paths")
            .ok_or_else(|| ParseError::MissingField(paths_path.clone()))?,
        &paths_path,
    )?;

    Ok(CacheDef {
        key: key.to_string(),
        restore_keys,
        paths,
    })
}

fn parse_artifacts(value: &Value, path: &str) -> Result<Vec<ArtifactDef>, ParseError> {
    let entries = value
        .as_array()
        .ok_or_else(|| ParseError::invalid(path, "expected an array of tables"))?;
    let mut artifacts: Vec<ArtifactDef> = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let entry_path = format!("{}[{}]", path, i);
        let table = as_table(entry, &entry_path)?;
        check_keys(table, &["name", "paths", "retention-days"], &entry_path)?;

        let name_path = format!("{}.name", entry_path);
        let name = as_str(
            table
                .get("name")
                .ok_or_else(|| ParseError::MissingField(name_path.clone()))?,
            &name_path,
        )?;
        if !IDENTIFIER.is_match(name) {
            return Err(ParseError::invalid(name_path, "invalid artifact name"));
        }
        if artifacts.iter().any(|a| a.name == name) {
            return Err(ParseError::invalid(
                name_path,
                format!("duplicate artifact `{}`", name),
            ));
        }

        let paths_path = format!("{}.paths", entry_path);
        let paths = relative_paths(
            table
                .get("paths")
                .ok_or_else(|| ParseError::MissingField(paths_path.clone()))?,
            &paths_path,
        )?;

        let retention_days = match table.get("retention-days") {
            Some(days) => {
                let days_path = format!("{}.retention-days", entry_path);
                let days = days
                    .as_integer()
                    .ok_or_else(|| ParseError::invalid(&days_path, "expected an integer"))?;
                u32::try_from(days)
                    .ok()
                    .filter(|d| *d > 0)
                    .ok_or_else(|| ParseError::invalid(&days_path, "must be a positive number of days"))?
            }
            None => DEFAULT_RETENTION_DAYS,
        };

        artifacts.push(ArtifactDef {
            name: name.to_string(),
            paths,
            retention_days,
        });
    }
    Ok(artifacts)
}

/// Paths must stay inside the workspace
fn relative_paths(value: &Value, path: &str) -> Result<Vec<String>, ParseError> {
    let paths = string_list(value, path)?;
    if paths.is_empty() {
        return Err(ParseError::invalid(path, "at least one path is required"));
    }
    for (i, p) in paths.iter().enumerate() {
        let candidate = Path::new(p);
        let escapes = candidate
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
        if p.trim().is_empty() || candidate.is_absolute() || escapes {
            return Err(ParseError::invalid(
                format!("{}[{}]", path, i),
                format!("`{}` must be a relative path inside the workspace", p),
            ));
        }
    }
    Ok(paths)
}

fn parse_env(value: &Value, path: &str) -> Result<BTreeMap<String, String>, ParseError> {
    let table = as_table(value, path)?;
    let mut env = BTreeMap::new();
    for (key, v) in table {
        let entry_path = format!("{}.{}", path, key);
        let v = scalar(v, &entry_path)?;
        check_template(&v, &entry_path)?;
        env.insert(key.clone(), v);
    }
    Ok(env)
}

fn parse_condition(value: &Value, path: &str) -> Result<Condition, ParseError> {
    let source = as_str(value, path)?;
    Condition::parse(source).map_err(|e| ParseError::invalid(path, e))
}

fn parse_duration(value: &Value, path: &str) -> Result<Duration, ParseError> {
    let text = as_str(value, path)?;
    let duration = humantime::parse_duration(text)
        .map_err(|e| ParseError::invalid(path, format!("invalid duration `{}`: {}", text, e)))?;
    if duration.is_zero() {
        return Err(ParseError::invalid(path, "duration must be greater than zero"));
    }
    Ok(duration)
}

fn check_template(text: &str, path: &str) -> Result<(), ParseError> {
    validate_template(text).map_err(|e| ParseError::invalid(path, e))
}

fn check_keys(table: &Table, allowed: &[&str], path: &str) -> Result<(), ParseError> {
    for key in table.keys() {
        if !allowed.contains(&key.as_str()) {
            let full = if path.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", path, key)
            };
            return Err(ParseError::invalid(full, "unknown field"));
        }
    }
    Ok(())
}

fn as_table<'a>(value: &'a Value, path: &str) -> Result<&'a Table, ParseError> {
    value
        .as_table()
        .ok_or_else(|| ParseError::invalid(path, "expected a table"))
}

fn as_str<'a>(value: &'a Value, path: &str) -> Result<&'a str, ParseError> {
    value
        .as_str()
        .ok_or_else(|| ParseError::invalid(path, "expected a string"))
}

fn as_bool(value: &Value, path: &str) -> Result<bool, ParseError> {
    value
        .as_bool()
        .ok_or_else(|| ParseError::invalid(path, "expected a boolean"))
}

/// Strings, integers, floats and booleans, stringified
fn scalar(value: &Value, path: &str) -> Result<String, ParseError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        _ => Err(ParseError::invalid(path, "expected a string, number or boolean")),
    }
}

fn string_list(value: &Value, path: &str) -> Result<Vec<String>, ParseError> {
    let items = value
        .as_array()
        .ok_or_else(|| ParseError::invalid(path, "expected an array of strings"))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| as_str(item, &format!("{}[{}]", path, i)).map(str::to_string))
        .collect()
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
