// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Text rendering of run reports

use oc_core::JobStatus;
use oc_engine::{InstanceReport, RunReport};
use std::fmt;
use std::time::Duration;

/// Human-readable view of a [`RunReport`]
pub struct ReportView<'a> {
    report: &'a RunReport,
    steps: bool,
}

impl<'a> ReportView<'a> {
    pub fn summary(report: &'a RunReport) -> Self {
        Self {
            report,
            steps: false,
        }
    }

    /// Include every step under its instance
    pub fn detailed(report: &'a RunReport) -> Self {
        Self {
            report,
            steps: true,
        }
    }
}

pub fn millis(ms: u64) -> humantime::FormattedDuration {
    humantime::format_duration(Duration::from_millis(ms))
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{} {}", count, if count == 1 { one } else { many })
}

fn instance_line(
    f: &mut fmt::Formatter<'_>,
    width: usize,
    instance: &InstanceReport,
) -> fmt::Result {
    let duration = if instance.duration_ms > 0 || !instance.steps.is_empty() {
        millis(instance.duration_ms).to_string()
    } else {
        String::new()
    };
    write!(
        f,
        "  {:<10} {:<width$} {:>8}",
        instance.status.as_str(),
        instance.id,
        duration,
        width = width
    )?;
    if instance.tolerated && instance.status == JobStatus::Failed {
        write!(f, "  (continue-on-error)")?;
    }
    if let Some(reason) = &instance.reason {
        write!(f, "  {}", reason)?;
    }
    writeln!(f)
}

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(
            f,
            "run {}  {}  {}",
            report.run_id.short(),
            report.workflow,
            report.event
        )?;
        writeln!(
            f,
            "status: {} in {}",
            report.status,
            millis(report.duration_ms)
        )?;

        if !report.instances.is_empty() {
            writeln!(f)?;
            let width = report
                .instances
                .iter()
                .map(|i| i.id.chars().count())
                .max()
                .unwrap_or(0);
            for instance in &report.instances {
                instance_line(f, width, instance)?;
                if self.steps {
                    for step in &instance.steps {
                        write!(f, "      {:<10} {}", step.status.as_str(), step.name)?;
                        if let Some(code) = step.exit_code {
                            write!(f, " (exit {})", code)?;
                        }
                        if let Some(reason) = &step.reason {
                            write!(f, "  {}", reason)?;
                        }
                        writeln!(f)?;
                    }
                }
            }
        }

        let cache = report.cache;
        if cache.hits + cache.misses + cache.saves > 0 {
            writeln!(f)?;
            writeln!(
                f,
                "cache: {} ({} exact), {}, {}",
                plural(cache.hits, "hit", "hits"),
                cache.exact_hits,
                plural(cache.misses, "miss", "misses"),
                plural(cache.saves, "save", "saves")
            )?;
        }

        let artifacts: Vec<_> = report.artifacts().collect();
        if !artifacts.is_empty() {
            writeln!(f)?;
            writeln!(f, "artifacts:")?;
            for artifact in artifacts {
                writeln!(
                    f,
                    "  {}  {}, {} bytes, expires {}",
                    artifact.name,
                    plural(artifact.files, "file", "files"),
                    artifact.bytes,
                    artifact.expires_at.format("%Y-%m-%d")
                )?;
            }
        }

        let warnings: Vec<(Option<&str>, &str)> = report
            .instances
            .iter()
            .flat_map(|i| i.warnings.iter().map(move |w| (Some(i.id.as_str()), w.as_str())))
            .chain(report.warnings.iter().map(|w| (None, w.as_str())))
            .collect();
        if !warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "warnings:")?;
            for (instance, warning) in warnings {
                match instance {
                    Some(id) => writeln!(f, "  - {}: {}", id, warning)?,
                    None => writeln!(f, "  - {}", warning)?,
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
