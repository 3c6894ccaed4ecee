// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-finished notifications

use crate::report::RunReport;
use oc_adapters::NotifyAdapter;
use oc_workflow::NotifySink;
use serde_json::json;
use std::time::Duration;

/// Summary sent to every matching sink
pub fn payload(report: &RunReport) -> serde_json::Value {
    let failed: Vec<&str> = report
        .instances
        .iter()
        .filter(|i| i.fails_run())
        .map(|i| i.id.as_str())
        .collect();
    json!({
        "run_id": report.run_id,
        "workflow": report.workflow,
        "status": report.status,
        "event": report.event,
        "duration_ms": report.duration_ms,
        "instances": report.instances.len(),
        "failed": failed,
    })
}

/// Send the report summary to each sink, each bounded by `timeout`.
///
/// Returns one warning per failed delivery; failures never change the run.
pub async fn notify<'a, N: NotifyAdapter>(
    adapter: &N,
    sinks: impl IntoIterator<Item = &'a NotifySink>,
    report: &RunReport,
    timeout: Duration,
) -> Vec<String> {
    let body = payload(report);
    let mut warnings = Vec::new();
    for sink in sinks {
        let result = tokio::time::timeout(timeout, adapter.send(&sink.url, &body)).await;
        let warning = match result {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => format!("notification to {} failed: {}", sink.url, e),
            Err(_) => format!(
                "notification to {} timed out after {}ms",
                sink.url,
                timeout.as_millis()
            ),
        };
        tracing::warn!(endpoint = %sink.url, "{}", warning);
        warnings.push(warning);
    }
    warnings
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
