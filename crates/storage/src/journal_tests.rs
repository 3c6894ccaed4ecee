// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oc_core::{JobStatus, RunId, RunStatus, TriggerEvent};
use std::fs;

fn started() -> RunEvent {
    RunEvent::RunStarted {
        run_id: RunId::new("run-1"),
        workflow: "ci".to_string(),
        event: TriggerEvent::push("main"),
    }
}

fn transition(instance: &str, status: JobStatus) -> RunEvent {
    RunEvent::JobTransition {
        instance: instance.to_string(),
        status,
        reason: None,
    }
}

#[test]
fn append_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    let now = Utc::now();

    let mut journal = Journal::open(&path).unwrap();
    assert_eq!(journal.append(started(), now).unwrap(), 1);
    assert_eq!(journal.append(transition("build", JobStatus::Running), now).unwrap(), 2);
    journal
        .append(RunEvent::RunFinished { status: RunStatus::Succeeded }, now)
        .unwrap();

    let read = Journal::read(&path).unwrap();
    assert_eq!(read.skipped, 0);
    assert_eq!(read.entries.len(), 3);
    assert_eq!(read.entries[0].event, started());
    assert_eq!(
        read.entries.iter().map(|e| e.seq).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[test]
fn sequence_continues_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    {
        let mut journal = Journal::open(&path).unwrap();
        journal.append(started(), Utc::now()).unwrap();
    }
    let journal = Journal::open(&path).unwrap();
    assert_eq!(journal.sequence(), 1);
}

#[test]
fn torn_and_tampered_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    {
        let mut journal = Journal::open(&path).unwrap();
        journal.append(started(), Utc::now()).unwrap();
        journal
            .append(transition("build", JobStatus::Running), Utc::now())
            .unwrap();
    }

    let content = fs::read_to_string(&path).unwrap();
    let tampered = content.replace("\"running\"", "\"succeeded\"");
    fs::write(&path, format!("{}{{\"seq\":3,\"at\":", tampered)).unwrap();

    let read = Journal::read(&path).unwrap();
    assert_eq!(read.entries.len(), 1);
    assert_eq!(read.skipped, 2);
}

#[test]
fn missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let read = Journal::read(&dir.path().join("nope.jsonl")).unwrap();
    assert!(read.entries.is_empty());
}
