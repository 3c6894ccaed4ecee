// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    start = { JobStatus::Pending, JobStatus::Running },
    skip = { JobStatus::Pending, JobStatus::Skipped },
    cancel_pending = { JobStatus::Pending, JobStatus::Cancelled },
    no_runner = { JobStatus::Pending, JobStatus::Failed },
    succeed = { JobStatus::Running, JobStatus::Succeeded },
    fail = { JobStatus::Running, JobStatus::Failed },
    cancel_running = { JobStatus::Running, JobStatus::Cancelled },
)]
fn allowed_transitions(from: JobStatus, to: JobStatus) {
    assert!(from.can_transition_to(to));
}

#[parameterized(
    pending_to_succeeded = { JobStatus::Pending, JobStatus::Succeeded },
    running_to_skipped = { JobStatus::Running, JobStatus::Skipped },
    succeeded_to_running = { JobStatus::Succeeded, JobStatus::Running },
    failed_to_cancelled = { JobStatus::Failed, JobStatus::Cancelled },
    skipped_to_running = { JobStatus::Skipped, JobStatus::Running },
    running_to_pending = { JobStatus::Running, JobStatus::Pending },
)]
fn refused_transitions(from: JobStatus, to: JobStatus) {
    assert!(!from.can_transition_to(to));
}

#[test]
fn terminal_states() {
    assert!(!JobStatus::Pending.is_terminal());
    assert!(!JobStatus::Running.is_terminal());
    assert!(JobStatus::Succeeded.is_terminal());
    assert!(JobStatus::Failed.is_terminal());
    assert!(JobStatus::Skipped.is_terminal());
    assert!(JobStatus::Cancelled.is_terminal());
}

#[test]
fn state_records_times_and_duration() {
    let start = DateTime::from_timestamp(1_000, 0).unwrap();
    let end = DateTime::from_timestamp(1_042, 0).unwrap();
    let mut state = JobState::default();

    state.transition(JobStatus::Running, start).unwrap();
    state.transition(JobStatus::Succeeded, end).unwrap();

    assert_eq!(state.started_at, Some(start));
    assert_eq!(state.finished_at, Some(end));
    assert_eq!(state.duration(), std::time::Duration::from_secs(42));
}

#[test]
fn skipped_instance_never_started() {
    let now = DateTime::from_timestamp(1_000, 0).unwrap();
    let mut state = JobState::default();
    state
        .transition_with_reason(JobStatus::Skipped, "dependency failed", now)
        .unwrap();

    assert_eq!(state.started_at, None);
    assert_eq!(state.reason.as_deref(), Some("dependency failed"));
    assert_eq!(state.duration(), std::time::Duration::ZERO);
}

#[test]
fn refused_transition_leaves_state_untouched() {
    let now = DateTime::from_timestamp(1_000, 0).unwrap();
    let mut state = JobState::default();
    let err = state.transition(JobStatus::Succeeded, now).unwrap_err();

    assert_eq!(
        err,
        TransitionError {
            from: JobStatus::Pending,
            to: JobStatus::Succeeded
        }
    );
    assert_eq!(state, JobState::default());
}
