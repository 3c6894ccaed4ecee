// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run notifications

mod webhook;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use webhook::WebhookNotifier;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifyAdapter, NotifyCall};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },
    #[error("notification task failed: {0}")]
    Task(String),
}

/// Delivers a JSON payload to an endpoint
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    async fn send(&self, endpoint: &str, payload: &serde_json::Value) -> Result<(), NotifyError>;
}
