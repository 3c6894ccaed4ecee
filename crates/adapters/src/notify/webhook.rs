// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{NotifyAdapter, NotifyError};
use async_trait::async_trait;

/// POSTs the payload as JSON. The blocking HTTP call runs on the blocking pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebhookNotifier;

impl WebhookNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifyAdapter for WebhookNotifier {
    async fn send(&self, endpoint: &str, payload: &serde_json::Value) -> Result<(), NotifyError> {
        let url = endpoint.to_string();
        let body = payload.to_string();
        let result = tokio::task::spawn_blocking(move || {
            ureq::post(&url)
                .header("Content-Type", "application/json")
                .send(body)
                .map(|_| ())
                .map_err(|e| NotifyError::Request {
                    endpoint: url.clone(),
                    message: e.to_string(),
                })
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(e) => Err(NotifyError::Task(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[tokio::test]
    async fn posts_json_body() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            // Read until the JSON body's closing brace arrives
            while !buf.ends_with(b"}") {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            stream
                .write_all(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });

        let payload = serde_json::json!({ "status": "failed" });
        WebhookNotifier::new()
            .send(&format!("http://{}/hook", addr), &payload)
            .await
            .unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /hook"));
        assert!(request.to_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"status":"failed"}"#));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        // Bind then drop to get a port nothing listens on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let err = WebhookNotifier::new()
            .send(&format!("http://127.0.0.1:{}/", port), &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Request { .. }));
    }
}
