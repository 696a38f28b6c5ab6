// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP adapter for the remote earnings service
//!
//! `ureq` is blocking, so each request runs on tokio's blocking pool.

use super::{BalanceAck, BalanceUpdate, Registration, RemoteAdapter, RemoteError};
use accrue_core::{ApiConfig, Identity};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

/// Longest error body excerpt kept in a `RemoteError::Status`
const MAX_MESSAGE_LEN: usize = 200;

/// Header values sent on every request
#[derive(Debug)]
struct Headers {
    referer: String,
    user_agent: String,
}

/// Remote adapter backed by a `ureq` agent
#[derive(Clone)]
pub struct HttpRemoteAdapter {
    agent: Agent,
    base_url: String,
    headers: Arc<Headers>,
}

impl HttpRemoteAdapter {
    pub fn new(config: &ApiConfig) -> Self {
        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .build();

        Self {
            agent: Agent::new_with_config(agent_config),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers: Arc::new(Headers {
                referer: config.referer.clone(),
                user_agent: config.user_agent.clone(),
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Run a blocking request on the blocking pool
    async fn execute<T, F>(&self, f: F) -> Result<T, RemoteError>
    where
        T: Send + 'static,
        F: FnOnce(&Agent, &Headers) -> Result<T, RemoteError> + Send + 'static,
    {
        let agent = self.agent.clone();
        let headers = Arc::clone(&self.headers);
        tokio::task::spawn_blocking(move || f(&agent, &headers))
            .await
            .map_err(|e| RemoteError::Transport(format!("request task failed: {}", e)))?
    }
}

#[async_trait]
impl RemoteAdapter for HttpRemoteAdapter {
    async fn check_registration(&self, wallet: &Identity) -> Result<Registration, RemoteError> {
        let url = self.url("check-registration");
        let wallet = wallet.as_str().to_string();
        self.execute(move |agent, headers| {
            let request = with_headers(agent.get(&url), headers).query("wallet", &wallet);
            let response = request.call().map_err(transport)?;
            read_json(response)
        })
        .await
    }

    async fn update_balance(&self, update: &BalanceUpdate) -> Result<BalanceAck, RemoteError> {
        let url = self.url("update-balance");
        let body = serde_json::to_string(update)
            .map_err(|e| RemoteError::Decode(format!("failed to encode request: {}", e)))?;
        self.execute(move |agent, headers| {
            let response = with_headers(agent.post(&url), headers)
                .send(body.as_str())
                .map_err(transport)?;
            read_json(response)
        })
        .await
    }
}

fn with_headers<B>(request: RequestBuilder<B>, headers: &Headers) -> RequestBuilder<B> {
    request
        .header("Content-Type", "application/json")
        .header("Referer", headers.referer.as_str())
        .header("User-Agent", headers.user_agent.as_str())
}

fn transport(e: ureq::Error) -> RemoteError {
    match e {
        ureq::Error::StatusCode(status) => RemoteError::Status {
            status,
            retry_after: None,
            message: String::new(),
        },
        other => RemoteError::Transport(other.to_string()),
    }
}

/// Map a response to `T`, or to a status error for non-2xx codes
fn read_json<T: DeserializeOwned>(mut response: Response<Body>) -> Result<T, RemoteError> {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| RemoteError::Transport(format!("failed to read response: {}", e)))?;

    if !(200..300).contains(&status) {
        return Err(RemoteError::Status {
            status,
            retry_after,
            message: error_message(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))
}

/// `Retry-After` in delta-seconds; HTTP-date values are ignored
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Prefer the service's `message` field, else a trimmed body excerpt
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = json.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }
    body.trim().chars().take(MAX_MESSAGE_LEN).collect()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
