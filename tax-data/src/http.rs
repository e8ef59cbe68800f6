//! HTTP bracket source backed by `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::config::FetcherConfig;
use crate::source::{AttemptError, BracketSource};
use crate::wire::{BracketsResponse, ErrorPayload};

#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct ClientBuildError(String);

/// Reads bracket tables from `GET {base_url}/tax-calculator/tax-year/{year}`.
#[derive(Debug, Clone)]
pub struct HttpBracketSource {
    client: Client,
    config: FetcherConfig,
}

impl HttpBracketSource {
    pub fn new(config: &FetcherConfig) -> Result<Self, ClientBuildError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientBuildError(e.to_string()))?;

        Ok(Self::with_client(client, config))
    }

    /// Uses a caller-built client, e.g. one shared with other services.
    pub fn with_client(
        client: Client,
        config: &FetcherConfig,
    ) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    fn map_request_error(
        &self,
        err: reqwest::Error,
    ) -> AttemptError {
        if err.is_timeout() {
            AttemptError::Timeout(self.config.timeout)
        } else if err.is_decode() {
            AttemptError::MalformedBody(err.to_string())
        } else {
            AttemptError::Transport(err.to_string())
        }
    }
}

/// Message for a failed response: the server's own message when it sent a
/// non-empty one, otherwise one derived from the status line.
fn status_message(
    status: StatusCode,
    payload: &ErrorPayload,
) -> String {
    payload.message.clone().filter(|m| !m.is_empty()).unwrap_or_else(|| {
        format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        )
    })
}

#[async_trait]
impl BracketSource for HttpBracketSource {
    fn location(
        &self,
        tax_year: i32,
    ) -> String {
        self.config.brackets_url(tax_year)
    }

    async fn fetch_once(
        &self,
        tax_year: i32,
    ) -> Result<BracketsResponse, AttemptError> {
        let url = self.config.brackets_url(tax_year);

        let response = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let payload = ErrorPayload::parse(&body);
            debug!(%url, status = status.as_u16(), "bracket source returned an error status");

            return Err(AttemptError::Status {
                status: status.as_u16(),
                message: status_message(status, &payload),
                code: payload.code,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.map_request_error(e))?;

        serde_json::from_slice(&body).map_err(|e| AttemptError::MalformedBody(e.to_string()))
    }
}
