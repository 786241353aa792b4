//! Single-attempt delivery of an AnkiConnect request body.

use std::{error::Error as StdError, io, time::Duration};

use serde_json::Value;

use crate::{action::Action, client::ConnectConfig, error::ConnectError};

const BODY_PREVIEW_CHARS: usize = 200;

/// Sends one request body and decodes the JSON reply. No retries, no envelope
/// interpretation; both belong to [`crate::AnkiConnect`].
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, action: Action, body: &Value) -> Result<Value, ConnectError>;
}

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ConnectConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            url: config.url.clone(),
            timeout: config.timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn classify(&self, action: Action, error: reqwest::Error) -> ConnectError {
        if error.is_timeout() {
            ConnectError::Timeout {
                action,
                elapsed_ms: self.timeout.as_millis() as u64,
            }
        } else if error.is_connect() || is_connection_drop(&error) {
            ConnectError::ConnectionFailed {
                url: self.url.clone(),
                cause: error.to_string(),
            }
        } else {
            ConnectError::Request {
                action,
                cause: error.to_string(),
            }
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, action: Action, body: &Value) -> Result<Value, ConnectError> {
        let response = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(action, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ConnectError::HttpStatus {
                action,
                status: status.as_u16(),
                body: text.chars().take(BODY_PREVIEW_CHARS).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.classify(action, e))?;

        serde_json::from_slice(&bytes).map_err(|e| ConnectError::MalformedResponse {
            action,
            cause: e.to_string(),
        })
    }
}

/// Resets and aborts surface as plain request errors in reqwest; find them in
/// the source chain.
fn is_connection_drop(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = error.source();
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return matches!(
                io_error.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::TimedOut
            );
        }
        source = cause.source();
    }
    false
}
