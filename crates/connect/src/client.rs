//! AnkiConnect client: request envelope, retry policy and remote error mapping.
//!
//! Every call goes through [`AnkiConnect::request`]. Transient transport
//! failures are retried a fixed number of times after a fixed backoff; the
//! two benign remote errors (missing deck on a query, missing note or card on
//! a mutation) are resolved here so callers never match on error text.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::{
    action::{API_VERSION, Action, DECK_NOT_FOUND, ITEM_NOT_FOUND},
    error::ConnectError,
    transport::{HttpTransport, Transport},
};

pub const DEFAULT_URL: &str = "http://127.0.0.1:8765";

/// Configuration for client behavior.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Endpoint of the AnkiConnect add-on.
    pub url: String,
    /// Per-request timeout (default: 60s).
    pub timeout: Duration,
    /// TCP connect timeout (default: 10s).
    pub connect_timeout: Duration,
    /// Total attempts for transient failures, the first one included (default: 2).
    pub max_attempts: u32,
    /// Fixed wait before a retry (default: 3s).
    pub retry_backoff: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_owned(),
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            max_attempts: 2,
            retry_backoff: Duration::from_secs(3),
        }
    }
}

/// Serialized client for one AnkiConnect endpoint.
pub struct AnkiConnect<T = HttpTransport> {
    transport: T,
    config: ConnectConfig,
}

impl AnkiConnect<HttpTransport> {
    pub fn new(config: ConnectConfig) -> Self {
        let transport = HttpTransport::new(&config);
        Self { transport, config }
    }
}

impl<T: Transport> AnkiConnect<T> {
    pub fn with_transport(transport: T, config: ConnectConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ConnectConfig {
        &self.config
    }

    /// Issue `action` with `params` and return its `result`.
    pub async fn request(&self, action: Action, params: Value) -> Result<Value, ConnectError> {
        let body = request_body(action, params);
        let reply = self.send_with_retry(action, &body).await?;
        interpret_reply(action, reply)
    }

    async fn send_with_retry(&self, action: Action, body: &Value) -> Result<Value, ConnectError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(%action, attempt, "sending AnkiConnect request");
            match self.transport.send(action, body).await {
                Ok(reply) => return Ok(reply),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    warn!(
                        %action,
                        attempt,
                        max_attempts,
                        backoff_ms = self.config.retry_backoff.as_millis() as u64,
                        error = %err,
                        "AnkiConnect connection issue, retrying"
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(err) => {
                    if attempt > 1 {
                        return Err(ConnectError::RetryExhausted {
                            action,
                            attempts: attempt,
                            last_error: Box::new(err),
                        });
                    }
                    return Err(err);
                }
            }
        }
    }
}

pub(crate) fn request_body(action: Action, params: Value) -> Value {
    json!({
        "action": action.as_str(),
        "version": API_VERSION,
        "params": params,
    })
}

/// Validate the `{result, error}` envelope and resolve benign remote errors.
pub(crate) fn interpret_reply(action: Action, reply: Value) -> Result<Value, ConnectError> {
    let Value::Object(mut envelope) = reply else {
        return Err(ConnectError::MalformedResponse {
            action,
            cause: "expected a JSON object".into(),
        });
    };

    if !envelope.contains_key("result") || !envelope.contains_key("error") {
        return Err(ConnectError::MalformedResponse {
            action,
            cause: "response must carry both `result` and `error`".into(),
        });
    }

    let result = envelope.remove("result").unwrap_or(Value::Null);
    match envelope.remove("error").unwrap_or(Value::Null) {
        Value::Null => Ok(result),
        Value::String(message) => resolve_remote_error(action, message),
        other => Err(ConnectError::Remote {
            action,
            message: other.to_string(),
        }),
    }
}

fn resolve_remote_error(action: Action, message: String) -> Result<Value, ConnectError> {
    if action.is_query() && message.contains(DECK_NOT_FOUND) {
        warn!(%action, error = %message, "deck not found, treating as empty");
        return Ok(Value::Array(Vec::new()));
    }

    if action.is_mutation() && ITEM_NOT_FOUND.iter().any(|m| message.contains(m)) {
        warn!(%action, error = %message, "target no longer exists, skipping");
        return Ok(Value::Null);
    }

    Err(ConnectError::Remote { action, message })
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    };

    use super::*;
    use crate::error::ErrorKind;

    /// Replays a fixed list of outcomes, one per attempt.
    struct ScriptedTransport {
        replies: Mutex<Vec<Result<Value, ConnectError>>>,
        calls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(mut replies: Vec<Result<Value, ConnectError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, action: Action, _body: &Value) -> Result<Value, ConnectError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ConnectError::Request {
                    action,
                    cause: "script exhausted".into(),
                }))
        }
    }

    fn fast_config() -> ConnectConfig {
        ConnectConfig {
            retry_backoff: Duration::from_millis(1),
            ..ConnectConfig::default()
        }
    }

    fn refused() -> ConnectError {
        ConnectError::ConnectionFailed {
            url: DEFAULT_URL.into(),
            cause: "connection refused".into(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = ConnectConfig::default();
        assert_eq!(config.url, "http://127.0.0.1:8765");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.retry_backoff, Duration::from_secs(3));
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body(Action::NotesInfo, json!({"query": "deck:\"A\""}));
        assert_eq!(body["action"], "notesInfo");
        assert_eq!(body["version"], 6);
        assert_eq!(body["params"]["query"], "deck:\"A\"");
    }

    #[test]
    fn test_reply_without_error_key_is_malformed() {
        let err = interpret_reply(Action::NotesInfo, json!({"result": []})).unwrap_err();
        assert!(matches!(err, ConnectError::MalformedResponse { .. }));
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }

    #[test]
    fn test_reply_not_an_object_is_malformed() {
        let err = interpret_reply(Action::NotesInfo, json!([1, 2])).unwrap_err();
        assert!(matches!(err, ConnectError::MalformedResponse { .. }));
    }

    #[test]
    fn test_reply_with_null_error_returns_result() {
        let result = interpret_reply(Action::FindCards, json!({"result": [1, 2], "error": null}));
        assert_eq!(result.unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_missing_deck_on_query_is_empty() {
        let reply = json!({"result": null, "error": "deck was not found: Prelims-1"});
        assert_eq!(interpret_reply(Action::NotesInfo, reply).unwrap(), json!([]));
    }

    #[test]
    fn test_missing_deck_on_mutation_is_fatal() {
        let reply = json!({"result": null, "error": "deck was not found: X"});
        let err = interpret_reply(Action::ChangeDeck, reply).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteReported);
        assert_eq!(err.remote_message(), Some("deck was not found: X"));
    }

    #[test]
    fn test_missing_note_on_mutation_is_null() {
        let reply = json!({"result": null, "error": "note was not found: 1234"});
        assert_eq!(interpret_reply(Action::UpdateNoteFields, reply).unwrap(), Value::Null);

        let reply = json!({"result": null, "error": "card was not found"});
        assert_eq!(interpret_reply(Action::ChangeDeck, reply).unwrap(), Value::Null);
    }

    #[test]
    fn test_missing_note_on_query_is_fatal() {
        let reply = json!({"result": null, "error": "note was not found"});
        assert!(interpret_reply(Action::NotesInfo, reply).is_err());
    }

    #[test]
    fn test_error_kinds() {
        assert!(refused().is_retryable());
        let timeout = ConnectError::Timeout {
            action: Action::UpdateNote,
            elapsed_ms: 60_000,
        };
        assert!(timeout.is_retryable());
        let status = ConnectError::HttpStatus {
            action: Action::UpdateNote,
            status: 500,
            body: String::new(),
        };
        assert!(!status.is_retryable());
        let exhausted = ConnectError::RetryExhausted {
            action: Action::UpdateNote,
            attempts: 2,
            last_error: Box::new(timeout),
        };
        assert!(!exhausted.is_retryable());
        assert_eq!(exhausted.kind(), ErrorKind::Transient);
        assert!(exhausted.to_string().contains("2 attempt(s)"));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let transport = ScriptedTransport::new(vec![
            Err(refused()),
            Ok(json!({"result": 6, "error": null})),
        ]);
        let client = AnkiConnect::with_transport(transport, fast_config());

        let result = client.request(Action::FindCards, json!({})).await.unwrap();
        assert_eq!(result, json!(6));
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_transient_failure_surfaces() {
        let transport = ScriptedTransport::new(vec![Err(refused()), Err(refused())]);
        let client = AnkiConnect::with_transport(transport, fast_config());

        let err = client.request(Action::FindCards, json!({})).await.unwrap_err();
        assert!(matches!(err, ConnectError::RetryExhausted { attempts: 2, .. }));
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let transport = ScriptedTransport::new(vec![
            Err(ConnectError::HttpStatus {
                action: Action::FindCards,
                status: 500,
                body: "boom".into(),
            }),
            Ok(json!({"result": [], "error": null})),
        ]);
        let client = AnkiConnect::with_transport(transport, fast_config());

        let err = client.request(Action::FindCards, json!({})).await.unwrap_err();
        assert!(matches!(err, ConnectError::HttpStatus { status: 500, .. }));
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_remote_error_is_not_retried() {
        let transport = ScriptedTransport::new(vec![Ok(
            json!({"result": null, "error": "collection is not available"}),
        )]);
        let client = AnkiConnect::with_transport(transport, fast_config());

        let err = client.request(Action::UpdateNote, json!({})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteReported);
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 1);
    }
}
