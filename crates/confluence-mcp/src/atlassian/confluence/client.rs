//! Confluence REST gateway
//!
//! [`ConfluenceClient`] owns authentication, request dispatch and outcome classification.
//! Domain operations live in `read.rs` and `write.rs` and are built on [`ConfluenceClient::request`].
//!
//! No call is retried and nothing sleeps here: rate limits and failures are surfaced to the
//! caller as typed [`Error`]s.

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};

use crate::atlassian::{create_authenticated_client, ConfluenceConfig};
use crate::error::Error;
use confluence_mcp_core::confluence::payload::{dry_run, WriteAction};

/// REST namespace every endpoint is relative to
pub const API_PATH: &str = "/wiki/rest/api";

/// Retry-After value assumed when a 429 response omits it
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

pub type GatewayResult<T> = std::result::Result<T, Error>;

/// Outcome of a write: either the preview of what would be sent, or the applied result
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WriteOutcome<T> {
    Preview(Value),
    Applied(T),
}

#[cfg(test)]
impl<T> WriteOutcome<T> {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, WriteOutcome::Preview(_))
    }

    pub fn preview(&self) -> Option<&Value> {
        match self {
            WriteOutcome::Preview(value) => Some(value),
            WriteOutcome::Applied(_) => None,
        }
    }

    pub fn applied(self) -> Option<T> {
        match self {
            WriteOutcome::Applied(value) => Some(value),
            WriteOutcome::Preview(_) => None,
        }
    }
}

impl WriteOutcome<Value> {
    /// Convert an applied response, leaving previews untouched
    pub(crate) fn and_then_applied<T>(
        self,
        convert: impl FnOnce(Value) -> GatewayResult<T>,
    ) -> GatewayResult<WriteOutcome<T>> {
        match self {
            WriteOutcome::Preview(preview) => Ok(WriteOutcome::Preview(preview)),
            WriteOutcome::Applied(value) => convert(value).map(WriteOutcome::Applied),
        }
    }
}

/// Long-lived gateway; the credential context is fixed at construction
#[derive(Debug, Clone)]
pub struct ConfluenceClient {
    http: reqwest::Client,
    base_url: String,
}

impl ConfluenceClient {
    pub fn new(config: &ConfluenceConfig) -> GatewayResult<Self> {
        Ok(Self {
            http: create_authenticated_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}{API_PATH}{endpoint}", self.base_url)
    }

    /// Issue one request and classify the outcome
    ///
    /// Successful bodies are parsed as JSON; anything else is wrapped as `{"raw": text}`.
    /// Empty bodies (e.g. `204 No Content`) come back as `null`.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> GatewayResult<Value> {
        let url = self.endpoint_url(endpoint);
        log::debug!("{method} {url} query={query:?}");

        let mut builder = self.http.request(method.clone(), &url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            log::warn!("{method} {url} rate limited, retry after {retry_after}s");
            return Err(Error::RateLimited { retry_after });
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read response body: {e}")))?;
        let parsed = parse_body(&text);

        if !status.is_success() {
            let message = parsed
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| status_text(status));
            log::warn!("{method} {url} failed [{}]: {message}", status.as_u16());
            return Err(Error::RemoteApi {
                status: status.as_u16(),
                message,
            });
        }

        log::debug!("{method} {url} -> {}", status.as_u16());
        Ok(parsed)
    }

    pub async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> GatewayResult<Value> {
        self.request(Method::GET, endpoint, query, None).await
    }

    /// Send a write, or return its dry-run preview without touching the network
    pub(crate) async fn write(
        &self,
        action: WriteAction,
        method: Method,
        endpoint: &str,
        payload: Value,
        dry_run_requested: bool,
    ) -> GatewayResult<WriteOutcome<Value>> {
        if dry_run_requested {
            log::info!("dry run: {action} {endpoint}");
            return Ok(WriteOutcome::Preview(dry_run(action, payload)));
        }

        log::info!("{action}: {method} {endpoint}");
        self.request(method, endpoint, &[], Some(&payload))
            .await
            .map(WriteOutcome::Applied)
    }

    fn classify_transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_connect() {
            log::error!("cannot reach {}: {err}", self.base_url);
            Error::HostUnreachable(self.base_url.clone())
        } else if err.is_timeout() {
            Error::Transport(format!("Request to Confluence timed out: {err}"))
        } else {
            Error::Transport(format!("Failed to send request to Confluence: {err}"))
        }
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "raw": text }))
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

/// Deserialize a gateway value into a raw response model
pub(crate) fn decode<T: serde::de::DeserializeOwned>(value: Value) -> GatewayResult<T> {
    serde_json::from_value(value).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlassian::confluence::testing::{MockServer, Stub};

    #[test]
    fn test_parse_body_wraps_non_json() {
        assert_eq!(parse_body("<html>oops</html>"), json!({ "raw": "<html>oops</html>" }));
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body(r#"{"a":1}"#), json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn test_request_sends_auth_and_json_headers() {
        let server = MockServer::start(vec![Stub::get("/wiki/rest/api/space", json!({}))]).await;
        let client = server.client();

        client.get("/space", &[]).await.unwrap();

        let recorded = server.requests();
        assert_eq!(recorded.len(), 1);
        // base64("ada@example.com:secret")
        assert_eq!(
            recorded[0].authorization.as_deref(),
            Some("Basic YWRhQGV4YW1wbGUuY29tOnNlY3JldA==")
        );
        assert_eq!(recorded[0].accept.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_rate_limit_uses_retry_after_header() {
        let server = MockServer::start(vec![Stub::get("/wiki/rest/api/space", json!({}))
            .status(429)
            .header("retry-after", "30")])
        .await;

        let err = server.client().get("/space", &[]).await.unwrap_err();

        assert!(matches!(err, Error::RateLimited { retry_after: 30 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limit_defaults_to_five_seconds() {
        let server =
            MockServer::start(vec![Stub::get("/wiki/rest/api/space", json!({})).status(429)]).await;

        let err = server.client().get("/space", &[]).await.unwrap_err();

        assert!(matches!(err, Error::RateLimited { retry_after: 5 }));
    }

    #[tokio::test]
    async fn test_remote_error_message_from_body() {
        let server = MockServer::start(vec![Stub::get(
            "/wiki/rest/api/content/1",
            json!({ "statusCode": 403, "message": "Not permitted" }),
        )
        .status(403)])
        .await;

        let err = server.client().get("/content/1", &[]).await.unwrap_err();

        match err {
            Error::RemoteApi { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Not permitted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remote_error_falls_back_to_status_text() {
        let server = MockServer::start(vec![Stub::raw(
            Method::GET,
            "/wiki/rest/api/content/1",
            "<html>upstream down</html>",
        )
        .status(502)])
        .await;

        let err = server.client().get("/content/1", &[]).await.unwrap_err();

        assert!(matches!(
            err,
            Error::RemoteApi { status: 502, ref message } if message == "Bad Gateway"
        ));
    }

    #[tokio::test]
    async fn test_non_json_success_is_wrapped() {
        let server = MockServer::start(vec![Stub::raw(
            Method::GET,
            "/wiki/rest/api/content/1",
            "plain text",
        )])
        .await;

        let value = server.client().get("/content/1", &[]).await.unwrap();

        assert_eq!(value, json!({ "raw": "plain text" }));
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        let client = MockServer::unreachable_client();

        let err = client.get("/space", &[]).await.unwrap_err();

        assert!(matches!(err, Error::HostUnreachable(ref url) if url == "http://127.0.0.1:1"));
    }

    #[tokio::test]
    async fn test_write_dry_run_skips_network() {
        let server = MockServer::start(vec![]).await;

        let outcome = server
            .client()
            .write(
                WriteAction::CreatePage,
                Method::POST,
                "/content",
                json!({ "title": "T" }),
                true,
            )
            .await
            .unwrap();

        assert!(outcome.is_dry_run());
        assert_eq!(outcome.preview().unwrap()["dryRun"], true);
        assert!(server.requests().is_empty());
    }
}
