//! HTTP transport for the WASH REST API

use super::Transport;
use crate::error::{CoreError, CoreResult};
use crate::resource::RecordId;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Maximum length of a server-supplied message shown to the operator
const MAX_MESSAGE_LENGTH: usize = 120;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub fn sanitize_for_log(body: &str) -> String {
    let char_count = body.chars().count();
    let truncated = if char_count > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// REST client for the WASH API
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    token: Option<String>,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a client for `base_url` (http or https)
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .user_agent(format!("washpro/{}", crate::VERSION))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn collection_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn record_url(&self, path: &str, id: &RecordId) -> String {
        format!(
            "{}/{}",
            self.collection_url(path),
            urlencoding::encode(id.as_str())
        )
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> CoreResult<Value> {
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            // Only sanitized/truncated bodies reach the log
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&text));
            return Err(status_error(status, server_message(&text)));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Malformed JSON from {}: {}", url, sanitize_for_log(&text));
            CoreError::Decode(format!("Invalid JSON response: {}", e))
        })
    }

    fn map_send_error(&self, error: reqwest::Error) -> CoreError {
        if error.is_timeout() {
            return CoreError::Timeout(self.timeout);
        }
        tracing::error!("Request failed: {}", error);
        if error.is_connect() {
            return CoreError::Network(
                "Unable to reach the API. Check your network connection.".to_string(),
            );
        }
        CoreError::Network("Request failed. Check your network connection and try again.".to_string())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid API URL: {}", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("API URL must use http or https: {}", raw);
    }
    Ok(url)
}

/// `message` field of a JSON error body, sanitized and truncated
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let message = value
        .get("message")
        .or_else(|| value.get("error").and_then(|e| e.get("message")))?
        .as_str()?;

    let sanitized: String = message
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(MAX_MESSAGE_LENGTH)
        .collect();
    let sanitized = sanitized.trim().to_string();
    (!sanitized.is_empty()).then_some(sanitized)
}

/// Map a non-2xx status to an operator-facing error
fn status_error(status: StatusCode, message: Option<String>) -> CoreError {
    match status.as_u16() {
        409 => CoreError::Conflict(message.unwrap_or_else(|| {
            "The record was changed or removed elsewhere. Refresh and try again.".to_string()
        })),
        400 | 422 => CoreError::Network(
            message.unwrap_or_else(|| "Invalid request. Check your input.".to_string()),
        ),
        401 => CoreError::Network("Authentication failed. Check your API token.".to_string()),
        403 => CoreError::Network("Permission denied.".to_string()),
        404 => CoreError::Network("Resource not found.".to_string()),
        429 => CoreError::Network("Rate limit exceeded. Please try again later.".to_string()),
        500..=599 => {
            CoreError::Network("Service temporarily unavailable. Please try again.".to_string())
        }
        code => CoreError::Network(format!("Request failed with status {}.", code)),
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn list(&self, path: &str) -> CoreResult<Value> {
        self.send(Method::GET, &self.collection_url(path), None).await
    }

    async fn get(&self, path: &str, id: &RecordId) -> CoreResult<Value> {
        self.send(Method::GET, &self.record_url(path, id), None).await
    }

    async fn post(&self, path: &str, body: &Value) -> CoreResult<Value> {
        self.send(Method::POST, &self.collection_url(path), Some(body))
            .await
    }

    async fn put(&self, path: &str, id: &RecordId, body: &Value) -> CoreResult<Value> {
        self.send(Method::PUT, &self.record_url(path, id), Some(body))
            .await
    }

    async fn delete(&self, path: &str, id: &RecordId) -> CoreResult<Value> {
        self.send(Method::DELETE, &self.record_url(path, id), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_join_and_encode() {
        let http = HttpTransport::new(
            "https://api.example.org/api/v1/",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            http.collection_url("/gutters"),
            "https://api.example.org/api/v1/gutters"
        );
        assert_eq!(
            http.record_url("/soak-away", &RecordId::from("a b/c")),
            "https://api.example.org/api/v1/soak-away/a%20b%2Fc"
        );
    }

    #[test]
    fn test_base_url_validation() {
        assert!(HttpTransport::new("not a url", None, Duration::from_secs(5)).is_err());
        assert!(HttpTransport::new("ftp://example.org", None, Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_blank_token_is_dropped() {
        let http = HttpTransport::new(
            "http://localhost:8080",
            Some("  ".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(http.token.is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_error(StatusCode::CONFLICT, Some("Gutter was modified".into())),
            CoreError::Conflict("Gutter was modified".into())
        );
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, None),
            CoreError::Network(msg) if msg.contains("Authentication")
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, None),
            CoreError::Network(msg) if msg.contains("temporarily unavailable")
        ));
        assert_eq!(
            status_error(StatusCode::BAD_REQUEST, Some("Ward is required".into())),
            CoreError::Network("Ward is required".into())
        );
    }

    #[test]
    fn test_server_message_extraction() {
        assert_eq!(
            server_message(r#"{"message":"Not allowed\n"}"#).as_deref(),
            Some("Not allowed")
        );
        assert_eq!(
            server_message(r#"{"error":{"message":"Bad id"}}"#).as_deref(),
            Some("Bad id")
        );
        assert_eq!(server_message("<html>"), None);
    }

    #[test]
    fn test_sanitize_for_log_truncates() {
        let long = "x".repeat(500);
        let out = sanitize_for_log(&long);
        assert!(out.contains("[truncated, 500 bytes total]"));
        assert_eq!(sanitize_for_log("a\tb c"), "ab c");
    }
}
