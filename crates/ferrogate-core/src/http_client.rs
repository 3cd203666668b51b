use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::ConfigError;

/// HTTP request envelope used by gateway transport calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Base URL joined with the endpoint path, without query string.
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Full URL including the percent-encoded query string.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(name, value)| {
                format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.url)
    }
}

/// HTTP response envelope returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: Option<String>,
    pub body: String,
}

impl HttpResponse {
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            status_text: Some(String::from("OK")),
            body: body.into(),
        }
    }

    pub fn with_status(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: Some(status_text.into()),
            body: String::new(),
        }
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Turns a non-2xx response into a status-carrying [`HttpError`].
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(HttpError::status(self.status, self.status_text))
    }
}

/// Shape of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    /// The attempt exceeded its time budget before a response arrived.
    Timeout,
    /// No connection could be established.
    Connect,
    /// The exchange failed after connecting but before a status was received.
    Network,
    /// The upstream answered with a non-success status.
    Status,
    /// The request could not be built or sent as specified.
    Protocol,
}

/// Transport-level HTTP failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    kind: HttpErrorKind,
    message: String,
    status: Option<u16>,
    status_text: Option<String>,
}

impl HttpError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::without_response(HttpErrorKind::Timeout, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::without_response(HttpErrorKind::Connect, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::without_response(HttpErrorKind::Network, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::without_response(HttpErrorKind::Protocol, message)
    }

    pub fn status(status: u16, status_text: Option<String>) -> Self {
        let message = match &status_text {
            Some(text) if !text.is_empty() => format!("upstream returned status {status} {text}"),
            _ => format!("upstream returned status {status}"),
        };
        Self {
            kind: HttpErrorKind::Status,
            message,
            status: Some(status),
            status_text,
        }
    }

    fn without_response(kind: HttpErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            status_text: None,
        }
    }

    pub const fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status_code(&self) -> Option<u16> {
        self.status
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    /// Whether the upstream produced an HTTP response at all.
    pub const fn has_response(&self) -> bool {
        self.status.is_some()
    }
}

impl Display for HttpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpError {}

/// Transport contract used by the gateway for every upstream attempt.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// Production HTTP client using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("ferrogate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| ConfigError::HttpClient(error.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// Create a ReqwestHttpClient with a custom reqwest::Client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .get(&request.url)
                .query(&request.query)
                .timeout(request.timeout);

            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let response = builder.send().await.map_err(map_reqwest_error)?;

            let status = response.status();
            let status_text = status.canonical_reason().map(str::to_owned);
            let body = response.text().await.map_err(map_reqwest_error)?;

            Ok(HttpResponse {
                status: status.as_u16(),
                status_text,
                body,
            })
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> HttpError {
    if error.is_timeout() {
        HttpError::timeout(format!("request timeout: {}", error.without_url()))
    } else if error.is_connect() {
        HttpError::connect(format!("connection failed: {}", error.without_url()))
    } else if error.is_builder() {
        HttpError::protocol(format!("invalid request: {}", error.without_url()))
    } else {
        HttpError::network(format!("request failed: {}", error.without_url()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_url_encodes_query_parameters() {
        let request = HttpRequest::get("https://example.test/v3/quote/AAPL")
            .with_query("apikey", "a b&c")
            .with_query("from", "2024-01-01");

        assert_eq!(
            request.full_url(),
            "https://example.test/v3/quote/AAPL?apikey=a%20b%26c&from=2024-01-01"
        );
        assert_eq!(request.query_value("from"), Some("2024-01-01"));
    }

    #[test]
    fn non_success_response_becomes_status_error() {
        let error = HttpResponse::with_status(503, "Service Unavailable")
            .error_for_status()
            .expect_err("503 must fail");

        assert_eq!(error.kind(), HttpErrorKind::Status);
        assert_eq!(error.status_code(), Some(503));
        assert_eq!(error.status_text(), Some("Service Unavailable"));
        assert!(error.has_response());
    }

    #[test]
    fn network_failures_carry_no_response() {
        let error = HttpError::connect("connection refused");
        assert!(!error.has_response());
        assert_eq!(error.status_code(), None);
    }

    #[test]
    fn custom_header_names_are_lowercased() {
        let request = HttpRequest::get("https://example.test").with_header("X-Request-Id", "abc");
        assert_eq!(request.headers.get("x-request-id").map(String::as_str), Some("abc"));
    }
}
