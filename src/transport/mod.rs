//! HTTP transport layer.
//!
//! The executor dispatches through the [`HttpTransport`] trait; the default
//! implementation rides on reqwest. Implementations must support concurrent
//! calls.

use crate::error::{AwsError, TransportError};
use crate::stream::BodyStream;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

/// A wire-ready HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: String,
    /// Absolute request URL.
    pub url: String,
    /// Request headers, lowercase names.
    pub headers: HashMap<String, String>,
    /// Buffered request body, if any.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a new HTTP request.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    /// Add multiple headers.
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.to_lowercase(), value);
        }
        self
    }
}

/// An HTTP response with a buffered body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lowercase names.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// The AWS request ID, from either of its two header spellings.
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-amzn-requestid")
            .or_else(|| self.header("x-amz-request-id"))
    }

    /// The `Retry-After` hint, in seconds.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

/// HTTP transport trait.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request with a buffered (or empty) body.
    async fn send(&self, request: HttpRequest, timeout: Duration)
        -> Result<HttpResponse, AwsError>;

    /// Send a request whose body arrives as a byte stream.
    async fn send_streaming(
        &self,
        request: HttpRequest,
        body: BodyStream,
        timeout: Duration,
    ) -> Result<HttpResponse, AwsError>;
}

/// Default transport backed by reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with default settings.
    pub fn new() -> Result<Self, AwsError> {
        Self::builder().build()
    }

    /// Create a transport builder.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    async fn dispatch(
        &self,
        request: HttpRequest,
        body: Option<reqwest::Body>,
        timeout: Duration,
    ) -> Result<HttpResponse, AwsError> {
        let method = request.method.parse::<reqwest::Method>().map_err(|e| {
            AwsError::Transport(TransportError::ConnectionFailed {
                message: format!("invalid HTTP method: {}", e),
            })
        })?;

        let mut builder = self.client.request(method, &request.url).timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        } else if let Some(bytes) = request.body {
            builder = builder.body(bytes);
        }

        let response = builder.send().await.map_err(|e| map_reqwest_error(e, timeout))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_lowercase(),
                    v.to_str().unwrap_or("").to_string(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(e, timeout))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(error: reqwest::Error, timeout: Duration) -> AwsError {
    if error.is_timeout() {
        AwsError::Transport(TransportError::Timeout { duration: timeout })
    } else if error.is_connect() {
        AwsError::Transport(TransportError::ConnectionFailed {
            message: error.to_string(),
        })
    } else if error.is_body() {
        AwsError::Transport(TransportError::BodyStream {
            message: error.to_string(),
        })
    } else {
        AwsError::Transport(TransportError::ConnectionFailed {
            message: error.to_string(),
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, AwsError> {
        self.dispatch(request, None, timeout).await
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
        body: BodyStream,
        timeout: Duration,
    ) -> Result<HttpResponse, AwsError> {
        let body = reqwest::Body::wrap_stream(body);
        self.dispatch(request, Some(body), timeout).await
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

/// Builder for the reqwest transport.
pub struct ReqwestTransportBuilder {
    connect_timeout: Duration,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
}

impl ReqwestTransportBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 100,
            pool_idle_timeout: Some(Duration::from_secs(90)),
        }
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the maximum idle connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Set the idle connection timeout.
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport, AwsError> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .build()
            .map_err(|e| {
                AwsError::Transport(TransportError::Tls {
                    message: e.to_string(),
                })
            })?;

        Ok(ReqwestTransport { client })
    }
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::new("GET", "https://example.com")
            .with_header("Content-Type", "application/json")
            .with_body(&b"test body"[..]);

        assert_eq!(request.method, "GET");
        assert_eq!(
            request.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert!(request.body.is_some());
    }

    #[test]
    fn test_http_response_helpers() {
        let mut headers = HashMap::new();
        headers.insert("x-amz-request-id".to_string(), "ABC123".to_string());
        headers.insert("retry-after".to_string(), "3".to_string());

        let response = HttpResponse {
            status: 503,
            headers,
            body: Bytes::new(),
        };

        assert!(!response.is_success());
        assert_eq!(response.request_id(), Some("ABC123"));
        assert_eq!(response.retry_after(), Some(Duration::from_secs(3)));
        assert_eq!(response.header("X-AMZ-REQUEST-ID"), Some("ABC123"));
    }

    #[test]
    fn test_transport_builder() {
        let transport = ReqwestTransport::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(50)
            .build();

        assert!(transport.is_ok());
    }
}
