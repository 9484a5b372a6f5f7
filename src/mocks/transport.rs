//! Mock HTTP transport.

use crate::error::{AwsError, TransportError};
use crate::stream::BodyStream;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// A 200 response with an empty body.
    pub fn ok() -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// A 200 response with a body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// An error response.
    pub fn error(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }
}

/// One request the mock observed.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Full URL.
    pub url: String,
    /// Headers, lowercase names.
    pub headers: HashMap<String, String>,
    /// Buffered body, or the fully collected stream bytes.
    pub body: Bytes,
    /// True when the body arrived as a stream.
    pub streamed: bool,
}

impl RecordedRequest {
    /// Look up a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// Mock transport with a response queue and request recorder.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    default_response: Mutex<Option<MockResponse>>,
}

impl MockTransport {
    /// A mock with no queued responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock pre-loaded with responses, returned in order.
    pub fn with_responses(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
            default_response: Mutex::new(None),
        }
    }

    /// Serve this response whenever the queue is empty.
    pub fn with_default_response(self, response: MockResponse) -> Self {
        *self.default_response.lock() = Some(response);
        self
    }

    /// Queue another response.
    pub fn push_response(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    /// The requests observed so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests observed.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_response(&self) -> Result<MockResponse, AwsError> {
        if let Some(response) = self.responses.lock().pop_front() {
            return Ok(response);
        }
        if let Some(response) = self.default_response.lock().clone() {
            return Ok(response);
        }
        Err(AwsError::Transport(TransportError::ConnectionFailed {
            message: "mock transport has no response queued".into(),
        }))
    }

    fn record(&self, request: HttpRequest, body: Bytes, streamed: bool) {
        self.requests.lock().push(RecordedRequest {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body,
            streamed,
        });
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        request: HttpRequest,
        _timeout: std::time::Duration,
    ) -> Result<HttpResponse, AwsError> {
        let body = request.body.clone().unwrap_or_default();
        self.record(request, body, false);

        let response = self.next_response()?;
        Ok(HttpResponse {
            status: response.status,
            headers: response.headers,
            body: response.body,
        })
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
        mut body: BodyStream,
        _timeout: std::time::Duration,
    ) -> Result<HttpResponse, AwsError> {
        let mut collected = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| {
                AwsError::Transport(TransportError::BodyStream {
                    message: e.to_string(),
                })
            })?;
            collected.extend_from_slice(&chunk);
        }
        self.record(request, Bytes::from(collected), true);

        let response = self.next_response()?;
        Ok(HttpResponse {
            status: response.status,
            headers: response.headers,
            body: response.body,
        })
    }
}
