//! The logical request produced by the builder and consumed by the signer
//! and transport.

mod body;
mod builder;

pub use body::{encode_json_body, encode_query_body, encode_xml_body};
pub use builder::build_request;

use crate::config::Protocol;
use crate::stream::PayloadStream;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// A raw payload member.
#[derive(Debug, Clone, Default)]
pub enum AwsPayload {
    /// No payload.
    #[default]
    Empty,
    /// Buffered bytes.
    Bytes(Bytes),
    /// A single-owner chunk stream.
    Stream(Arc<PayloadStream>),
}

impl AwsPayload {
    /// Wrap buffered bytes.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        AwsPayload::Bytes(data.into())
    }

    /// Wrap a stream.
    pub fn stream(stream: PayloadStream) -> Self {
        AwsPayload::Stream(Arc::new(stream))
    }
}

/// A request body.
#[derive(Debug, Clone, Default)]
pub enum AwsBody {
    /// No body.
    #[default]
    Empty,
    /// Form-urlencoded or other textual body.
    Text(String),
    /// Encoded JSON bytes.
    Json(Bytes),
    /// Encoded XML bytes.
    Xml(Bytes),
    /// A raw payload member.
    Raw(AwsPayload),
}

impl AwsBody {
    /// The realized body bytes, or `None` for streams.
    pub fn as_bytes(&self) -> Option<Bytes> {
        match self {
            AwsBody::Empty => Some(Bytes::new()),
            AwsBody::Text(s) => Some(Bytes::copy_from_slice(s.as_bytes())),
            AwsBody::Json(b) | AwsBody::Xml(b) => Some(b.clone()),
            AwsBody::Raw(AwsPayload::Empty) => Some(Bytes::new()),
            AwsBody::Raw(AwsPayload::Bytes(b)) => Some(b.clone()),
            AwsBody::Raw(AwsPayload::Stream(_)) => None,
        }
    }

    /// True when no bytes will be sent.
    pub fn is_empty(&self) -> bool {
        match self.as_bytes() {
            Some(bytes) => bytes.is_empty(),
            None => false,
        }
    }

    /// True for streaming bodies, which cannot be replayed on retry.
    pub fn is_streaming(&self) -> bool {
        matches!(self, AwsBody::Raw(AwsPayload::Stream(_)))
    }

    /// The stream payload, when this body carries one.
    pub fn as_stream(&self) -> Option<&Arc<PayloadStream>> {
        match self {
            AwsBody::Raw(AwsPayload::Stream(stream)) => Some(stream),
            _ => None,
        }
    }
}

/// The logical request: everything the middleware chain, signer, and
/// transport need. Created per call and discarded after execution.
#[derive(Debug, Clone)]
pub struct AwsRequest {
    /// HTTP method.
    pub method: String,
    /// Full request URL with percent-encoded path and query.
    pub url: Url,
    /// Operation name, for diagnostics.
    pub operation: String,
    /// Headers with lowercase names.
    pub headers: HashMap<String, String>,
    /// The body.
    pub body: AwsBody,
    /// Wire protocol of the owning service.
    pub protocol: Protocol,
    /// Region the request is bound for.
    pub region: String,
}

impl AwsRequest {
    /// Create a bare request. The builder is the usual entry point.
    pub fn new(
        method: impl Into<String>,
        url: Url,
        operation: impl Into<String>,
        body: AwsBody,
    ) -> Self {
        Self {
            method: method.into(),
            url,
            operation: operation.into(),
            headers: HashMap::new(),
            body,
            protocol: Protocol::RestJson,
            region: String::new(),
        }
    }

    /// Insert a header, lowercasing the name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_lowercase(), value.into());
    }

    /// Look up a header by (lowercase) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_bytes() {
        assert_eq!(AwsBody::Empty.as_bytes().unwrap(), Bytes::new());
        assert!(AwsBody::Empty.is_empty());

        let body = AwsBody::Text("a=1".into());
        assert_eq!(body.as_bytes().unwrap(), Bytes::from_static(b"a=1"));
        assert!(!body.is_empty());

        let raw = AwsBody::Raw(AwsPayload::from_bytes(&b"data"[..]));
        assert_eq!(raw.as_bytes().unwrap(), Bytes::from_static(b"data"));
        assert!(!raw.is_streaming());
    }

    #[test]
    fn test_header_case() {
        let mut request = AwsRequest::new(
            "GET",
            Url::parse("https://example.amazonaws.com/").unwrap(),
            "Op",
            AwsBody::Empty,
        );
        request.set_header("X-Amz-Target", "Svc.Op");
        assert_eq!(request.header("x-amz-target"), Some("Svc.Op"));
        assert_eq!(request.header("X-AMZ-TARGET"), Some("Svc.Op"));
    }
}
