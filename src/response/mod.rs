//! Response validation and decoding.
//!
//! A transport response either becomes a [`DecodedResponse`] handed to the
//! operation's typed output, or (for any status of 300 and above) a typed
//! [`crate::error::HttpError`] parsed from the protocol error envelope.

mod envelope;
mod xml;

pub use envelope::parse_error_envelope;
pub use xml::parse_xml;

use crate::config::Protocol;
use crate::error::{AwsError, DecodeError};
use crate::operation::Document;
use crate::transport::HttpResponse;
use bytes::Bytes;
use std::collections::HashMap;

/// A validated 2xx response, ready for typed decoding.
#[derive(Debug, Clone)]
pub struct DecodedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, lowercase names.
    pub headers: HashMap<String, String>,
    /// Raw body bytes. Streamable outputs take these unread.
    pub body: Bytes,
    /// Wire protocol, for body parsing.
    pub protocol: Protocol,
    /// AWS request ID extracted from the headers.
    pub request_id: Option<String>,
}

impl DecodedResponse {
    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Collect headers sharing a prefix, with the prefix stripped.
    pub fn prefixed_headers(&self, prefix: &str) -> Vec<(String, String)> {
        let prefix = prefix.to_lowercase();
        self.headers
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(name, value)| (name[prefix.len()..].to_string(), value.clone()))
            .collect()
    }

    /// Parse the body into a [`Document`] under the service protocol.
    ///
    /// JSON protocols parse the object; XML protocols parse and drop the
    /// root element. An empty body parses as an empty map.
    pub fn document(&self) -> Result<Document, AwsError> {
        if self.body.is_empty() {
            return Ok(Document::map());
        }
        match self.protocol {
            Protocol::Json(_) | Protocol::RestJson => {
                let value: serde_json::Value =
                    serde_json::from_slice(&self.body).map_err(|e| {
                        AwsError::Decode(DecodeError::MalformedBody {
                            format: "json",
                            message: e.to_string(),
                        })
                    })?;
                Ok(Document::from(value))
            }
            Protocol::RestXml | Protocol::Query | Protocol::Ec2Query => {
                let (_, content) = parse_xml(&self.body)?;
                Ok(content)
            }
        }
    }
}

/// A typed operation output.
///
/// Implementations bind response headers onto `header`/`header_prefix`
/// members and decode the body per protocol, the way generated code would.
pub trait OperationOutput: Sized + Send {
    /// Decode the validated response.
    fn decode(response: DecodedResponse) -> Result<Self, AwsError>;
}

/// An output that discards the response.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyOutput;

impl OperationOutput for EmptyOutput {
    fn decode(_: DecodedResponse) -> Result<Self, AwsError> {
        Ok(EmptyOutput)
    }
}

/// Validate a transport response: 2xx passes through, anything at 300 or
/// above becomes the typed error parsed from the protocol envelope.
pub fn validate_response(
    response: HttpResponse,
    protocol: Protocol,
) -> Result<DecodedResponse, AwsError> {
    if response.status >= 300 {
        return Err(AwsError::Http(parse_error_envelope(&response, protocol)));
    }

    let request_id = response.request_id().map(String::from);
    Ok(DecodedResponse {
        status: response.status,
        headers: response.headers,
        body: response.body,
        protocol,
        request_id,
    })
}
