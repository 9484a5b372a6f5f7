//! Operation descriptors and typed inputs.
//!
//! An [`OperationDescriptor`] is the static shape of one API call: method,
//! path template, and option flags. An [`OperationInput`] is the typed input
//! value; instead of runtime reflection it yields its members as
//! `(location, name, value)` triples, the way generated emitter code would.

mod document;

pub use document::Document;

use crate::error::AwsError;
use crate::request::AwsPayload;

/// Where an input member lands on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLocation {
    /// A single header; `name` is the header name.
    Header,
    /// A map emitted as one header per entry, `name` is the prefix.
    HeaderPrefix,
    /// A query-string parameter.
    Query,
    /// A `{name}` path placeholder; `/` and `+` are percent-encoded.
    Uri,
    /// A `{name+}` path placeholder; `/` passes through.
    UriGreedy,
    /// A host-prefix template substitution.
    Hostname,
    /// A structured-body member.
    Body,
}

/// One rendered input member bound to its wire location.
#[derive(Debug, Clone)]
pub struct BoundMember {
    /// Wire location.
    pub location: FieldLocation,
    /// Member name at that location (header name, query key, placeholder
    /// name, or body member name).
    pub name: String,
    /// Rendered value.
    pub value: MemberValue,
}

impl BoundMember {
    /// Convenience constructor.
    pub fn new(location: FieldLocation, name: impl Into<String>, value: MemberValue) -> Self {
        Self {
            location,
            name: name.into(),
            value,
        }
    }
}

/// A rendered member value.
#[derive(Debug, Clone)]
pub enum MemberValue {
    /// A single stringified value.
    Scalar(String),
    /// Multiple values (query members emit one pair per element).
    List(Vec<String>),
    /// Key/value pairs (header-prefix and query maps).
    Map(Vec<(String, String)>),
    /// A structured body fragment.
    Document(Document),
}

/// The operation's payload member, when it has one.
#[derive(Debug, Clone)]
pub enum PayloadMember {
    /// A raw payload: bytes or a stream, sent as the body verbatim.
    Raw(AwsPayload),
    /// An encodable shape; `root` overrides the XML root element name.
    Shape {
        /// Custom root element name for REST-XML bodies.
        root: Option<String>,
        /// The shape to encode.
        document: Document,
    },
}

/// Option flags on an operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationFlags {
    /// The operation accepts a streaming payload.
    pub allow_streaming: bool,
    /// The operation accepts a chunked (signed) streaming payload.
    pub allow_chunked_streaming: bool,
    /// The operation requires a body checksum (MD5).
    pub checksum_required: bool,
    /// The operation honors `x-amz-sdk-checksum-algorithm`.
    pub checksum_header: bool,
    /// The operation advertises an optional `content-md5` header.
    pub md5_checksum_header: bool,
}

/// Static description of one API operation.
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    /// Operation name (e.g. "PutItem").
    pub name: &'static str,
    /// HTTP method.
    pub method: &'static str,
    /// Path template, possibly containing `{name}` / `{name+}` placeholders.
    pub path: &'static str,
    /// Host prefix template, e.g. `"{AccountId}."`.
    pub host_prefix: Option<&'static str>,
    /// Name of the payload member, when the input declares one.
    pub payload_member: Option<&'static str>,
    /// Option flags.
    pub flags: OperationFlags,
}

impl OperationDescriptor {
    /// Describe an operation.
    pub fn new(name: &'static str, method: &'static str, path: &'static str) -> Self {
        Self {
            name,
            method,
            path,
            host_prefix: None,
            payload_member: None,
            flags: OperationFlags::default(),
        }
    }

    /// Set the host prefix template.
    pub fn with_host_prefix(mut self, prefix: &'static str) -> Self {
        self.host_prefix = Some(prefix);
        self
    }

    /// Name the payload member.
    pub fn with_payload_member(mut self, member: &'static str) -> Self {
        self.payload_member = Some(member);
        self
    }

    /// Set the option flags.
    pub fn with_flags(mut self, flags: OperationFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// A typed operation input.
///
/// Implementations are what generated per-operation emitters would produce:
/// a validation pass and a flat list of rendered members. Exactly one source
/// member feeds each declared location.
pub trait OperationInput: Send + Sync {
    /// Validate declared constraints (ranges, lengths, patterns). The
    /// default accepts everything.
    fn validate(&self) -> Result<(), AwsError> {
        Ok(())
    }

    /// The input members, in declaration order.
    fn members(&self) -> Vec<BoundMember>;

    /// The payload member, when the operation declares one.
    fn payload(&self) -> Option<PayloadMember> {
        None
    }
}

/// An input with no members.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyInput;

impl OperationInput for EmptyInput {
    fn members(&self) -> Vec<BoundMember> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let op = OperationDescriptor::new("GetObject", "GET", "/{Bucket}/{Key+}")
            .with_payload_member("Body")
            .with_flags(OperationFlags {
                allow_streaming: true,
                allow_chunked_streaming: true,
                ..Default::default()
            });

        assert_eq!(op.name, "GetObject");
        assert_eq!(op.payload_member, Some("Body"));
        assert!(op.flags.allow_chunked_streaming);
        assert!(!op.flags.checksum_required);
    }

    #[test]
    fn test_empty_input() {
        assert!(EmptyInput.members().is_empty());
        assert!(EmptyInput.payload().is_none());
        assert!(EmptyInput.validate().is_ok());
    }
}
