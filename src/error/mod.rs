//! Error types for the request core.
//!
//! Every failure surfaces as a single [`AwsError`] value, nested by concern.
//! The executor closes the error surface: whatever a transport, signer, or
//! decoder produces internally, callers only ever observe `AwsError`.

mod class;

pub use class::ErrorClass;

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the request core.
#[derive(Debug, Error)]
pub enum AwsError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Credential-related errors.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// Signature V4 signing errors.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Request construction and validation errors.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Network and transport errors.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A non-2xx response from the service, decoded into a typed envelope.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// Response decoding errors.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The call was cancelled through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,

    /// The client was already shut down when the call started.
    #[error("Client already shut down")]
    AlreadyShutdown,

    /// The paginator reached its page-count safety bound.
    #[error("Pagination limit reached after {pages} pages")]
    PaginationLimit {
        /// Number of pages fetched before the bound was hit.
        pages: u32,
    },
}

impl AwsError {
    /// Returns true if the executor may retry the failed attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            AwsError::Transport(e) => e.is_retryable(),
            AwsError::Http(e) => matches!(e.class(), ErrorClass::Throttle | ErrorClass::Transient),
            _ => false,
        }
    }

    /// Returns the server-provided retry delay hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AwsError::Http(e) => e.retry_after,
            _ => None,
        }
    }

    /// Returns the coarse failure classification for this error.
    pub fn error_class(&self) -> ErrorClass {
        match self {
            AwsError::Transport(e) if e.is_retryable() => ErrorClass::Transient,
            AwsError::Http(e) => e.class(),
            _ => ErrorClass::Fatal,
        }
    }

    /// Returns the AWS request ID if one was extracted from the response.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            AwsError::Http(e) => e.request_id.as_deref(),
            _ => None,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Missing required region configuration.
    #[error("Missing region: region must be specified via config or environment")]
    MissingRegion,

    /// Invalid endpoint URL.
    #[error("Invalid endpoint URL '{url}': {details}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Details about the validation error.
        details: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },
}

/// Credential-related errors.
///
/// The executor never retries these; a provider that wants retry behavior
/// owns it internally.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found in any source.
    #[error("Credentials not found: no credentials could be loaded from any source")]
    NotFound,

    /// Credentials have expired.
    #[error("Credentials expired: session credentials expired at {expiration}")]
    Expired {
        /// When the credentials expired.
        expiration: String,
    },

    /// The provider failed to produce credentials.
    #[error("Credential provider failed: {message}")]
    ProviderFailed {
        /// Details about the provider failure.
        message: String,
    },
}

/// Signature V4 signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// Signature calculation failed.
    #[error("Signature calculation failed: {message}")]
    CalculationFailed {
        /// Details about the calculation error.
        message: String,
    },

    /// Presign expiration exceeds the scope validity window.
    #[error("Presign expiration {requested}s exceeds maximum of {max}s")]
    ExpirationTooLong {
        /// Requested expiration in seconds.
        requested: u64,
        /// Maximum allowed expiration in seconds.
        max: u64,
    },
}

/// Request construction and validation errors. Fail fast, never retried.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Input validation failed for a specific field.
    #[error("Validation failed for '{field_path}': {reason}")]
    Validation {
        /// Dotted path of the offending input member.
        field_path: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The composed endpoint + path did not parse, or has no host.
    #[error("Invalid URL '{url}': {details}")]
    InvalidUrl {
        /// The unparseable URL.
        url: String,
        /// Details from the parser.
        details: String,
    },

    /// A value of an unexpected shape appeared at an encoding location.
    #[error("Unencodable value for member '{member}': {details}")]
    Unencodable {
        /// The member name.
        member: String,
        /// What went wrong.
        details: String,
    },

    /// A streaming body without a known size where one is required.
    #[error("Missing content length: stream size is required for this operation")]
    MissingContentLength,
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
    },

    /// The dispatch timed out.
    #[error("Request timed out after {duration:?}")]
    Timeout {
        /// The timeout that elapsed.
        duration: Duration,
    },

    /// Connection reset by peer.
    #[error("Connection reset by peer")]
    ConnectionReset,

    /// Request body stream failed mid-transfer.
    #[error("Body stream failed: {message}")]
    BodyStream {
        /// Error message from the stream.
        message: String,
    },

    /// TLS or client construction error.
    #[error("TLS error: {message}")]
    Tls {
        /// Error message.
        message: String,
    },
}

impl TransportError {
    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed { .. }
                | TransportError::Timeout { .. }
                | TransportError::ConnectionReset
        )
    }
}

/// A non-2xx service response decoded from the protocol error envelope.
#[derive(Debug, Error)]
#[error("{code} (status {status}): {message}")]
pub struct HttpError {
    /// HTTP status code.
    pub status: u16,
    /// Service error code (e.g. "NoSuchKey", "Throttling").
    pub code: String,
    /// Human-readable message from the envelope.
    pub message: String,
    /// AWS request ID from headers or body.
    pub request_id: Option<String>,
    /// Server retry hint from the `Retry-After` header.
    pub retry_after: Option<Duration>,
}

impl HttpError {
    /// Classify this error for the retry loop.
    pub fn class(&self) -> ErrorClass {
        class::classify(self.status, &self.code)
    }
}

/// Response decoding errors. Surfaced, never retried.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body could not be parsed under the service protocol.
    #[error("Malformed {format} body: {message}")]
    MalformedBody {
        /// "json" or "xml".
        format: &'static str,
        /// Parser detail.
        message: String,
    },

    /// A required field was absent from the response.
    #[error("Missing required field '{field}' in response")]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// The response shape did not match the operation output.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, AwsError>;
