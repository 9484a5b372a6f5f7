//! Failure classification for the retry loop.

/// Coarse classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The service asked us to slow down (429, or 503 with a throttling code).
    Throttle,
    /// A transient server or connection fault worth retrying.
    Transient,
    /// The resource does not exist (404).
    NotFound,
    /// A client-side fault (other 4xx); retrying cannot help.
    Client,
    /// A local fault (signing, validation, decode); retrying cannot help.
    Fatal,
}

/// Error codes that indicate server-side throttling regardless of status.
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "RequestThrottledException",
    "RequestThrottled",
    "TooManyRequestsException",
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "BandwidthLimitExceeded",
    "SlowDown",
    "PriorRequestNotComplete",
    "EC2ThrottledException",
];

/// Classify a service error by status code and envelope code.
pub(crate) fn classify(status: u16, code: &str) -> ErrorClass {
    if status == 429 || THROTTLING_CODES.contains(&code) {
        return ErrorClass::Throttle;
    }
    if status == 404 {
        return ErrorClass::NotFound;
    }
    if (500..600).contains(&status) {
        return ErrorClass::Transient;
    }
    if (400..500).contains(&status) {
        return ErrorClass::Client;
    }
    ErrorClass::Fatal
}
