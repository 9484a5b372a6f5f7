//! Body integrity checksums.
//!
//! Selects an algorithm from the operation flags and client options,
//! computes the digest over the realized body bytes, and places the
//! base64-encoded result in the algorithm-specific header. Streams are
//! never checksummed here; they go through chunked signing instead.

use crate::config::ServiceConfig;
use crate::operation::OperationDescriptor;
use crate::request::AwsRequest;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use md5::Digest as _;

/// Header naming the requested checksum algorithm.
pub const CHECKSUM_ALGORITHM_HEADER: &str = "x-amz-sdk-checksum-algorithm";

/// Checksum algorithms the engine can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// CRC32 (ISO-HDLC), four big-endian bytes.
    Crc32,
    /// CRC32C (Castagnoli), four big-endian bytes.
    Crc32c,
    /// SHA-1, twenty bytes.
    Sha1,
    /// SHA-256, thirty-two bytes.
    Sha256,
    /// MD5, sixteen bytes, placed in `content-md5`.
    Md5,
}

impl ChecksumAlgorithm {
    /// Parse the value of `x-amz-sdk-checksum-algorithm`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "CRC32" => Some(ChecksumAlgorithm::Crc32),
            "CRC32C" => Some(ChecksumAlgorithm::Crc32c),
            "SHA1" => Some(ChecksumAlgorithm::Sha1),
            "SHA256" => Some(ChecksumAlgorithm::Sha256),
            "MD5" => Some(ChecksumAlgorithm::Md5),
            _ => None,
        }
    }

    /// The header the digest lands in.
    pub fn header_name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Crc32 => "x-amz-checksum-crc32",
            ChecksumAlgorithm::Crc32c => "x-amz-checksum-crc32c",
            ChecksumAlgorithm::Sha1 => "x-amz-checksum-sha1",
            ChecksumAlgorithm::Sha256 => "x-amz-checksum-sha256",
            ChecksumAlgorithm::Md5 => "content-md5",
        }
    }

    /// Compute the base64-encoded digest of `data`.
    pub fn digest_base64(&self, data: &[u8]) -> String {
        match self {
            ChecksumAlgorithm::Crc32 => {
                let mut hasher = crc32fast::Hasher::new();
                hasher.update(data);
                BASE64_STANDARD.encode(hasher.finalize().to_be_bytes())
            }
            ChecksumAlgorithm::Crc32c => {
                BASE64_STANDARD.encode(crc32c::crc32c(data).to_be_bytes())
            }
            ChecksumAlgorithm::Sha1 => {
                let mut hasher = sha1::Sha1::new();
                hasher.update(data);
                BASE64_STANDARD.encode(hasher.finalize())
            }
            ChecksumAlgorithm::Sha256 => {
                let mut hasher = sha2::Sha256::new();
                hasher.update(data);
                BASE64_STANDARD.encode(hasher.finalize())
            }
            ChecksumAlgorithm::Md5 => {
                let mut hasher = md5::Md5::new();
                hasher.update(data);
                BASE64_STANDARD.encode(hasher.finalize())
            }
        }
    }
}

/// Select the checksum algorithm for this request, if any.
///
/// Order: an explicit `x-amz-sdk-checksum-algorithm` header when the
/// operation advertises one, then a required MD5, then the optional MD5
/// header gated on `calculate_md5`.
pub fn select_algorithm(
    operation: &OperationDescriptor,
    config: &ServiceConfig,
    request: &AwsRequest,
) -> Option<ChecksumAlgorithm> {
    if operation.flags.checksum_header {
        if let Some(value) = request.headers.get(CHECKSUM_ALGORITHM_HEADER) {
            if let Some(algorithm) = ChecksumAlgorithm::parse(value) {
                return Some(algorithm);
            }
        }
    }
    if operation.flags.checksum_required {
        return Some(ChecksumAlgorithm::Md5);
    }
    if operation.flags.md5_checksum_header && config.calculate_md5 {
        return Some(ChecksumAlgorithm::Md5);
    }
    None
}

/// Compute and place the checksum header on the request.
///
/// A no-op when no algorithm applies, when the body is a stream, or when
/// the target header is already present (so running the engine twice leaves
/// the request unchanged).
pub fn apply_checksum(
    operation: &OperationDescriptor,
    config: &ServiceConfig,
    request: &mut AwsRequest,
) {
    let Some(algorithm) = select_algorithm(operation, config, request) else {
        return;
    };
    if request.headers.contains_key(algorithm.header_name()) {
        return;
    }
    let Some(body) = request.body.as_bytes() else {
        return;
    };

    let digest = algorithm.digest_base64(&body);
    request
        .headers
        .insert(algorithm.header_name().to_string(), digest);
}
