//! Chained chunk signatures for streaming uploads.
//!
//! Each chunk of a signed streaming body carries its own signature, keyed
//! off the previous chunk's signature; the chain is seeded with the request
//! signature. Chunks travel framed as:
//!
//! ```text
//! hex(len);chunk-signature=<sig>\r\n<bytes>\r\n
//! ```
//!
//! A zero-length chunk terminates the stream; its signature signs empty
//! bytes.

use super::{hmac_sha256, sha256_hex, AWS_CHUNK_ALGORITHM, EMPTY_STRING_SHA256};
use crate::error::{AwsError, RequestError};
use bytes::{BufMut, Bytes, BytesMut};

/// Framing overhead around each chunk, excluding the hex length digits:
/// `;chunk-signature=` (17) + 64 signature hex chars + two CRLF pairs.
const CHUNK_FRAME_OVERHEAD: u64 = 17 + 64 + 2 + 2;

/// Mutable state for a chunk-signature chain. Advanced once per chunk;
/// cannot be rewound.
#[derive(Debug, Clone)]
pub struct ChunkSigningContext {
    signing_key: Vec<u8>,
    previous_signature: String,
    amz_date: String,
    scope: String,
    max_chunk_size: usize,
}

impl ChunkSigningContext {
    /// Build a context seeded with the request signature.
    pub fn new(
        signing_key: Vec<u8>,
        seed_signature: String,
        amz_date: String,
        scope: String,
        max_chunk_size: usize,
    ) -> Self {
        Self {
            signing_key,
            previous_signature: seed_signature,
            amz_date,
            scope,
            max_chunk_size,
        }
    }

    /// The signature the next chunk will chain from.
    pub fn previous_signature(&self) -> &str {
        &self.previous_signature
    }

    /// Sign one chunk and return its framed bytes, advancing the chain.
    ///
    /// Pass empty `data` for the terminating zero-length chunk.
    pub fn sign_chunk(&mut self, data: &[u8]) -> Result<Bytes, AwsError> {
        if data.len() > self.max_chunk_size {
            return Err(AwsError::Request(RequestError::Unencodable {
                member: "chunk".into(),
                details: format!(
                    "chunk of {} bytes exceeds maximum of {}",
                    data.len(),
                    self.max_chunk_size
                ),
            }));
        }

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            AWS_CHUNK_ALGORITHM,
            self.amz_date,
            self.scope,
            self.previous_signature,
            EMPTY_STRING_SHA256,
            sha256_hex(data)
        );
        let signature = hex::encode(hmac_sha256(&self.signing_key, string_to_sign.as_bytes()));

        let header = format!("{:x};chunk-signature={}\r\n", data.len(), signature);
        let mut framed = BytesMut::with_capacity(header.len() + data.len() + 2);
        framed.put_slice(header.as_bytes());
        framed.put_slice(data);
        framed.put_slice(b"\r\n");

        self.previous_signature = signature;
        Ok(framed.freeze())
    }
}

/// Total on-the-wire length of a chunk-framed stream: full chunks, a
/// possible short final data chunk, and the zero-length terminator.
pub fn encoded_stream_length(decoded_length: u64, chunk_size: usize) -> u64 {
    let chunk_size = chunk_size as u64;
    let full_chunks = decoded_length / chunk_size;
    let remainder = decoded_length % chunk_size;

    let mut total = full_chunks * frame_length(chunk_size);
    if remainder > 0 {
        total += frame_length(remainder);
    }
    total + frame_length(0)
}

fn frame_length(data_len: u64) -> u64 {
    hex_digits(data_len) + CHUNK_FRAME_OVERHEAD + data_len
}

fn hex_digits(value: u64) -> u64 {
    if value == 0 {
        1
    } else {
        (64 - value.leading_zeros() as u64).div_ceil(4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_context(seed: &str) -> ChunkSigningContext {
        ChunkSigningContext::new(
            vec![0u8; 32],
            seed.to_string(),
            "20130524T000000Z".to_string(),
            "20130524/us-east-1/s3/aws4_request".to_string(),
            64 * 1024,
        )
    }

    #[test]
    fn test_frame_shape() {
        let mut ctx = test_context("seed");
        let framed = ctx.sign_chunk(b"hello").unwrap();
        let text = String::from_utf8_lossy(&framed);

        assert!(text.starts_with("5;chunk-signature="));
        assert!(text.ends_with("\r\n"));
        // header + CRLF + data + CRLF
        assert_eq!(framed.len(), 1 + 17 + 64 + 2 + 5 + 2);
    }

    #[test]
    fn test_chain_advances() {
        let mut ctx = test_context("seed");
        assert_eq!(ctx.previous_signature(), "seed");
        ctx.sign_chunk(b"abc").unwrap();
        let after_first = ctx.previous_signature().to_string();
        assert_ne!(after_first, "seed");
        ctx.sign_chunk(b"abc").unwrap();
        // Same bytes, different predecessor, different signature.
        assert_ne!(ctx.previous_signature(), after_first);
    }

    #[test]
    fn test_terminal_chunk() {
        let mut ctx = test_context("seed");
        let framed = ctx.sign_chunk(b"").unwrap();
        let text = String::from_utf8_lossy(&framed);
        assert!(text.starts_with("0;chunk-signature="));
        assert_eq!(framed.len() as u64, frame_length(0));
    }

    #[test]
    fn test_oversize_chunk_rejected() {
        let mut ctx = ChunkSigningContext::new(
            vec![0u8; 32],
            "seed".into(),
            "20130524T000000Z".into(),
            "20130524/us-east-1/s3/aws4_request".into(),
            4,
        );
        assert!(ctx.sign_chunk(b"hello").is_err());
    }

    #[test]
    fn test_encoded_stream_length() {
        // 12 MiB at 64 KiB chunks: 192 full frames plus the terminator.
        let decoded = 12 * 1024 * 1024;
        let chunk = 64 * 1024;
        let per_frame = 5 + CHUNK_FRAME_OVERHEAD + chunk as u64;
        assert_eq!(
            encoded_stream_length(decoded, chunk),
            192 * per_frame + (1 + CHUNK_FRAME_OVERHEAD)
        );

        // Short final chunk.
        assert_eq!(
            encoded_stream_length(5, chunk),
            (1 + CHUNK_FRAME_OVERHEAD + 5) + (1 + CHUNK_FRAME_OVERHEAD)
        );

        // Empty stream is just the terminator.
        assert_eq!(encoded_stream_length(0, chunk), 1 + CHUNK_FRAME_OVERHEAD);
    }

    #[test]
    fn test_hex_digits() {
        assert_eq!(hex_digits(0), 1);
        assert_eq!(hex_digits(0xf), 1);
        assert_eq!(hex_digits(0x10), 2);
        assert_eq!(hex_digits(0xffff), 4);
        assert_eq!(hex_digits(0x10000), 5);
    }
}
