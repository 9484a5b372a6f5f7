//! Header and presigned-URL signing.

use super::canonical;
use super::chunked::{encoded_stream_length, ChunkSigningContext};
use super::{
    build_credential_scope, build_credential_string, derive_signing_key, format_date_stamp,
    format_datetime, hmac_sha256, sha256_hex, AWS_ALGORITHM, EMPTY_STRING_SHA256,
    MAX_PRESIGN_EXPIRATION_SECS, STREAMING_PAYLOAD, UNSIGNED_PAYLOAD,
};
use crate::config::ServiceConfig;
use crate::credentials::AwsCredentials;
use crate::error::{AwsError, RequestError, SigningError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// What the signer should use as the payload hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyDigest {
    /// Hex SHA-256 of the buffered body bytes.
    Sha256(String),
    /// The body is a stream the signer must not read.
    UnsignedPayload,
    /// The body is a signed chunked stream.
    Chunked,
    /// No body.
    Empty,
}

impl BodyDigest {
    /// Digest buffered body bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        if data.is_empty() {
            BodyDigest::Empty
        } else {
            BodyDigest::Sha256(sha256_hex(data))
        }
    }

    fn payload_hash(&self) -> &str {
        match self {
            BodyDigest::Sha256(hex) => hex,
            BodyDigest::UnsignedPayload => UNSIGNED_PAYLOAD,
            BodyDigest::Chunked => STREAMING_PAYLOAD,
            BodyDigest::Empty => EMPTY_STRING_SHA256,
        }
    }
}

/// Output of a header-signing pass: headers to merge into the request, plus
/// the computed signature (the seed for chunked signing).
#[derive(Debug, Clone)]
pub struct SignedParts {
    /// Headers to insert, lowercase names.
    pub headers: Vec<(String, String)>,
    /// The request signature hex string.
    pub signature: String,
}

/// AWS Signature V4 signer for one service/region pair.
///
/// The signer is pure: given the same credentials, date, and request it
/// always produces the same signature. Callers decide whether to invoke it
/// at all; empty credentials mean the request goes out unsigned.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    service: String,
    region: String,
    signed_body_header: bool,
    double_uri_encode: bool,
}

impl SigV4Signer {
    /// Create a signer with per-service encoding defaults.
    pub fn new(service: impl Into<String>, region: impl Into<String>) -> Self {
        let service = service.into();
        let is_s3 = service == "s3";
        Self {
            service,
            region: region.into(),
            signed_body_header: is_s3,
            double_uri_encode: !is_s3,
        }
    }

    /// Create a signer from a service configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            service: config.signing_name.clone(),
            region: config.region.clone(),
            signed_body_header: config.signed_body_header,
            double_uri_encode: config.double_uri_encode,
        }
    }

    /// Override emission of the `x-amz-content-sha256` header.
    pub fn with_signed_body_header(mut self, enabled: bool) -> Self {
        self.signed_body_header = enabled;
        self
    }

    /// Override canonical-path double encoding.
    pub fn with_double_uri_encode(mut self, enabled: bool) -> Self {
        self.double_uri_encode = enabled;
        self
    }

    /// Sign a request, returning the headers to merge (`x-amz-date`,
    /// `host` if absent, the payload-hash header when configured, the
    /// session token, and `authorization`).
    pub fn sign_headers(
        &self,
        method: &str,
        url: &Url,
        headers: &HashMap<String, String>,
        digest: &BodyDigest,
        credentials: &AwsCredentials,
        date: DateTime<Utc>,
    ) -> Result<SignedParts, AwsError> {
        let host = host_value(url)?;
        let amz_date = format_datetime(&date);
        let date_stamp = format_date_stamp(&date);
        let payload_hash = digest.payload_hash().to_string();

        let mut signing_headers: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        let mut additions: Vec<(String, String)> = Vec::new();

        let mut add = |name: &str, value: String, signing: &mut Vec<(String, String)>, out: &mut Vec<(String, String)>| {
            signing.retain(|(k, _)| k != name);
            signing.push((name.to_string(), value.clone()));
            out.push((name.to_string(), value));
        };

        if !signing_headers.iter().any(|(k, _)| k == "host") {
            add("host", host, &mut signing_headers, &mut additions);
        }
        add(
            "x-amz-date",
            amz_date.clone(),
            &mut signing_headers,
            &mut additions,
        );
        if self.signed_body_header || *digest == BodyDigest::Chunked {
            add(
                "x-amz-content-sha256",
                payload_hash.clone(),
                &mut signing_headers,
                &mut additions,
            );
        }
        if let Some(token) = credentials.session_token() {
            add(
                "x-amz-security-token",
                token.to_string(),
                &mut signing_headers,
                &mut additions,
            );
        }

        let creq = canonical::canonical_request(
            method,
            url.path(),
            url.query(),
            &signing_headers,
            &payload_hash,
            self.double_uri_encode,
        );
        tracing::trace!(canonical_request = %creq, "canonical request");

        let scope = build_credential_scope(&date_stamp, &self.region, &self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            AWS_ALGORITHM,
            amz_date,
            scope,
            sha256_hex(creq.as_bytes())
        );

        let signing_key = derive_signing_key(
            credentials.secret_access_key(),
            &date_stamp,
            &self.region,
            &self.service,
        );
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{} Credential={}, SignedHeaders={}, Signature={}",
            AWS_ALGORITHM,
            build_credential_string(credentials.access_key_id(), &scope),
            canonical::signed_headers(&signing_headers),
            signature
        );
        additions.push(("authorization".to_string(), authorization));

        Ok(SignedParts {
            headers: additions,
            signature,
        })
    }

    /// Create a presigned URL valid for `expires_in`.
    ///
    /// The `X-Amz-*` parameters land in the query string; no `authorization`
    /// header is produced, and `X-Amz-Signature` is appended last.
    pub fn presign(
        &self,
        method: &str,
        url: &Url,
        headers: &HashMap<String, String>,
        credentials: &AwsCredentials,
        expires_in: Duration,
        date: DateTime<Utc>,
    ) -> Result<Url, AwsError> {
        let expires_secs = expires_in.as_secs();
        if expires_secs > MAX_PRESIGN_EXPIRATION_SECS {
            return Err(AwsError::Signing(SigningError::ExpirationTooLong {
                requested: expires_secs,
                max: MAX_PRESIGN_EXPIRATION_SECS,
            }));
        }

        let host = host_value(url)?;
        let amz_date = format_datetime(&date);
        let date_stamp = format_date_stamp(&date);
        let scope = build_credential_scope(&date_stamp, &self.region, &self.service);

        let mut signing_headers: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();
        if !signing_headers.iter().any(|(k, _)| k == "host") {
            signing_headers.push(("host".to_string(), host));
        }
        let signed_header_names = canonical::signed_headers(&signing_headers);

        // Existing query parameters plus the signature parameters, all
        // strictly encoded and sorted by (key, value).
        let mut params: Vec<(String, String)> = Vec::new();
        if let Some(raw) = url.query() {
            for pair in raw.split('&').filter(|s| !s.is_empty()) {
                let mut parts = pair.splitn(2, '=');
                let key = parts.next().unwrap_or("");
                let value = parts.next().unwrap_or("");
                params.push((
                    percent_encoding::percent_decode_str(key)
                        .decode_utf8_lossy()
                        .into_owned(),
                    percent_encoding::percent_decode_str(value)
                        .decode_utf8_lossy()
                        .into_owned(),
                ));
            }
        }
        params.push(("X-Amz-Algorithm".into(), AWS_ALGORITHM.into()));
        params.push((
            "X-Amz-Credential".into(),
            build_credential_string(credentials.access_key_id(), &scope),
        ));
        params.push(("X-Amz-Date".into(), amz_date.clone()));
        params.push(("X-Amz-Expires".into(), expires_secs.to_string()));
        params.push(("X-Amz-SignedHeaders".into(), signed_header_names.clone()));
        if let Some(token) = credentials.session_token() {
            params.push(("X-Amz-Security-Token".into(), token.to_string()));
        }

        let mut encoded: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| {
                (
                    canonical::uri_encode_strict(k),
                    canonical::uri_encode_strict(v),
                )
            })
            .collect();
        encoded.sort();

        let canonical_query = encoded
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let creq = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method.to_uppercase(),
            canonical::canonical_uri(url.path(), self.double_uri_encode),
            canonical_query,
            canonical::canonical_headers(&signing_headers),
            signed_header_names,
            UNSIGNED_PAYLOAD
        );

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            AWS_ALGORITHM,
            amz_date,
            scope,
            sha256_hex(creq.as_bytes())
        );
        let signing_key = derive_signing_key(
            credentials.secret_access_key(),
            &date_stamp,
            &self.region,
            &self.service,
        );
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let final_query = format!("{}&X-Amz-Signature={}", canonical_query, signature);
        let mut presigned = url.clone();
        presigned.set_query(Some(&final_query));
        Ok(presigned)
    }

    /// Sign a chunked streaming upload.
    ///
    /// Returns the headers to merge (chunked transfer headers plus the
    /// signature headers) and the context that seeds the per-chunk
    /// signature chain with the request signature.
    pub fn start_chunked(
        &self,
        method: &str,
        url: &Url,
        headers: &HashMap<String, String>,
        decoded_length: u64,
        chunk_size: usize,
        credentials: &AwsCredentials,
        date: DateTime<Utc>,
    ) -> Result<(SignedParts, ChunkSigningContext), AwsError> {
        if chunk_size == 0 {
            return Err(AwsError::Request(RequestError::Unencodable {
                member: "chunk_size".into(),
                details: "chunk size must be non-zero".into(),
            }));
        }

        let mut merged = headers.clone();
        merged.insert("content-encoding".to_string(), "aws-chunked".to_string());
        merged.insert(
            "x-amz-decoded-content-length".to_string(),
            decoded_length.to_string(),
        );
        merged.insert(
            "content-length".to_string(),
            encoded_stream_length(decoded_length, chunk_size).to_string(),
        );

        let mut parts =
            self.sign_headers(method, url, &merged, &BodyDigest::Chunked, credentials, date)?;

        // Surface the chunked transfer headers alongside the signing headers.
        parts.headers.insert(
            0,
            ("content-encoding".to_string(), "aws-chunked".to_string()),
        );
        parts.headers.insert(
            1,
            (
                "x-amz-decoded-content-length".to_string(),
                decoded_length.to_string(),
            ),
        );
        parts.headers.insert(
            2,
            (
                "content-length".to_string(),
                encoded_stream_length(decoded_length, chunk_size).to_string(),
            ),
        );

        let date_stamp = format_date_stamp(&date);
        let context = ChunkSigningContext::new(
            derive_signing_key(
                credentials.secret_access_key(),
                &date_stamp,
                &self.region,
                &self.service,
            ),
            parts.signature.clone(),
            format_datetime(&date),
            build_credential_scope(&date_stamp, &self.region, &self.service),
            chunk_size,
        );

        Ok((parts, context))
    }
}

fn host_value(url: &Url) -> Result<String, AwsError> {
    let host = url
        .host_str()
        .ok_or_else(|| {
            AwsError::Request(RequestError::InvalidUrl {
                url: url.to_string(),
                details: "URL has no host".into(),
            })
        })?
        .to_string();

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
