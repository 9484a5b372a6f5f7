//! Per-service client configuration.
//!
//! [`ServiceConfig`] is built once, validated, and shared immutably for the
//! lifetime of the client. It carries everything the request builder and
//! signer need to speak one service's dialect: wire protocol, signing name,
//! endpoint, encoding quirks, and the service middleware list.

use crate::error::{AwsError, ConfigurationError};
use crate::middleware::Middleware;
use crate::resilience::RetryConfig;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Version tag for JSON-RPC style protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonVersion {
    /// `application/x-amz-json-1.0`
    V1_0,
    /// `application/x-amz-json-1.1`
    V1_1,
}

/// Wire protocol spoken by a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// JSON-RPC style: POST to `/`, operation named by `x-amz-target`.
    Json(JsonVersion),
    /// RESTful JSON: operation identified by method + path.
    RestJson,
    /// RESTful XML (S3 and friends).
    RestXml,
    /// Form-urlencoded `Action`/`Version` bodies, XML responses.
    Query,
    /// EC2 variant of the query protocol (different list flattening).
    Ec2Query,
}

impl Protocol {
    /// Default `content-type` for request bodies under this protocol.
    pub fn content_type(&self) -> &'static str {
        match self {
            Protocol::Json(JsonVersion::V1_0) => "application/x-amz-json-1.0",
            Protocol::Json(JsonVersion::V1_1) => "application/x-amz-json-1.1",
            Protocol::RestJson => "application/json",
            Protocol::RestXml => "application/xml",
            Protocol::Query | Protocol::Ec2Query => {
                "application/x-www-form-urlencoded; charset=utf-8"
            }
        }
    }

    /// True for the two form-urlencoded query protocols.
    pub fn is_query(&self) -> bool {
        matches!(self, Protocol::Query | Protocol::Ec2Query)
    }

    /// True when response bodies (success and error) are XML.
    pub fn has_xml_responses(&self) -> bool {
        matches!(self, Protocol::RestXml | Protocol::Query | Protocol::Ec2Query)
    }
}

/// Log level knobs for request and error logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// `tracing::error!`
    Error,
    /// `tracing::warn!`
    Warn,
    /// `tracing::info!`
    Info,
    /// `tracing::debug!`
    Debug,
    /// `tracing::trace!`
    Trace,
}

/// Configuration for one service client.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Service id used in endpoints and diagnostics (e.g. "dynamodb").
    pub service: String,
    /// Name used in the credential scope (usually equals `service`).
    pub signing_name: String,
    /// AWS region (e.g. "us-east-1").
    pub region: String,
    /// Endpoint base URL. HTTPS unless explicitly overridden.
    pub endpoint: Url,
    /// Service API version, sent as `Version` under the query protocols.
    pub api_version: String,
    /// Wire protocol.
    pub protocol: Protocol,
    /// `x-amz-target` prefix for JSON-RPC services (e.g. "DynamoDB_20120810").
    pub amz_target: Option<String>,
    /// XML namespace stamped on request body roots, if the service wants one.
    pub xml_namespace: Option<String>,
    /// Per-attempt dispatch timeout.
    pub timeout: Duration,
    /// Disable signed chunked uploads; streams fall back to unsigned payloads.
    pub s3_disable_chunked_uploads: bool,
    /// Compute `content-md5` for operations that advertise an MD5 header.
    pub calculate_md5: bool,
    /// Double-percent-encode canonical URI paths (everything except S3).
    pub double_uri_encode: bool,
    /// Emit `x-amz-content-sha256` on signed requests (S3 behavior).
    pub signed_body_header: bool,
    /// Level for request start/finish logging.
    pub request_log_level: LogLevel,
    /// Level for failure logging.
    pub error_log_level: LogLevel,
    /// Service-declared middlewares; run before client middlewares.
    pub middlewares: Vec<Arc<dyn Middleware>>,
    /// Retry behavior for throttle and transient failures.
    pub retry: RetryConfig,
    /// Chunk size for signed streaming uploads.
    pub chunk_size: usize,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("service", &self.service)
            .field("signing_name", &self.signing_name)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("protocol", &self.protocol)
            .field("amz_target", &self.amz_target)
            .field("timeout", &self.timeout)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

impl ServiceConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Default)]
pub struct ServiceConfigBuilder {
    service: Option<String>,
    signing_name: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
    api_version: Option<String>,
    protocol: Option<Protocol>,
    amz_target: Option<String>,
    xml_namespace: Option<String>,
    timeout: Option<Duration>,
    s3_disable_chunked_uploads: Option<bool>,
    calculate_md5: Option<bool>,
    double_uri_encode: Option<bool>,
    signed_body_header: Option<bool>,
    request_log_level: Option<LogLevel>,
    error_log_level: Option<LogLevel>,
    middlewares: Vec<Arc<dyn Middleware>>,
    retry: Option<RetryConfig>,
    chunk_size: Option<usize>,
    from_env: bool,
}

impl ServiceConfigBuilder {
    /// Set the service id (e.g. "s3", "dynamodb", "sqs").
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Set the signing name if it differs from the service id.
    pub fn signing_name(mut self, name: impl Into<String>) -> Self {
        self.signing_name = Some(name.into());
        self
    }

    /// Set the region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Override the endpoint URL (for local stacks and compatible services).
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the service API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set the wire protocol.
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Set the `x-amz-target` prefix for JSON-RPC services.
    pub fn amz_target(mut self, target: impl Into<String>) -> Self {
        self.amz_target = Some(target.into());
        self
    }

    /// Set the XML namespace for request bodies.
    pub fn xml_namespace(mut self, ns: impl Into<String>) -> Self {
        self.xml_namespace = Some(ns.into());
        self
    }

    /// Set the per-attempt dispatch timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable signed chunked uploads.
    pub fn s3_disable_chunked_uploads(mut self, disable: bool) -> Self {
        self.s3_disable_chunked_uploads = Some(disable);
        self
    }

    /// Enable MD5 computation for operations that advertise an MD5 header.
    pub fn calculate_md5(mut self, enable: bool) -> Self {
        self.calculate_md5 = Some(enable);
        self
    }

    /// Force single or double URI encoding in the canonical request.
    pub fn double_uri_encode(mut self, double: bool) -> Self {
        self.double_uri_encode = Some(double);
        self
    }

    /// Force emission of `x-amz-content-sha256` on signed requests.
    pub fn signed_body_header(mut self, enable: bool) -> Self {
        self.signed_body_header = Some(enable);
        self
    }

    /// Set the request logging level.
    pub fn request_log_level(mut self, level: LogLevel) -> Self {
        self.request_log_level = Some(level);
        self
    }

    /// Set the error logging level.
    pub fn error_log_level(mut self, level: LogLevel) -> Self {
        self.error_log_level = Some(level);
        self
    }

    /// Append a service middleware.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Set the retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Set the signed-streaming chunk size.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    /// Read region (`AWS_REGION`/`AWS_DEFAULT_REGION`) and endpoint
    /// (`AWS_ENDPOINT_URL`) from the environment at build time.
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Build and validate the configuration.
    pub fn build(mut self) -> Result<ServiceConfig, AwsError> {
        if self.from_env {
            if self.region.is_none() {
                self.region = env::var("AWS_REGION")
                    .or_else(|_| env::var("AWS_DEFAULT_REGION"))
                    .ok();
            }
            if self.endpoint.is_none() {
                self.endpoint = env::var("AWS_ENDPOINT_URL").ok();
            }
        }

        let service = self.service.ok_or(AwsError::Configuration(
            ConfigurationError::InvalidConfiguration {
                field: "service".into(),
                message: "service id is required".into(),
            },
        ))?;
        let region = self
            .region
            .ok_or(AwsError::Configuration(ConfigurationError::MissingRegion))?;
        let signing_name = self.signing_name.unwrap_or_else(|| service.clone());

        let endpoint_str = self
            .endpoint
            .unwrap_or_else(|| format!("https://{}.{}.amazonaws.com", service, region));
        let endpoint = Url::parse(&endpoint_str).map_err(|e| {
            AwsError::Configuration(ConfigurationError::InvalidEndpoint {
                url: endpoint_str.clone(),
                details: e.to_string(),
            })
        })?;
        if endpoint.host_str().is_none() {
            return Err(AwsError::Configuration(ConfigurationError::InvalidEndpoint {
                url: endpoint_str,
                details: "endpoint has no host".into(),
            }));
        }

        // S3 canonicalizes paths with a single encoding pass and carries the
        // body hash header; every other service double-encodes and omits it.
        let is_s3 = signing_name == "s3";

        Ok(ServiceConfig {
            service,
            signing_name,
            region,
            endpoint,
            api_version: self.api_version.unwrap_or_default(),
            protocol: self.protocol.unwrap_or(Protocol::RestJson),
            amz_target: self.amz_target,
            xml_namespace: self.xml_namespace,
            timeout: self.timeout.unwrap_or(Duration::from_secs(60)),
            s3_disable_chunked_uploads: self.s3_disable_chunked_uploads.unwrap_or(false),
            calculate_md5: self.calculate_md5.unwrap_or(false),
            double_uri_encode: self.double_uri_encode.unwrap_or(!is_s3),
            signed_body_header: self.signed_body_header.unwrap_or(is_s3),
            request_log_level: self.request_log_level.unwrap_or(LogLevel::Debug),
            error_log_level: self.error_log_level.unwrap_or(LogLevel::Error),
            middlewares: self.middlewares,
            retry: self.retry.unwrap_or_default(),
            chunk_size: self.chunk_size.unwrap_or(64 * 1024),
        })
    }
}
