//! Request construction, signing, and dispatch core for AWS-style services.
//!
//! This crate is the shared engine under per-service clients: it turns a
//! typed operation input into an authenticated HTTP request, executes it,
//! and decodes the typed response.
//!
//! # Features
//!
//! - **Request shaping**: header / query / URI / hostname / body member
//!   distribution under five wire protocols (JSON, REST-JSON, REST-XML,
//!   Query, EC2-Query)
//! - **AWS Signature V4**: header signing, presigned URLs, and chained
//!   chunk signatures for streaming uploads
//! - **Integrity checksums**: CRC32, CRC32C, SHA1, SHA256, MD5
//! - **Execution pipeline**: credentials, middleware, retries with backoff,
//!   cancellation, metrics
//! - **Pagination**: continuation-token driving with a safety bound
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use aws_core::{
//!     AwsClient, BoundMember, FieldLocation, MemberValue, OperationDescriptor,
//!     OperationInput, Protocol, JsonVersion, ServiceConfig,
//! };
//!
//! struct PutItemInput {
//!     table_name: String,
//! }
//!
//! impl OperationInput for PutItemInput {
//!     fn members(&self) -> Vec<BoundMember> {
//!         vec![BoundMember::new(
//!             FieldLocation::Body,
//!             "TableName",
//!             MemberValue::Scalar(self.table_name.clone()),
//!         )]
//!     }
//! }
//!
//! # async fn example() -> Result<(), aws_core::AwsError> {
//! let config = ServiceConfig::builder()
//!     .service("dynamodb")
//!     .region("us-east-1")
//!     .protocol(Protocol::Json(JsonVersion::V1_0))
//!     .amz_target("DynamoDB_20120810")
//!     .from_env()
//!     .build()?;
//!
//! let client = AwsClient::builder().config(config).build()?;
//!
//! let put_item = OperationDescriptor::new("PutItem", "POST", "/");
//! let _: aws_core::EmptyOutput = client
//!     .execute(&put_item, &PutItemInput { table_name: "T".into() })
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod checksum;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod mocks;
pub mod operation;
pub mod paginate;
pub mod request;
pub mod resilience;
pub mod response;
pub mod signing;
pub mod stream;
pub mod transport;

pub use checksum::ChecksumAlgorithm;
pub use client::{AwsClient, AwsClientBuilder, CancellationToken};
pub use config::{JsonVersion, LogLevel, Protocol, ServiceConfig, ServiceConfigBuilder};
pub use credentials::{
    AwsCredentials, ChainCredentialsProvider, CredentialsProvider, EnvCredentialsProvider,
    StaticCredentialsProvider,
};
pub use error::{AwsError, ErrorClass, HttpError, Result};
pub use metrics::{ClientMetrics, MetricsSnapshot};
pub use middleware::{Middleware, MiddlewareContext};
pub use operation::{
    BoundMember, Document, EmptyInput, FieldLocation, MemberValue, OperationDescriptor,
    OperationFlags, OperationInput, PayloadMember,
};
pub use paginate::{PageableInput, PageableOutput, DEFAULT_MAX_PAGES};
pub use request::{build_request, AwsBody, AwsPayload, AwsRequest};
pub use resilience::{RetryConfig, RetryPolicy};
pub use response::{DecodedResponse, EmptyOutput, OperationOutput};
pub use signing::{BodyDigest, ChunkSigningContext, SigV4Signer, SignedParts};
pub use stream::{ChunkRead, PayloadStream};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
