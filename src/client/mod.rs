//! The execution pipeline.
//!
//! One `execute` call runs: credential acquisition, request build,
//! middleware chain, signing (header, unsigned-stream, or chunked),
//! dispatch through the injected transport, response validation, and typed
//! decode. Retries are bounded and limited to throttle and transient
//! failures, cancellation is cooperative at every suspension point, and
//! each client keeps its own metrics.

mod cancel;

pub use cancel::CancellationToken;

use crate::config::{LogLevel, ServiceConfig};
use crate::credentials::{AwsCredentials, ChainCredentialsProvider, CredentialsProvider};
use crate::error::{AwsError, RequestError, TransportError};
use crate::metrics::{ClientMetrics, MetricsSnapshot};
use crate::middleware::{run_chain, Middleware, MiddlewareContext};
use crate::operation::{OperationDescriptor, OperationInput};
use crate::request::{build_request, AwsRequest};
use crate::resilience::RetryPolicy;
use crate::response::{validate_response, DecodedResponse, OperationOutput};
use crate::signing::{BodyDigest, SigV4Signer};
use crate::stream::{unsigned_stream, AwsChunkedBody};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// A client for one service: owns the pipeline around an injected
/// transport and credential provider.
pub struct AwsClient {
    config: Arc<ServiceConfig>,
    credentials: Arc<dyn CredentialsProvider>,
    transport: Arc<dyn HttpTransport>,
    signer: SigV4Signer,
    retry: RetryPolicy,
    middlewares: Vec<Arc<dyn Middleware>>,
    metrics: Arc<ClientMetrics>,
    request_counter: AtomicU64,
    shut_down: AtomicBool,
}

impl AwsClient {
    /// Create a builder.
    pub fn builder() -> AwsClientBuilder {
        AwsClientBuilder::new()
    }

    /// The client configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// A point-in-time metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Execute one operation.
    pub async fn execute<I, O>(
        &self,
        operation: &OperationDescriptor,
        input: &I,
    ) -> Result<O, AwsError>
    where
        I: OperationInput,
        O: OperationOutput,
    {
        self.execute_cancellable(operation, input, &CancellationToken::new())
            .await
    }

    /// Execute one operation under a cancellation token.
    #[tracing::instrument(
        skip(self, operation, input, cancel),
        fields(service = %self.config.service, operation = operation.name)
    )]
    pub async fn execute_cancellable<I, O>(
        &self,
        operation: &OperationDescriptor,
        input: &I,
        cancel: &CancellationToken,
    ) -> Result<O, AwsError>
    where
        I: OperationInput,
        O: OperationOutput,
    {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(AwsError::AlreadyShutdown);
        }

        let decoded = self.execute_with_retries(operation, input, cancel).await?;
        O::decode(decoded)
    }

    async fn execute_with_retries(
        &self,
        operation: &OperationDescriptor,
        input: &dyn OperationInput,
        cancel: &CancellationToken,
    ) -> Result<DecodedResponse, AwsError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(AwsError::Cancelled);
            }

            // Each attempt gets its own request id and counts toward the
            // request total.
            let request_id = self.request_counter.fetch_add(1, Ordering::Relaxed) + 1;
            self.metrics.record_request(operation.name);
            let started = Instant::now();

            emit(
                self.config.request_log_level,
                format_args!(
                    "{} {} starting (request_id={}, attempt={})",
                    self.config.service, operation.name, request_id, attempt
                ),
            );

            let mut streaming_body = false;
            let result = self
                .attempt(operation, input, request_id, attempt, cancel, &mut streaming_body)
                .await;
            self.metrics
                .record_duration(operation.name, started.elapsed());

            let err = match result {
                Ok(decoded) => {
                    emit(
                        self.config.request_log_level,
                        format_args!(
                            "{} {} succeeded (request_id={}, attempt={})",
                            self.config.service, operation.name, request_id, attempt
                        ),
                    );
                    return Ok(decoded);
                }
                Err(err) => {
                    self.metrics.record_error(operation.name);
                    err
                }
            };

            // Service-typed errors were already decoded from the envelope;
            // log them once at the request level instead of the error level.
            let level = if matches!(err, AwsError::Http(_)) {
                self.config.request_log_level
            } else {
                self.config.error_log_level
            };
            emit(
                level,
                format_args!(
                    "{} {} failed (request_id={}, attempt={}): {}",
                    self.config.service, operation.name, request_id, attempt, err
                ),
            );

            let out_of_attempts = attempt >= max_attempts;
            if !err.is_retryable() || out_of_attempts || streaming_body || cancel.is_cancelled() {
                return Err(err);
            }

            let delay = self.retry.delay_before_retry(attempt, err.retry_after());
            debug!(
                request_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "backing off before retry"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(AwsError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn attempt(
        &self,
        operation: &OperationDescriptor,
        input: &dyn OperationInput,
        request_id: u64,
        attempt: u32,
        cancel: &CancellationToken,
        streaming_body: &mut bool,
    ) -> Result<DecodedResponse, AwsError> {
        let credentials = tokio::select! {
            _ = cancel.cancelled() => return Err(AwsError::Cancelled),
            result = self.credentials.credentials() => result?,
        };

        let mut request = build_request(operation, input, &self.config)?;
        let context = MiddlewareContext {
            operation: operation.name.to_string(),
            request_id,
            attempt,
        };
        run_chain(&self.config.middlewares, &mut request, &context)?;
        run_chain(&self.middlewares, &mut request, &context)?;

        *streaming_body = request.body.is_streaming();
        let response = if let Some(stream) = request.body.as_stream().cloned() {
            self.dispatch_stream(operation, request, stream, &credentials, cancel)
                .await?
        } else {
            self.dispatch_buffered(request, &credentials, cancel).await?
        };

        if cancel.is_cancelled() {
            return Err(AwsError::Cancelled);
        }

        validate_response(response, self.config.protocol)
    }

    async fn dispatch_buffered(
        &self,
        mut request: AwsRequest,
        credentials: &AwsCredentials,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, AwsError> {
        let bytes = request
            .body
            .as_bytes()
            .expect("buffered dispatch requires a realized body");

        if !credentials.is_empty() {
            let digest = BodyDigest::of_bytes(&bytes);
            let parts = self.signer.sign_headers(
                &request.method,
                &request.url,
                &request.headers,
                &digest,
                credentials,
                Utc::now(),
            )?;
            for (name, value) in parts.headers {
                request.headers.insert(name, value);
            }
        }

        let mut http_request =
            HttpRequest::new(request.method.clone(), request.url.to_string())
                .with_headers(request.headers.clone());
        if !bytes.is_empty() {
            http_request = http_request.with_body(bytes);
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(AwsError::Cancelled),
            result = self.transport.send(http_request, self.config.timeout) => result,
        }
    }

    async fn dispatch_stream(
        &self,
        operation: &OperationDescriptor,
        mut request: AwsRequest,
        stream: Arc<crate::stream::PayloadStream>,
        credentials: &AwsCredentials,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, AwsError> {
        let chunked = operation.flags.allow_chunked_streaming
            && !self.config.s3_disable_chunked_uploads
            && !credentials.is_empty();

        let body = if chunked {
            let size = stream
                .size()
                .ok_or(AwsError::Request(RequestError::MissingContentLength))?;
            let (parts, context) = self.signer.start_chunked(
                &request.method,
                &request.url,
                &request.headers,
                size,
                self.config.chunk_size,
                credentials,
                Utc::now(),
            )?;
            for (name, value) in parts.headers {
                request.headers.insert(name, value);
            }
            let reader = take_reader(&stream)?;
            AwsChunkedBody::stream(reader, context, self.config.chunk_size)
        } else {
            match stream.size() {
                Some(size) => request.set_header("content-length", size.to_string()),
                // Without a length the body goes out with chunked transfer
                // encoding, which only chunk-capable operations accept.
                None if operation.flags.allow_chunked_streaming => {}
                None => return Err(AwsError::Request(RequestError::MissingContentLength)),
            }

            if !credentials.is_empty() {
                let parts = self.signer.sign_headers(
                    &request.method,
                    &request.url,
                    &request.headers,
                    &BodyDigest::UnsignedPayload,
                    credentials,
                    Utc::now(),
                )?;
                for (name, value) in parts.headers {
                    request.headers.insert(name, value);
                }
            }
            let reader = take_reader(&stream)?;
            unsigned_stream(reader, self.config.chunk_size)
        };

        let http_request = HttpRequest::new(request.method.clone(), request.url.to_string())
            .with_headers(request.headers.clone());

        tokio::select! {
            _ = cancel.cancelled() => Err(AwsError::Cancelled),
            result = self.transport.send_streaming(http_request, body, self.config.timeout) => result,
        }
    }

    /// Create a presigned URL for an operation.
    ///
    /// The request is built (members distributed, query encoded) but not
    /// dispatched; the body is ignored.
    pub async fn presign(
        &self,
        operation: &OperationDescriptor,
        input: &dyn OperationInput,
        expires_in: Duration,
    ) -> Result<Url, AwsError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(AwsError::AlreadyShutdown);
        }

        let credentials = self.credentials.credentials().await?;
        let request = build_request(operation, input, &self.config)?;
        self.signer.presign(
            &request.method,
            &request.url,
            &request.headers,
            &credentials,
            expires_in,
            Utc::now(),
        )
    }

    /// Shut down the client. The first call flips the flag and shuts down
    /// the credential provider; later calls fail with `AlreadyShutdown`.
    /// Calls already in flight run to completion or cancellation.
    pub async fn shutdown(&self) -> Result<(), AwsError> {
        if self
            .shut_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AwsError::AlreadyShutdown);
        }
        self.credentials.shutdown().await;
        Ok(())
    }
}

impl std::fmt::Debug for AwsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsClient")
            .field("config", &self.config)
            .field("shut_down", &self.shut_down.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn take_reader(
    stream: &Arc<crate::stream::PayloadStream>,
) -> Result<Box<dyn crate::stream::ChunkRead>, AwsError> {
    stream.take_reader().ok_or_else(|| {
        AwsError::Transport(TransportError::BodyStream {
            message: "body stream already consumed; streaming requests cannot be replayed".into(),
        })
    })
}

fn emit(level: LogLevel, message: std::fmt::Arguments<'_>) {
    match level {
        LogLevel::Error => tracing::error!("{}", message),
        LogLevel::Warn => tracing::warn!("{}", message),
        LogLevel::Info => tracing::info!("{}", message),
        LogLevel::Debug => tracing::debug!("{}", message),
        LogLevel::Trace => tracing::trace!("{}", message),
    }
}

/// Builder for [`AwsClient`].
pub struct AwsClientBuilder {
    config: Option<ServiceConfig>,
    credentials: Option<Arc<dyn CredentialsProvider>>,
    transport: Option<Arc<dyn HttpTransport>>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl AwsClientBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            config: None,
            credentials: None,
            transport: None,
            middlewares: Vec::new(),
        }
    }

    /// Use the given configuration.
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom credential provider.
    pub fn credentials(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Use a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Append a client middleware; client middlewares run after the
    /// service-declared ones.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<AwsClient, AwsError> {
        let config = match self.config {
            Some(config) => config,
            None => {
                return Err(AwsError::Configuration(
                    crate::error::ConfigurationError::InvalidConfiguration {
                        field: "config".into(),
                        message: "a service configuration is required".into(),
                    },
                ))
            }
        };

        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(ChainCredentialsProvider::new()));
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let signer = SigV4Signer::from_config(&config);
        let retry = RetryPolicy::new(config.retry.clone());

        Ok(AwsClient {
            config: Arc::new(config),
            credentials,
            transport,
            signer,
            retry,
            middlewares: self.middlewares,
            metrics: Arc::new(ClientMetrics::new()),
            request_counter: AtomicU64::new(0),
            shut_down: AtomicBool::new(false),
        })
    }
}

impl Default for AwsClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
