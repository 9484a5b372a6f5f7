//! End-to-end pipeline tests over the mock transport.

use aws_core::mocks::{BufferChunkRead, MockResponse, MockTransport};
use aws_core::paginate::{PageableInput, PageableOutput};
use aws_core::{
    AwsClient, AwsCredentials, AwsError, AwsPayload, BoundMember, CancellationToken, EmptyInput,
    EmptyOutput, FieldLocation, JsonVersion, MemberValue, OperationDescriptor, OperationFlags,
    OperationInput, OperationOutput, PayloadMember, PayloadStream, Protocol, RetryConfig,
    ServiceConfig, StaticCredentialsProvider,
};
use std::sync::Arc;
use std::time::Duration;

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig::new(max_attempts)
        .with_initial_backoff(Duration::from_millis(1))
        .with_max_backoff(Duration::from_millis(5))
        .with_jitter(false)
}

fn json_config() -> ServiceConfig {
    ServiceConfig::builder()
        .service("dynamodb")
        .region("us-east-1")
        .protocol(Protocol::Json(JsonVersion::V1_0))
        .amz_target("DynamoDB_20120810")
        .retry(fast_retry(4))
        .build()
        .unwrap()
}

fn client_with(config: ServiceConfig, transport: Arc<MockTransport>) -> AwsClient {
    AwsClient::builder()
        .config(config)
        .transport(transport)
        .credentials(Arc::new(StaticCredentialsProvider::new(
            AwsCredentials::new("AKID", "SECRET"),
        )))
        .build()
        .unwrap()
}

struct TableInput {
    table_name: String,
}

impl OperationInput for TableInput {
    fn members(&self) -> Vec<BoundMember> {
        vec![BoundMember::new(
            FieldLocation::Body,
            "TableName",
            MemberValue::Scalar(self.table_name.clone()),
        )]
    }
}

const PUT_ITEM: fn() -> OperationDescriptor = || OperationDescriptor::new("PutItem", "POST", "/");

#[tokio::test]
async fn requests_are_signed_and_dispatched() {
    let transport = Arc::new(MockTransport::with_responses([MockResponse::ok_with_body(
        &br#"{}"#[..],
    )]));
    let client = client_with(json_config(), transport.clone());

    let input = TableInput {
        table_name: "T".into(),
    };
    let _: EmptyOutput = client.execute(&PUT_ITEM(), &input).await.unwrap();

    let recorded = transport.requests();
    assert_eq!(recorded.len(), 1);
    let request = &recorded[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.header("x-amz-target"), Some("DynamoDB_20120810.PutItem"));
    assert!(request.header("x-amz-date").is_some());
    assert!(request
        .header("authorization")
        .unwrap()
        .starts_with("AWS4-HMAC-SHA256 Credential=AKID/"));
    assert_eq!(request.body.as_ref(), br#"{"TableName":"T"}"#);
}

#[tokio::test]
async fn empty_credentials_skip_signing() {
    let transport = Arc::new(MockTransport::with_responses([MockResponse::ok()]));
    let client = AwsClient::builder()
        .config(json_config())
        .transport(transport.clone())
        .credentials(Arc::new(StaticCredentialsProvider::new(
            AwsCredentials::anonymous(),
        )))
        .build()
        .unwrap();

    let _: EmptyOutput = client.execute(&PUT_ITEM(), &EmptyInput).await.unwrap();

    let recorded = transport.requests();
    assert!(recorded[0].header("authorization").is_none());
    assert!(recorded[0].header("x-amz-date").is_none());
}

#[tokio::test]
async fn transient_errors_retry_up_to_the_bound() {
    let transport = Arc::new(
        MockTransport::new().with_default_response(MockResponse::error(
            500,
            &br#"{"__type":"InternalFailure","message":"boom"}"#[..],
        )),
    );
    let client = client_with(json_config(), transport.clone());

    let err = client
        .execute::<_, EmptyOutput>(&PUT_ITEM(), &EmptyInput)
        .await
        .unwrap_err();

    assert!(matches!(err, AwsError::Http(ref e) if e.status == 500));
    assert_eq!(transport.request_count(), 4);
}

#[tokio::test]
async fn client_errors_do_not_retry() {
    let transport = Arc::new(
        MockTransport::new().with_default_response(MockResponse::error(
            400,
            &br#"{"__type":"InvalidSignatureException","message":"nope"}"#[..],
        )),
    );
    let client = client_with(json_config(), transport.clone());

    let err = client
        .execute::<_, EmptyOutput>(&PUT_ITEM(), &EmptyInput)
        .await
        .unwrap_err();

    assert!(matches!(err, AwsError::Http(ref e) if e.code == "InvalidSignatureException"));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn throttles_retry_and_eventually_succeed() {
    let transport = Arc::new(MockTransport::with_responses([
        MockResponse::error(429, &br#"{"__type":"ThrottlingException"}"#[..])
            .with_header("retry-after", "0"),
        MockResponse::ok(),
    ]));
    let client = client_with(json_config(), transport.clone());

    let _: EmptyOutput = client.execute(&PUT_ITEM(), &EmptyInput).await.unwrap();
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn metrics_count_requests_and_errors() {
    let transport = Arc::new(MockTransport::with_responses([
        MockResponse::ok(),
        MockResponse::error(404, &br#"{"__type":"ResourceNotFoundException"}"#[..]),
    ]));
    let client = client_with(json_config(), transport);

    let _: EmptyOutput = client.execute(&PUT_ITEM(), &EmptyInput).await.unwrap();
    let _ = client
        .execute::<_, EmptyOutput>(&PUT_ITEM(), &EmptyInput)
        .await
        .unwrap_err();

    let snapshot = client.metrics();
    assert_eq!(snapshot.requests.get("PutItem"), Some(&2));
    assert_eq!(snapshot.errors.get("PutItem"), Some(&1));
    assert_eq!(snapshot.durations.get("PutItem").unwrap().count, 2);
}

#[tokio::test]
async fn http_errors_carry_the_request_id() {
    let transport = Arc::new(MockTransport::with_responses([MockResponse::error(
        404,
        &br#"{"__type":"ResourceNotFoundException","message":"missing"}"#[..],
    )
    .with_header("x-amzn-requestid", "REQ-42")]));
    let client = client_with(json_config(), transport);

    let err = client
        .execute::<_, EmptyOutput>(&PUT_ITEM(), &EmptyInput)
        .await
        .unwrap_err();

    assert_eq!(err.request_id(), Some("REQ-42"));
}

#[tokio::test]
async fn cancelled_token_stops_before_dispatch() {
    let transport = Arc::new(MockTransport::new().with_default_response(MockResponse::ok()));
    let client = client_with(json_config(), transport.clone());

    let token = CancellationToken::new();
    token.cancel();

    let err = client
        .execute_cancellable::<_, EmptyOutput>(&PUT_ITEM(), &EmptyInput, &token)
        .await
        .unwrap_err();

    assert!(matches!(err, AwsError::Cancelled));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn shutdown_is_idempotent_and_blocks_new_calls() {
    let transport = Arc::new(MockTransport::new().with_default_response(MockResponse::ok()));
    let client = client_with(json_config(), transport);

    client.shutdown().await.unwrap();
    assert!(matches!(
        client.shutdown().await.unwrap_err(),
        AwsError::AlreadyShutdown
    ));

    let err = client
        .execute::<_, EmptyOutput>(&PUT_ITEM(), &EmptyInput)
        .await
        .unwrap_err();
    assert!(matches!(err, AwsError::AlreadyShutdown));
}

struct StreamInput {
    payload: Arc<PayloadStream>,
}

impl OperationInput for StreamInput {
    fn members(&self) -> Vec<BoundMember> {
        Vec::new()
    }

    fn payload(&self) -> Option<PayloadMember> {
        Some(PayloadMember::Raw(AwsPayload::Stream(self.payload.clone())))
    }
}

fn s3_config() -> ServiceConfig {
    ServiceConfig::builder()
        .service("s3")
        .region("us-east-1")
        .protocol(Protocol::RestXml)
        .endpoint("https://examplebucket.s3.amazonaws.com")
        .retry(fast_retry(4))
        .build()
        .unwrap()
}

fn upload_op() -> OperationDescriptor {
    OperationDescriptor::new("PutObject", "PUT", "/{Key}")
        .with_payload_member("Body")
        .with_flags(OperationFlags {
            allow_streaming: true,
            allow_chunked_streaming: true,
            ..Default::default()
        })
}

fn stream_op() -> OperationDescriptor {
    OperationDescriptor::new("PutObject", "PUT", "/obj")
        .with_payload_member("Body")
        .with_flags(OperationFlags {
            allow_streaming: true,
            allow_chunked_streaming: true,
            ..Default::default()
        })
}

struct UploadInput {
    key: String,
    payload: Arc<PayloadStream>,
}

impl OperationInput for UploadInput {
    fn members(&self) -> Vec<BoundMember> {
        vec![BoundMember::new(
            FieldLocation::Uri,
            "Key",
            MemberValue::Scalar(self.key.clone()),
        )]
    }

    fn payload(&self) -> Option<PayloadMember> {
        Some(PayloadMember::Raw(AwsPayload::Stream(self.payload.clone())))
    }
}

#[tokio::test]
async fn chunked_upload_goes_out_framed() {
    let transport = Arc::new(MockTransport::with_responses([MockResponse::ok()]));
    let client = client_with(s3_config(), transport.clone());

    let data = vec![b'x'; 100 * 1024];
    let payload = Arc::new(PayloadStream::sized(
        Box::new(BufferChunkRead::new(data)),
        100 * 1024,
    ));
    let input = UploadInput {
        key: "obj".into(),
        payload,
    };

    let _: EmptyOutput = client.execute(&upload_op(), &input).await.unwrap();

    let recorded = transport.requests();
    assert_eq!(recorded.len(), 1);
    let request = &recorded[0];
    assert!(request.streamed);
    assert_eq!(request.header("content-encoding"), Some("aws-chunked"));
    assert_eq!(
        request.header("x-amz-content-sha256"),
        Some("STREAMING-AWS4-HMAC-SHA256-PAYLOAD")
    );
    assert_eq!(request.header("x-amz-decoded-content-length"), Some("102400"));
    // The collected wire bytes end with the zero-length terminator frame.
    let body = &request.body;
    let tail = &body[body.len() - 86..];
    assert!(tail.starts_with(b"0;chunk-signature="));
    assert_eq!(
        request.header("content-length").unwrap(),
        body.len().to_string()
    );
}

#[tokio::test]
async fn streaming_bodies_never_retry() {
    let transport = Arc::new(
        MockTransport::new().with_default_response(MockResponse::error(
            500,
            &b"<Error><Code>InternalError</Code><Message>boom</Message></Error>"[..],
        )),
    );
    let client = client_with(s3_config(), transport.clone());

    let payload = Arc::new(PayloadStream::sized(
        Box::new(BufferChunkRead::new(&b"data"[..])),
        4,
    ));
    let input = StreamInput { payload };

    let err = client
        .execute::<_, EmptyOutput>(&stream_op(), &input)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn unknown_size_stream_requires_chunked_support() {
    let transport = Arc::new(MockTransport::new().with_default_response(MockResponse::ok()));
    let client = client_with(s3_config(), transport.clone());

    let payload = Arc::new(PayloadStream::unsized_reader(Box::new(BufferChunkRead::new(
        &b"data"[..],
    ))));
    let input = StreamInput { payload };

    let err = client
        .execute::<_, EmptyOutput>(&stream_op(), &input)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AwsError::Request(aws_core::error::RequestError::MissingContentLength)
    ));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn disabled_chunking_sends_unsigned_payload() {
    let config = ServiceConfig::builder()
        .service("s3")
        .region("us-east-1")
        .protocol(Protocol::RestXml)
        .endpoint("https://examplebucket.s3.amazonaws.com")
        .s3_disable_chunked_uploads(true)
        .retry(fast_retry(1))
        .build()
        .unwrap();
    let transport = Arc::new(MockTransport::with_responses([MockResponse::ok()]));
    let client = client_with(config, transport.clone());

    let payload = Arc::new(PayloadStream::sized(
        Box::new(BufferChunkRead::new(&b"plain bytes"[..])),
        11,
    ));
    let input = StreamInput { payload };

    let _: EmptyOutput = client.execute(&stream_op(), &input).await.unwrap();

    let recorded = transport.requests();
    let request = &recorded[0];
    assert_eq!(request.header("x-amz-content-sha256"), Some("UNSIGNED-PAYLOAD"));
    assert_eq!(request.header("content-length"), Some("11"));
    assert_eq!(request.body.as_ref(), b"plain bytes");
}

// Pagination over a JSON list operation.

#[derive(Clone)]
struct ListInput {
    token: Option<String>,
}

impl OperationInput for ListInput {
    fn members(&self) -> Vec<BoundMember> {
        match &self.token {
            Some(token) => vec![BoundMember::new(
                FieldLocation::Body,
                "NextToken",
                MemberValue::Scalar(token.clone()),
            )],
            None => Vec::new(),
        }
    }
}

impl PageableInput for ListInput {
    fn with_token(&self, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
        }
    }
}

struct ListOutput {
    items: Vec<String>,
    next_token: Option<String>,
}

impl OperationOutput for ListOutput {
    fn decode(response: aws_core::DecodedResponse) -> Result<Self, AwsError> {
        let document = response.document()?;
        let items = document
            .get("Items")
            .and_then(|v| v.as_list())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        let next_token = document
            .get("NextToken")
            .and_then(|v| v.as_str())
            .map(String::from);
        Ok(Self { items, next_token })
    }
}

impl PageableOutput for ListOutput {
    type Item = String;

    fn next_token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }

    fn into_items(self) -> Vec<String> {
        self.items
    }
}

const LIST_OP: fn() -> OperationDescriptor =
    || OperationDescriptor::new("ListTables", "POST", "/");

#[tokio::test]
async fn pagination_follows_tokens_and_flattens() {
    let transport = Arc::new(MockTransport::with_responses([
        MockResponse::ok_with_body(&br#"{"Items":["a","b"],"NextToken":"t1"}"#[..]),
        MockResponse::ok_with_body(&br#"{"Items":["c"],"NextToken":"t2"}"#[..]),
        MockResponse::ok_with_body(&br#"{"Items":["d"]}"#[..]),
    ]));
    let client = client_with(json_config(), transport.clone());

    let items = client
        .paginate::<ListInput, ListOutput>(&LIST_OP(), ListInput { token: None }, 100)
        .await
        .unwrap();

    assert_eq!(items, vec!["a", "b", "c", "d"]);
    assert_eq!(transport.request_count(), 3);

    // The second request carried the first page's token.
    let bodies: Vec<String> = transport
        .requests()
        .iter()
        .map(|r| String::from_utf8_lossy(&r.body).to_string())
        .collect();
    assert!(bodies[1].contains("t1"));
    assert!(bodies[2].contains("t2"));
}

#[tokio::test]
async fn pagination_stops_on_empty_token() {
    let transport = Arc::new(MockTransport::with_responses([MockResponse::ok_with_body(
        &br#"{"Items":["only"],"NextToken":""}"#[..],
    )]));
    let client = client_with(json_config(), transport.clone());

    let items = client
        .paginate::<ListInput, ListOutput>(&LIST_OP(), ListInput { token: None }, 100)
        .await
        .unwrap();

    assert_eq!(items, vec!["only"]);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn pagination_enforces_the_page_bound() {
    let transport = Arc::new(MockTransport::new().with_default_response(
        MockResponse::ok_with_body(&br#"{"Items":["x"],"NextToken":"again"}"#[..]),
    ));
    let client = client_with(json_config(), transport.clone());

    let err = client
        .paginate::<ListInput, ListOutput>(&LIST_OP(), ListInput { token: None }, 3)
        .await
        .unwrap_err();

    assert!(matches!(err, AwsError::PaginationLimit { pages: 3 }));
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn pagination_failures_are_terminal() {
    let transport = Arc::new(MockTransport::with_responses([
        MockResponse::ok_with_body(&br#"{"Items":["a"],"NextToken":"t1"}"#[..]),
        MockResponse::error(400, &br#"{"__type":"ValidationException"}"#[..]),
    ]));
    let client = client_with(json_config(), transport.clone());

    let err = client
        .paginate::<ListInput, ListOutput>(&LIST_OP(), ListInput { token: None }, 100)
        .await
        .unwrap_err();

    assert!(matches!(err, AwsError::Http(_)));
    assert_eq!(transport.request_count(), 2);
}
