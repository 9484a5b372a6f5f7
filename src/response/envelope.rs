//! Protocol error envelopes.
//!
//! Non-2xx responses carry a protocol-specific envelope:
//! - REST-JSON / JSON: an `x-amzn-errortype` header or a JSON body with
//!   `__type` / `code` and `message` fields.
//! - REST-XML: an `<Error><Code>..<Message>..</Error>` element, at the root
//!   or nested.
//! - Query: `<ErrorResponse><Error>..</Error></ErrorResponse>`.

use super::xml::parse_xml;
use crate::config::Protocol;
use crate::error::HttpError;
use crate::operation::Document;
use crate::transport::HttpResponse;

/// Parse the error envelope of a failed response into an [`HttpError`].
///
/// Unknown or malformed envelopes degrade to an error carrying the raw
/// status and a best-effort message; parsing never fails.
pub fn parse_error_envelope(response: &HttpResponse, protocol: Protocol) -> HttpError {
    let mut code = None;
    let mut message = None;
    let mut request_id = response.request_id().map(String::from);

    match protocol {
        Protocol::Json(_) | Protocol::RestJson => {
            if let Some(header) = response.header("x-amzn-errortype") {
                code = Some(sanitize_code(header));
            }
            if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&response.body) {
                let doc = Document::from(value);
                if code.is_none() {
                    code = first_string(&doc, &["__type", "code", "Code"]).map(|s| sanitize_code(&s));
                }
                message = first_string(&doc, &["message", "Message"]);
                if request_id.is_none() {
                    request_id = first_string(&doc, &["RequestId", "requestId"]);
                }
            }
        }
        Protocol::RestXml | Protocol::Query | Protocol::Ec2Query => {
            if let Ok((root, content)) = parse_xml(&response.body) {
                let error = if root == "Error" {
                    Some(&content)
                } else {
                    find_error_element(&content)
                };
                if let Some(error) = error {
                    code = first_string(error, &["Code"]);
                    message = first_string(error, &["Message"]);
                    if request_id.is_none() {
                        request_id = first_string(error, &["RequestId"])
                            .or_else(|| first_string(&content, &["RequestId"]));
                    }
                }
            }
        }
    }

    HttpError {
        status: response.status,
        code: code.unwrap_or_else(|| default_code(response.status).to_string()),
        message: message.unwrap_or_else(|| {
            String::from_utf8_lossy(&response.body)
                .chars()
                .take(256)
                .collect()
        }),
        request_id,
        retry_after: response.retry_after(),
    }
}

/// Locate an `<Error>` element one or two levels down (`<ErrorResponse>`
/// wrapping included).
fn find_error_element(content: &Document) -> Option<&Document> {
    if let Some(error) = content.get("Error") {
        return Some(error);
    }
    content
        .as_map()?
        .iter()
        .find_map(|(_, child)| child.get("Error"))
}

fn first_string(doc: &Document, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| doc.get(key))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Strip the namespace prefix and any `:http...` suffix from a JSON error
/// type: `com.amazon#ThrottlingException:http://...` -> `ThrottlingException`.
fn sanitize_code(raw: &str) -> String {
    let after_hash = raw.rsplit('#').next().unwrap_or(raw);
    after_hash
        .split(':')
        .next()
        .unwrap_or(after_hash)
        .to_string()
}

fn default_code(status: u16) -> &'static str {
    match status {
        404 => "NotFound",
        429 => "TooManyRequests",
        s if (500..600).contains(&s) => "InternalError",
        _ => "UnknownError",
    }
}
