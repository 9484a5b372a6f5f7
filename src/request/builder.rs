//! One-shot transformation `(operation, input, config) -> AwsRequest`.

use super::body::{encode_json_body, encode_query_body, encode_xml_body};
use super::{AwsBody, AwsPayload, AwsRequest};
use crate::checksum;
use crate::config::{Protocol, ServiceConfig};
use crate::error::{AwsError, RequestError};
use crate::operation::{
    BoundMember, Document, FieldLocation, MemberValue, OperationDescriptor, OperationInput,
    PayloadMember,
};
use crate::signing::{uri_encode_path, uri_encode_strict};
use url::Url;

/// Build the logical request for one operation call.
pub fn build_request(
    operation: &OperationDescriptor,
    input: &dyn OperationInput,
    config: &ServiceConfig,
) -> Result<AwsRequest, AwsError> {
    input.validate()?;

    let mut headers: Vec<(String, String)> = Vec::new();
    if let Some(prefix) = &config.amz_target {
        headers.push((
            "x-amz-target".to_string(),
            format!("{}.{}", prefix, operation.name),
        ));
    }

    let mut path = operation.path.to_string();
    let mut query: Vec<(String, String)> = Vec::new();
    let mut host_prefix = operation.host_prefix.map(str::to_string);
    let mut body_doc = Document::map();

    for member in input.members() {
        distribute_member(
            &member,
            &mut headers,
            &mut path,
            &mut query,
            &mut host_prefix,
            &mut body_doc,
        )?;
    }

    if path.contains('{') {
        return Err(AwsError::Request(RequestError::Unencodable {
            member: path,
            details: "unresolved path placeholder".into(),
        }));
    }
    if let Some(prefix) = &host_prefix {
        if prefix.contains('{') {
            return Err(AwsError::Request(RequestError::Unencodable {
                member: prefix.clone(),
                details: "unresolved host prefix placeholder".into(),
            }));
        }
    }

    // Query items embedded in the path template merge into the query list.
    if let Some(idx) = path.find('?') {
        let raw = path.split_off(idx);
        for pair in raw[1..].split('&').filter(|s| !s.is_empty()) {
            let mut parts = pair.splitn(2, '=');
            query.push((
                parts.next().unwrap_or("").to_string(),
                parts.next().unwrap_or("").to_string(),
            ));
        }
    }

    let body = build_body(operation, input, config, body_doc)?;
    let url = compose_url(config, host_prefix.as_deref(), &path, &query)?;

    let mut request = AwsRequest::new(operation.method, url, operation.name, body);
    request.protocol = config.protocol;
    request.region = config.region.clone();
    for (name, value) in headers {
        request.set_header(&name, value);
    }

    checksum::apply_checksum(operation, config, &mut request);
    add_standard_headers(&mut request, config);

    Ok(request)
}

fn distribute_member(
    member: &BoundMember,
    headers: &mut Vec<(String, String)>,
    path: &mut String,
    query: &mut Vec<(String, String)>,
    host_prefix: &mut Option<String>,
    body_doc: &mut Document,
) -> Result<(), AwsError> {
    match member.location {
        FieldLocation::Header => {
            let value = scalar_value(member)?;
            headers.push((member.name.to_lowercase(), value));
        }
        FieldLocation::HeaderPrefix => match &member.value {
            MemberValue::Map(entries) => {
                for (key, value) in entries {
                    headers.push((format!("{}{}", member.name, key).to_lowercase(), value.clone()));
                }
            }
            _ => return Err(unencodable(member, "header prefix members must be maps")),
        },
        FieldLocation::Query => match &member.value {
            MemberValue::Scalar(value) => query.push((member.name.clone(), value.clone())),
            MemberValue::List(values) => {
                for value in values {
                    query.push((member.name.clone(), value.clone()));
                }
            }
            MemberValue::Map(entries) => {
                for (key, value) in entries {
                    query.push((key.clone(), value.clone()));
                }
            }
            MemberValue::Document(_) => {
                return Err(unencodable(member, "structured values cannot join the query"))
            }
        },
        FieldLocation::Uri => {
            let value = scalar_value(member)?;
            let placeholder = format!("{{{}}}", member.name);
            if !path.contains(&placeholder) {
                return Err(unencodable(member, "no matching path placeholder"));
            }
            *path = path.replace(&placeholder, &uri_encode_strict(&value));
        }
        FieldLocation::UriGreedy => {
            let value = scalar_value(member)?;
            let placeholder = format!("{{{}+}}", member.name);
            if !path.contains(&placeholder) {
                return Err(unencodable(member, "no matching path placeholder"));
            }
            *path = path.replace(&placeholder, &uri_encode_path(&value));
        }
        FieldLocation::Hostname => {
            let value = scalar_value(member)?;
            let placeholder = format!("{{{}}}", member.name);
            match host_prefix {
                Some(prefix) if prefix.contains(&placeholder) => {
                    *prefix = prefix.replace(&placeholder, &value);
                }
                _ => return Err(unencodable(member, "no matching host prefix placeholder")),
            }
        }
        FieldLocation::Body => {
            let value = match &member.value {
                MemberValue::Scalar(s) => Document::String(s.clone()),
                MemberValue::List(items) => {
                    Document::List(items.iter().map(|s| Document::String(s.clone())).collect())
                }
                MemberValue::Map(entries) => Document::Map(
                    entries
                        .iter()
                        .map(|(k, v)| (k.clone(), Document::String(v.clone())))
                        .collect(),
                ),
                MemberValue::Document(doc) => doc.clone(),
            };
            body_doc.insert(member.name.clone(), value);
        }
    }
    Ok(())
}

fn scalar_value(member: &BoundMember) -> Result<String, AwsError> {
    match &member.value {
        MemberValue::Scalar(value) => Ok(value.clone()),
        _ => Err(unencodable(member, "expected a scalar value")),
    }
}

fn unencodable(member: &BoundMember, details: &str) -> AwsError {
    AwsError::Request(RequestError::Unencodable {
        member: member.name.clone(),
        details: details.into(),
    })
}

fn build_body(
    operation: &OperationDescriptor,
    input: &dyn OperationInput,
    config: &ServiceConfig,
    body_doc: Document,
) -> Result<AwsBody, AwsError> {
    if operation.payload_member.is_some() {
        match input.payload() {
            Some(PayloadMember::Raw(payload)) => return Ok(AwsBody::Raw(payload)),
            Some(PayloadMember::Shape { root, document }) => {
                return match config.protocol {
                    Protocol::RestXml => {
                        // An absent payload shape means an empty body, not a
                        // self-closing root element.
                        if document.is_empty() {
                            return Ok(AwsBody::Empty);
                        }
                        let root = root
                            .or_else(|| operation.payload_member.map(str::to_string))
                            .unwrap_or_else(|| operation.name.to_string());
                        Ok(AwsBody::Xml(encode_xml_body(
                            &document,
                            &root,
                            config.xml_namespace.as_deref(),
                        )?))
                    }
                    _ => Ok(AwsBody::Json(encode_json_body(&document)?)),
                };
            }
            None => return Ok(AwsBody::Empty),
        }
    }

    match config.protocol {
        Protocol::Json(_) | Protocol::RestJson => {
            if body_doc.is_empty() {
                if matches!(operation.method, "PUT" | "POST") {
                    Ok(AwsBody::Json(bytes::Bytes::from_static(b"{}")))
                } else {
                    Ok(AwsBody::Empty)
                }
            } else {
                Ok(AwsBody::Json(encode_json_body(&body_doc)?))
            }
        }
        Protocol::RestXml => {
            if body_doc.is_empty() {
                Ok(AwsBody::Empty)
            } else {
                Ok(AwsBody::Xml(encode_xml_body(
                    &body_doc,
                    operation.name,
                    config.xml_namespace.as_deref(),
                )?))
            }
        }
        Protocol::Query | Protocol::Ec2Query => Ok(AwsBody::Text(encode_query_body(
            operation.name,
            &config.api_version,
            &body_doc,
            matches!(config.protocol, Protocol::Ec2Query),
        )?)),
    }
}

fn compose_url(
    config: &ServiceConfig,
    host_prefix: Option<&str>,
    path: &str,
    query: &[(String, String)],
) -> Result<Url, AwsError> {
    let endpoint = &config.endpoint;
    let host = endpoint.host_str().ok_or_else(|| {
        AwsError::Request(RequestError::InvalidUrl {
            url: endpoint.to_string(),
            details: "endpoint has no host".into(),
        })
    })?;

    let host = match host_prefix {
        Some(prefix) => format!("{}{}", prefix, host),
        None => host.to_string(),
    };
    let authority = match endpoint.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    };

    let base_path = endpoint.path().trim_end_matches('/');
    let path = if path.starts_with('/') || path.is_empty() {
        path
    } else {
        return Err(AwsError::Request(RequestError::InvalidUrl {
            url: path.to_string(),
            details: "operation path must start with '/'".into(),
        }));
    };
    let full_path = if path.is_empty() && base_path.is_empty() {
        "/".to_string()
    } else {
        format!("{}{}", base_path, if path.is_empty() { "/" } else { path })
    };

    // Sort encoded pairs by (key, value) and assign the percent-encoded
    // query directly; nothing downstream re-encodes it.
    let query_part = if query.is_empty() {
        String::new()
    } else {
        let mut encoded: Vec<(String, String)> = query
            .iter()
            .map(|(k, v)| (uri_encode_strict(k), uri_encode_strict(v)))
            .collect();
        encoded.sort();
        let joined = encoded
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("?{}", joined)
    };

    let url_str = format!(
        "{}://{}{}{}",
        endpoint.scheme(),
        authority,
        full_path,
        query_part
    );
    let url = Url::parse(&url_str).map_err(|e| {
        AwsError::Request(RequestError::InvalidUrl {
            url: url_str.clone(),
            details: e.to_string(),
        })
    })?;
    if url.host_str().is_none() {
        return Err(AwsError::Request(RequestError::InvalidUrl {
            url: url_str,
            details: "composed URL has no host".into(),
        }));
    }
    Ok(url)
}

fn add_standard_headers(request: &mut AwsRequest, config: &ServiceConfig) {
    if request.header("user-agent").is_none() {
        request.set_header(
            "user-agent",
            format!("aws-core/{}", env!("CARGO_PKG_VERSION")),
        );
    }

    let is_bodyless_method = matches!(request.method.as_str(), "GET" | "HEAD");

    if let Some(bytes) = request.body.as_bytes() {
        if !bytes.is_empty() && request.header("content-length").is_none() {
            request.set_header("content-length", bytes.len().to_string());
        }
    }

    if request.header("content-type").is_none()
        && !is_bodyless_method
        && !request.body.is_empty()
    {
        let content_type = match (&request.body, config.protocol) {
            (AwsBody::Raw(AwsPayload::Bytes(_)), Protocol::RestJson)
            | (AwsBody::Raw(AwsPayload::Stream(_)), Protocol::RestJson) => "binary/octet-stream",
            _ => config.protocol.content_type(),
        };
        request.set_header("content-type", content_type);
    }
}
