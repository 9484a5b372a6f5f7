//! Canonical request building for AWS Signature V4.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters that survive percent-encoding in URI paths (`/` preserved).
pub const URI_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Characters that survive percent-encoding in query strings and path
/// components. Everything else, `/` and `+` included, becomes `%HH`.
pub const STRICT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a path, preserving `/`.
pub fn uri_encode_path(path: &str) -> String {
    utf8_percent_encode(path, URI_PATH_SET).to_string()
}

/// Percent-encode a query key or value with the strict allowed set.
pub fn uri_encode_strict(value: &str) -> String {
    utf8_percent_encode(value, STRICT_SET).to_string()
}

/// Build the canonical URI from the request path.
///
/// The incoming path is already percent-encoded once by the request builder.
/// S3 uses it verbatim; every other service applies a second encoding pass
/// over the encoded form.
pub fn canonical_uri(path: &str, double_encode: bool) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    if double_encode {
        uri_encode_path(path)
    } else {
        path.to_string()
    }
}

/// Build the canonical query string from the raw query of the URL.
///
/// Each key and value is normalized to the strict encoding (decode, then
/// re-encode), pairs are sorted by `(key, value)`, and joined with `&` and
/// `=`. A key without a value canonicalizes to `key=`.
pub fn canonical_query_string(raw_query: Option<&str>) -> String {
    let raw = match raw_query {
        Some(q) if !q.is_empty() => q,
        _ => return String::new(),
    };

    let mut params: Vec<(String, String)> = raw
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("");
            (
                uri_encode_strict(&percent_decode_str(key).decode_utf8_lossy()),
                uri_encode_strict(&percent_decode_str(value).decode_utf8_lossy()),
            )
        })
        .collect();

    params.sort();

    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Normalize a header value: trim, and collapse internal whitespace runs to
/// a single space except inside double-quoted strings.
pub fn normalize_header_value(value: &str) -> String {
    let trimmed = value.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut in_quotes = false;
    let mut pending_space = false;

    for c in trimmed.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        }
        if !in_quotes && (c == ' ' || c == '\t') {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }

    out
}

/// Build the canonical headers block: lowercased names, normalized values,
/// sorted by name, each terminated by a newline. Only signable headers
/// participate.
pub fn canonical_headers(headers: &[(String, String)]) -> String {
    let mut entries: Vec<(String, String)> = headers
        .iter()
        .filter(|(name, _)| super::should_sign_header(name))
        .map(|(name, value)| (name.to_lowercase(), normalize_header_value(value)))
        .collect();

    entries.sort();

    entries
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect()
}

/// Build the signed headers list: sorted, lowercased, `;`-joined names.
pub fn signed_headers(headers: &[(String, String)]) -> String {
    let mut names: Vec<String> = headers
        .iter()
        .filter(|(name, _)| super::should_sign_header(name))
        .map(|(name, _)| name.to_lowercase())
        .collect();

    names.sort();
    names.dedup();
    names.join(";")
}

/// Build the canonical request string.
///
/// ```text
/// HTTPMethod\n
/// CanonicalURI\n
/// CanonicalQueryString\n
/// CanonicalHeaders\n
/// SignedHeaders\n
/// HashedPayload
/// ```
pub fn canonical_request(
    method: &str,
    path: &str,
    raw_query: Option<&str>,
    headers: &[(String, String)],
    payload_hash: &str,
    double_encode: bool,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        canonical_uri(path, double_encode),
        canonical_query_string(raw_query),
        canonical_headers(headers),
        signed_headers(headers),
        payload_hash
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_encode_path() {
        assert_eq!(uri_encode_path("/"), "/");
        assert_eq!(uri_encode_path("/foo/bar"), "/foo/bar");
        assert_eq!(uri_encode_path("/foo bar/baz"), "/foo%20bar/baz");
        assert_eq!(uri_encode_path("/a%20b"), "/a%2520b");
    }

    #[test]
    fn test_uri_encode_strict() {
        assert_eq!(uri_encode_strict("foo"), "foo");
        assert_eq!(uri_encode_strict("foo bar"), "foo%20bar");
        assert_eq!(uri_encode_strict("foo=bar"), "foo%3Dbar");
        assert_eq!(uri_encode_strict("a/b"), "a%2Fb");
        assert_eq!(uri_encode_strict("a+b"), "a%2Bb");
    }

    #[test]
    fn test_canonical_uri() {
        assert_eq!(canonical_uri("", true), "/");
        assert_eq!(canonical_uri("/", true), "/");
        // Single-encode mode passes the path through verbatim.
        assert_eq!(canonical_uri("/a%2Fb", false), "/a%2Fb");
        // Double-encode mode re-encodes the percent signs.
        assert_eq!(canonical_uri("/a%2Fb", true), "/a%252Fb");
    }

    #[test]
    fn test_canonical_query_string() {
        assert_eq!(canonical_query_string(None), "");
        assert_eq!(canonical_query_string(Some("")), "");
        assert_eq!(canonical_query_string(Some("a=1")), "a=1");
        assert_eq!(canonical_query_string(Some("b=2&a=1")), "a=1&b=2");
        assert_eq!(canonical_query_string(Some("a=2&a=1")), "a=1&a=2");
        assert_eq!(canonical_query_string(Some("key")), "key=");
        assert_eq!(
            canonical_query_string(Some("prefix=CI/&x=a b")),
            "prefix=CI%2F&x=a%20b"
        );
    }

    #[test]
    fn test_normalize_header_value() {
        assert_eq!(normalize_header_value("  a  b  "), "a b");
        assert_eq!(normalize_header_value("a\t\tb"), "a b");
        assert_eq!(normalize_header_value("\"a  b\""), "\"a  b\"");
        assert_eq!(normalize_header_value("x \"a  b\" y"), "x \"a  b\" y");
    }

    #[test]
    fn test_canonical_headers_sorted_and_filtered() {
        let headers = vec![
            ("X-Amz-Date".to_string(), "20231215T103045Z".to_string()),
            ("Host".to_string(), "example.com".to_string()),
            ("User-Agent".to_string(), "ignored".to_string()),
        ];

        assert_eq!(
            canonical_headers(&headers),
            "host:example.com\nx-amz-date:20231215T103045Z\n"
        );
        assert_eq!(signed_headers(&headers), "host;x-amz-date");
    }

    #[test]
    fn test_canonical_request_shape() {
        let headers = vec![
            ("Host".to_string(), "examplebucket.s3.amazonaws.com".to_string()),
            ("X-Amz-Date".to_string(), "20231215T103045Z".to_string()),
        ];

        let creq = canonical_request(
            "get",
            "/test.txt",
            None,
            &headers,
            crate::signing::EMPTY_STRING_SHA256,
            false,
        );

        assert!(creq.starts_with("GET\n/test.txt\n\n"));
        assert!(creq.ends_with(crate::signing::EMPTY_STRING_SHA256));
    }
}
