//! Protocol body encoders.
//!
//! All three structured encodings render from the same ordered [`Document`]
//! tree: JSON via serde, XML via quick-xml, and the query protocols via
//! flattened form-urlencoded pairs.

use crate::error::{AwsError, RequestError};
use crate::operation::Document;
use crate::signing::uri_encode_strict;
use bytes::Bytes;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Encode a document as JSON bytes, preserving member order.
pub fn encode_json_body(document: &Document) -> Result<Bytes, AwsError> {
    serde_json::to_vec(document)
        .map(Bytes::from)
        .map_err(|e| {
            AwsError::Request(RequestError::Unencodable {
                member: "body".into(),
                details: e.to_string(),
            })
        })
}

/// Encode a document as XML bytes under `root`, optionally stamped with a
/// namespace. List items serialize as repeated `<member>` elements.
pub fn encode_xml_body(
    document: &Document,
    root: &str,
    xmlns: Option<&str>,
) -> Result<Bytes, AwsError> {
    let mut writer = Writer::new(Vec::new());

    let mut start = BytesStart::new(root);
    if let Some(ns) = xmlns {
        start.push_attribute(("xmlns", ns));
    }
    write_event(&mut writer, Event::Start(start))?;
    write_xml_value(&mut writer, document)?;
    write_event(&mut writer, Event::End(BytesEnd::new(root)))?;

    Ok(Bytes::from(writer.into_inner()))
}

fn write_xml_value(writer: &mut Writer<Vec<u8>>, value: &Document) -> Result<(), AwsError> {
    match value {
        Document::Null => Ok(()),
        Document::Map(entries) => {
            for (name, child) in entries {
                if matches!(child, Document::Null) {
                    continue;
                }
                write_event(writer, Event::Start(BytesStart::new(name.as_str())))?;
                write_xml_value(writer, child)?;
                write_event(writer, Event::End(BytesEnd::new(name.as_str())))?;
            }
            Ok(())
        }
        Document::List(items) => {
            for item in items {
                write_event(writer, Event::Start(BytesStart::new("member")))?;
                write_xml_value(writer, item)?;
                write_event(writer, Event::End(BytesEnd::new("member")))?;
            }
            Ok(())
        }
        scalar => {
            let text = scalar.scalar_string().unwrap_or_default();
            write_event(writer, Event::Text(BytesText::new(&text)))
        }
    }
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), AwsError> {
    writer.write_event(event).map_err(|e| {
        AwsError::Request(RequestError::Unencodable {
            member: "body".into(),
            details: e.to_string(),
        })
    })
}

/// Encode a query-protocol body: `Action`, `Version`, and the flattened
/// members, sorted by key and form-urlencoded.
///
/// The EC2 variant flattens lists as `Name.N`; the plain query protocol
/// uses `Name.member.N`. Maps flatten as `Name.N.Name` / `Name.N.Value`.
pub fn encode_query_body(
    action: &str,
    version: &str,
    document: &Document,
    ec2: bool,
) -> Result<String, AwsError> {
    let mut pairs: Vec<(String, String)> = vec![
        ("Action".to_string(), action.to_string()),
        ("Version".to_string(), version.to_string()),
    ];
    flatten_query(document, "", ec2, &mut pairs)?;

    pairs.sort();

    Ok(pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                uri_encode_strict(k),
                uri_encode_strict(v)
            )
        })
        .collect::<Vec<_>>()
        .join("&"))
}

fn flatten_query(
    value: &Document,
    prefix: &str,
    ec2: bool,
    pairs: &mut Vec<(String, String)>,
) -> Result<(), AwsError> {
    match value {
        Document::Null => Ok(()),
        Document::Map(entries) => {
            // At the top level, map entries are the members themselves; below
            // it, a map flattens into numbered Name/Value pairs.
            if prefix.is_empty() {
                for (name, child) in entries {
                    flatten_member(child, name, ec2, pairs)?;
                }
                Ok(())
            } else {
                for (index, (key, child)) in entries.iter().enumerate() {
                    let n = index + 1;
                    pairs.push((format!("{}.{}.Name", prefix, n), key.clone()));
                    match child.scalar_string() {
                        Some(text) => {
                            pairs.push((format!("{}.{}.Value", prefix, n), text));
                        }
                        None => {
                            flatten_query(child, &format!("{}.{}.Value", prefix, n), ec2, pairs)?;
                        }
                    }
                }
                Ok(())
            }
        }
        Document::List(items) => {
            for (index, item) in items.iter().enumerate() {
                let n = index + 1;
                let key = if ec2 {
                    format!("{}.{}", prefix, n)
                } else {
                    format!("{}.member.{}", prefix, n)
                };
                match item.scalar_string() {
                    Some(text) => pairs.push((key, text)),
                    None => flatten_query(item, &key, ec2, pairs)?,
                }
            }
            Ok(())
        }
        scalar => {
            let text = scalar.scalar_string().ok_or_else(|| {
                AwsError::Request(RequestError::Unencodable {
                    member: prefix.to_string(),
                    details: "expected a scalar value".into(),
                })
            })?;
            pairs.push((prefix.to_string(), text));
            Ok(())
        }
    }
}

fn flatten_member(
    value: &Document,
    name: &str,
    ec2: bool,
    pairs: &mut Vec<(String, String)>,
) -> Result<(), AwsError> {
    match value.scalar_string() {
        Some(text) => {
            pairs.push((name.to_string(), text));
            Ok(())
        }
        None => flatten_query(value, name, ec2, pairs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_body_order() {
        let mut doc = Document::map();
        doc.insert("TableName", Document::from("T"));
        doc.insert("Limit", Document::from(10i64));

        let bytes = encode_json_body(&doc).unwrap();
        assert_eq!(&bytes[..], br#"{"TableName":"T","Limit":10}"#);
    }

    #[test]
    fn test_xml_body() {
        let mut doc = Document::map();
        doc.insert("LocationConstraint", Document::from("eu-west-1"));

        let bytes = encode_xml_body(
            &doc,
            "CreateBucketConfiguration",
            Some("http://s3.amazonaws.com/doc/2006-03-01/"),
        )
        .unwrap();
        assert_eq!(
            &bytes[..],
            br#"<CreateBucketConfiguration xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><LocationConstraint>eu-west-1</LocationConstraint></CreateBucketConfiguration>"#
        );
    }

    #[test]
    fn test_xml_escapes_text() {
        let mut doc = Document::map();
        doc.insert("Value", Document::from("a<b&c"));

        let bytes = encode_xml_body(&doc, "Root", None).unwrap();
        assert_eq!(&bytes[..], br#"<Root><Value>a&lt;b&amp;c</Value></Root>"#);
    }

    #[test]
    fn test_xml_list_members() {
        let mut doc = Document::map();
        doc.insert(
            "Items",
            Document::List(vec![Document::from("a"), Document::from("b")]),
        );

        let bytes = encode_xml_body(&doc, "Root", None).unwrap();
        assert_eq!(
            &bytes[..],
            br#"<Root><Items><member>a</member><member>b</member></Items></Root>"#
        );
    }

    #[test]
    fn test_query_body_map_flattening() {
        let mut doc = Document::map();
        doc.insert("QueueName", Document::from("q"));
        doc.insert(
            "Attribute",
            Document::Map(vec![("DelaySeconds".to_string(), Document::from("5"))]),
        );

        let body = encode_query_body("CreateQueue", "2012-11-05", &doc, false).unwrap();
        assert_eq!(
            body,
            "Action=CreateQueue&Attribute.1.Name=DelaySeconds&Attribute.1.Value=5&QueueName=q&Version=2012-11-05"
        );
    }

    #[test]
    fn test_query_list_flattening() {
        let mut doc = Document::map();
        doc.insert(
            "AttributeName",
            Document::List(vec![Document::from("All")]),
        );

        let query = encode_query_body("GetQueueAttributes", "2012-11-05", &doc, false).unwrap();
        assert!(query.contains("AttributeName.member.1=All"));

        let ec2 = encode_query_body("DescribeInstances", "2016-11-15", &doc, true).unwrap();
        assert!(ec2.contains("AttributeName.1=All"));
        assert!(!ec2.contains("member"));
    }

    #[test]
    fn test_query_values_encoded() {
        let mut doc = Document::map();
        doc.insert("Prefix", Document::from("a b/c"));

        let body = encode_query_body("ListQueues", "2012-11-05", &doc, false).unwrap();
        assert!(body.contains("Prefix=a%20b%2Fc"));
    }
}
