//! XML response parsing into [`Document`] trees.

use crate::error::{AwsError, DecodeError};
use crate::operation::Document;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Parse an XML body into `(root_name, content)`.
///
/// Elements with children become ordered maps; repeated sibling names are
/// promoted to lists; leaf elements become strings.
pub fn parse_xml(data: &[u8]) -> Result<(String, Document), AwsError> {
    let text = std::str::from_utf8(data).map_err(|e| malformed(e.to_string()))?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    // (element name, accumulated children, accumulated text)
    let mut stack: Vec<(String, Vec<(String, Document)>, String)> = Vec::new();
    let mut root: Option<(String, Document)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                stack.push((name, Vec::new(), String::new()));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match stack.last_mut() {
                    Some((_, children, _)) => push_child(children, name, Document::String(String::new())),
                    None => root = Some((name, Document::String(String::new()))),
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if let Some((_, _, accum)) = stack.last_mut() {
                    accum.push_str(&text);
                }
            }
            Ok(Event::End(_)) => {
                let (name, children, text) = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced end tag".to_string()))?;
                let value = if children.is_empty() {
                    Document::String(text)
                } else {
                    Document::Map(children)
                };
                match stack.last_mut() {
                    Some((_, parent_children, _)) => push_child(parent_children, name, value),
                    None => {
                        root = Some((name, value));
                        break;
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(e.to_string())),
        }
    }

    root.ok_or_else(|| malformed("empty document".to_string()))
}

/// Insert a child, promoting repeated names to lists.
fn push_child(children: &mut Vec<(String, Document)>, name: String, value: Document) {
    if let Some((_, existing)) = children.iter_mut().find(|(k, _)| *k == name) {
        match existing {
            Document::List(items) => items.push(value),
            other => {
                let first = std::mem::replace(other, Document::Null);
                *other = Document::List(vec![first, value]);
            }
        }
        return;
    }
    children.push((name, value));
}

fn malformed(message: String) -> AwsError {
    AwsError::Decode(DecodeError::MalformedBody {
        format: "xml",
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let xml = b"<Result><Name>n</Name><Inner><A>1</A></Inner></Result>";
        let (root, doc) = parse_xml(xml).unwrap();
        assert_eq!(root, "Result");
        assert_eq!(doc.get("Name").unwrap().as_str(), Some("n"));
        assert_eq!(
            doc.get("Inner").unwrap().get("A").unwrap().as_str(),
            Some("1")
        );
    }

    #[test]
    fn test_repeated_elements_become_lists() {
        let xml = b"<R><Item>a</Item><Item>b</Item><Item>c</Item></R>";
        let (_, doc) = parse_xml(xml).unwrap();
        let items = doc.get("Item").unwrap().as_list().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].as_str(), Some("c"));
    }

    #[test]
    fn test_empty_and_self_closing() {
        let xml = b"<R><A></A><B/></R>";
        let (_, doc) = parse_xml(xml).unwrap();
        assert_eq!(doc.get("A").unwrap().as_str(), Some(""));
        assert_eq!(doc.get("B").unwrap().as_str(), Some(""));
    }

    #[test]
    fn test_entities_unescaped() {
        let xml = b"<R><V>a&lt;b&amp;c</V></R>";
        let (_, doc) = parse_xml(xml).unwrap();
        assert_eq!(doc.get("V").unwrap().as_str(), Some("a<b&c"));
    }

    #[test]
    fn test_malformed_rejected() {
        assert!(parse_xml(b"<R><A></R>").is_err());
        assert!(parse_xml(b"").is_err());
    }
}
