//! Ordered document tree for protocol bodies.
//!
//! Request bodies are assembled as a [`Document`] so the JSON, XML, and
//! query serializers share one source. Maps preserve insertion order, which
//! keeps the emitted bytes deterministic.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A protocol-neutral body value.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// JSON null / absent XML element.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// String.
    String(String),
    /// Ordered list.
    List(Vec<Document>),
    /// Ordered map of member name to value.
    Map(Vec<(String, Document)>),
}

impl Document {
    /// An empty map.
    pub fn map() -> Self {
        Document::Map(Vec::new())
    }

    /// Append an entry to a map document. No-op on other variants.
    pub fn insert(&mut self, key: impl Into<String>, value: Document) {
        if let Document::Map(entries) = self {
            entries.push((key.into(), value));
        }
    }

    /// Look up a map entry by key.
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Document::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// View as a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Document::String(s) => Some(s),
            _ => None,
        }
    }

    /// View as a list.
    pub fn as_list(&self) -> Option<&[Document]> {
        match self {
            Document::List(items) => Some(items),
            _ => None,
        }
    }

    /// View as map entries.
    pub fn as_map(&self) -> Option<&[(String, Document)]> {
        match self {
            Document::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// True for `Null` and for empty maps/lists/strings.
    pub fn is_empty(&self) -> bool {
        match self {
            Document::Null => true,
            Document::String(s) => s.is_empty(),
            Document::List(items) => items.is_empty(),
            Document::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }

    /// Render a scalar to its wire string. `None` for lists and maps.
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Document::Bool(b) => Some(b.to_string()),
            Document::Integer(i) => Some(i.to_string()),
            Document::Float(f) => Some(f.to_string()),
            Document::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<&str> for Document {
    fn from(value: &str) -> Self {
        Document::String(value.to_string())
    }
}

impl From<String> for Document {
    fn from(value: String) -> Self {
        Document::String(value)
    }
}

impl From<i64> for Document {
    fn from(value: i64) -> Self {
        Document::Integer(value)
    }
}

impl From<bool> for Document {
    fn from(value: bool) -> Self {
        Document::Bool(value)
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Document::Null => serializer.serialize_unit(),
            Document::Bool(b) => serializer.serialize_bool(*b),
            Document::Integer(i) => serializer.serialize_i64(*i),
            Document::Float(f) => serializer.serialize_f64(*f),
            Document::String(s) => serializer.serialize_str(s),
            Document::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Document::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl From<serde_json::Value> for Document {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Document::Null,
            serde_json::Value::Bool(b) => Document::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Document::Integer(i)
                } else {
                    Document::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Document::String(s),
            serde_json::Value::Array(items) => {
                Document::List(items.into_iter().map(Document::from).collect())
            }
            serde_json::Value::Object(entries) => Document::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Document::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_round_trip_preserves_order() {
        let mut doc = Document::map();
        doc.insert("Zebra", Document::from("z"));
        doc.insert("Alpha", Document::from(1i64));

        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"Zebra":"z","Alpha":1}"#);
    }

    #[test]
    fn test_from_json_value() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"a": [1, "x", true], "b": null}"#).unwrap();
        let doc = Document::from(value);

        let list = doc.get("a").unwrap().as_list().unwrap();
        assert_eq!(list[0], Document::Integer(1));
        assert_eq!(list[1], Document::String("x".into()));
        assert_eq!(list[2], Document::Bool(true));
        assert_eq!(doc.get("b"), Some(&Document::Null));
    }

    #[test]
    fn test_scalar_string() {
        assert_eq!(Document::from(true).scalar_string().unwrap(), "true");
        assert_eq!(Document::from(42i64).scalar_string().unwrap(), "42");
        assert!(Document::map().scalar_string().is_none());
    }
}
