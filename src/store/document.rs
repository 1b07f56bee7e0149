//! Document and path types shared across store implementations

use std::fmt;

/// A schemaless document: named fields with JSON-shaped values
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Convert any serializable value into a [`Document`]
///
/// Fails with `InvalidDocument` when the value does not serialize to a JSON
/// object.
pub fn doc_from<T: serde::Serialize>(value: &T) -> super::StoreResult<Document> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(super::StoreError::InvalidDocument {
            message: format!("expected object, got {}", value_kind(&other)),
        }),
        Err(e) => Err(super::StoreError::InvalidDocument {
            message: e.to_string(),
        }),
    }
}

fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Path of a collection, e.g. `counters` or `queue/2025-06-01/entries`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the document with the given id inside this collection
    pub fn doc(&self, id: impl Into<String>) -> DocPath {
        DocPath {
            collection: self.clone(),
            id: id.into(),
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully-qualified path of a single document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    pub collection: CollectionPath,
    pub id: String,
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
