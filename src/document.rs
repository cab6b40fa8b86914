//! Retrievable documents and their identity keys

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A unit of retrievable text with arbitrary metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Text content
    pub page_content: String,

    /// Arbitrary metadata (source path, external id, ...)
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata field
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// BLAKE3 digest of the page content
    pub fn content_hash(&self) -> String {
        blake3::hash(self.page_content.as_bytes()).to_hex().to_string()
    }

    /// Key used to decide whether two documents are the same
    ///
    /// With `id_key` set and present in the metadata, the metadata value is the
    /// identity. Otherwise the content digest is.
    pub fn identity_key(&self, id_key: Option<&str>) -> String {
        let external = id_key.and_then(|key| self.metadata.get(key));
        match external {
            Some(Value::String(id)) => format!("id:{}", id),
            Some(value) => format!("id:{}", value),
            None => format!("content:{}", self.content_hash()),
        }
    }
}
