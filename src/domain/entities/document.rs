use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::text::TextSplitter;

pub type Metadata = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

/// Splits every document with `splitter`.
///
/// Chunks get fresh ids and inherit the metadata of their source document.
pub fn chunk_documents(documents: &[Document], splitter: &TextSplitter) -> Vec<Document> {
    documents
        .iter()
        .flat_map(|doc| {
            splitter.split(&doc.content).into_iter().map(|content| Document {
                id: Uuid::new_v4(),
                content,
                metadata: doc.metadata.clone(),
            })
        })
        .collect()
}
