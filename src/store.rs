//! In-memory document store backing the vector and keyword indexes
//!
//! Both indexes only know numeric ids; the store maps them back to the
//! documents the retrievers return.

use crate::document::Document;
use crate::embedding::BatchItem;

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: Vec<Document>,
}

impl DocumentStore {
    /// Ids are assigned by position, starting at 0
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn get(&self, id: u64) -> Option<&Document> {
        usize::try_from(id).ok().and_then(|i| self.documents.get(i))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &Document)> {
        self.documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (i as u64, doc))
    }

    /// Items ready for the batch indexer
    pub fn batch_items(&self) -> Vec<BatchItem> {
        self.iter()
            .map(|(id, doc)| BatchItem {
                id,
                text: doc.page_content.clone(),
            })
            .collect()
    }
}
