//! Lexical retrieval with BM25 over the tantivy keyword index

use super::{ensure_query, run_blocking, Retriever, RetrieverError};
use crate::document::Document;
use crate::embedding::KeywordIndex;
use crate::store::DocumentStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Returns up to `k` stored documents ranked by BM25; documents sharing no
/// term with the query are not returned
#[derive(Clone)]
pub struct Bm25Retriever {
    index: Arc<KeywordIndex>,
    store: Arc<DocumentStore>,
    k: usize,
}

impl Bm25Retriever {
    pub fn new(index: Arc<KeywordIndex>, store: Arc<DocumentStore>, k: usize) -> Self {
        Self { index, store, k }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn search(&self, query: &str) -> Result<Vec<Document>, RetrieverError> {
        let hits = self.index.search(query, self.k)?;

        hits.into_iter()
            .map(|hit| {
                self.store
                    .get(hit.id)
                    .cloned()
                    .ok_or(RetrieverError::MissingDocument(hit.id))
            })
            .collect()
    }
}

#[async_trait]
impl Retriever for Bm25Retriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrieverError> {
        ensure_query(query)?;

        let this = self.clone();
        let query = query.to_string();
        run_blocking(move || this.search(&query)).await
    }

    fn name(&self) -> String {
        "bm25".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retriever(k: usize) -> Bm25Retriever {
        let store = Arc::new(DocumentStore::new(vec![
            Document::new("Hybrid RAG combines semantic and keyword search for better accuracy."),
            Document::new("Vector search retrieves results based on semantic similarity."),
            Document::new("BM25 is a sparse retriever using keyword-based matching."),
            Document::new("RAG pipelines integrate retrieval and generation steps."),
        ]));
        let index = Arc::new(KeywordIndex::in_memory().unwrap());
        for (id, doc) in store.iter() {
            index.insert(id, &doc.page_content).unwrap();
        }
        index.commit().unwrap();
        Bm25Retriever::new(index, store, k)
    }

    #[tokio::test]
    async fn test_only_matching_documents() {
        let docs = retriever(4).retrieve("How does hybrid RAG work?").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].page_content.starts_with("Hybrid RAG"));
        assert!(docs[1].page_content.starts_with("RAG pipelines"));
    }

    #[tokio::test]
    async fn test_respects_k() {
        let docs = retriever(1).retrieve("search").await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let result = retriever(4).retrieve("").await;
        assert!(matches!(result, Err(RetrieverError::InvalidQuery(_))));
    }
}
