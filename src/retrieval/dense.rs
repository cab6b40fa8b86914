//! Semantic retrieval over the HNSW vector index

use super::{ensure_query, run_blocking, Retriever, RetrieverError};
use crate::document::Document;
use crate::embedding::{EmbeddingProvider, VectorIndex};
use crate::store::DocumentStore;
use async_trait::async_trait;
use std::sync::Arc;

const DEFAULT_EF_SEARCH: usize = 64;

/// Embeds the query and returns the `k` nearest stored documents
#[derive(Clone)]
pub struct DenseRetriever {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    store: Arc<DocumentStore>,
    k: usize,
    ef_search: usize,
}

impl DenseRetriever {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        store: Arc<DocumentStore>,
        k: usize,
    ) -> Self {
        Self {
            provider,
            index,
            store,
            k,
            ef_search: DEFAULT_EF_SEARCH,
        }
    }

    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    fn search(&self, query: &str) -> Result<Vec<Document>, RetrieverError> {
        let query_embedding = self.provider.embed(query)?;
        let hits = self.index.search(&query_embedding, self.k, self.ef_search)?;

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
impl Retriever for DenseRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrieverError> {
        ensure_query(query)?;

        let this = self.clone();
        let query = query.to_string();
        run_blocking(move || this.search(&query)).await
    }

    fn name(&self) -> String {
        "dense".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use std::time::{Duration, Instant};

    /// Maps text onto a fixed axis by its first letter
    struct AxisProvider;

    impl EmbeddingProvider for AxisProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let mut vector = vec![0.1; 3];
            match text.chars().next() {
                Some('a') => vector[0] = 1.0,
                Some('b') => vector[1] = 1.0,
                _ => vector[2] = 1.0,
            }
            Ok(vector)
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "axis"
        }
    }

    fn retriever(k: usize) -> DenseRetriever {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(AxisProvider);
        let store = Arc::new(DocumentStore::new(vec![
            Document::new("apples"),
            Document::new("bananas"),
            Document::new("cherries"),
        ]));
        let index = Arc::new(VectorIndex::new(3, 100, 200, 16));
        for (id, doc) in store.iter() {
            index
                .insert(id, &provider.embed(&doc.page_content).unwrap())
                .unwrap();
        }
        DenseRetriever::new(provider, index, store, k)
    }

    #[tokio::test]
    async fn test_nearest_first() {
        let docs = retriever(2).retrieve("bread").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].page_content, "bananas");
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let result = retriever(2).retrieve("  ").await;
        assert!(matches!(result, Err(RetrieverError::InvalidQuery(_))));
    }

    /// Stands in for a model that takes a while to run
    struct SlowProvider;

    impl EmbeddingProvider for SlowProvider {
        fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(vec![1.0, 0.1, 0.1])
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            3
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_embedding_does_not_block_runtime() {
        let store = Arc::new(DocumentStore::new(vec![Document::new("apples")]));
        let index = Arc::new(VectorIndex::new(3, 100, 200, 16));
        index.insert(0, &[1.0, 0.1, 0.1]).unwrap();
        let dense = DenseRetriever::new(Arc::new(SlowProvider), index, store, 1);

        let start = Instant::now();
        let (docs, ticked_at) = tokio::join!(dense.retrieve("apple"), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            start.elapsed()
        });

        assert_eq!(docs.unwrap()[0].page_content, "apples");
        assert!(ticked_at < Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_unknown_id_is_an_error() {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(AxisProvider);
        let index = Arc::new(VectorIndex::new(3, 100, 200, 16));
        index.insert(7, &[1.0, 0.1, 0.1]).unwrap();

        let dense = DenseRetriever::new(provider, index, Arc::new(DocumentStore::default()), 1);
        let result = dense.retrieve("anything").await;
        assert!(matches!(result, Err(RetrieverError::MissingDocument(7))));
    }
}
