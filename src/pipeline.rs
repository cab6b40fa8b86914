//! End-to-end hybrid retrieval pipeline
//!
//! Splits documents into chunks, indexes every chunk for both dense and
//! sparse search, and answers queries through a weighted ensemble of the two.

use crate::config::{Config, ConfigValidator};
use crate::document::Document;
use crate::embedding::{BatchProcessor, EmbeddingProvider, KeywordIndex, VectorIndex};
use crate::error::{HybridError, Result};
use crate::retrieval::{
    Bm25Retriever, DenseRetriever, EnsembleRetriever, FusionConfig, Retriever, ScoredDocument,
};
use crate::splitter::RecursiveCharacterTextSplitter;
use crate::store::DocumentStore;
use std::sync::Arc;
use tracing::info;

/// Query used by the `demo` command
pub const DEFAULT_QUERY: &str = "How does hybrid RAG work?";

/// The four demonstration documents
pub fn sample_documents() -> Vec<Document> {
    [
        "Hybrid RAG combines semantic and keyword search for better accuracy.",
        "Vector search retrieves results based on semantic similarity.",
        "BM25 is a sparse retriever using keyword-based matching.",
        "RAG pipelines integrate retrieval and generation steps.",
    ]
    .into_iter()
    .map(Document::new)
    .collect()
}

/// Indexed corpus plus the dense + BM25 ensemble over it
pub struct HybridPipeline {
    store: Arc<DocumentStore>,
    ensemble: EnsembleRetriever,
    model_name: String,
}

impl std::fmt::Debug for HybridPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridPipeline")
            .field("chunks", &self.store.len())
            .field("model", &self.model_name)
            .field("ensemble", &self.ensemble)
            .finish()
    }
}

impl HybridPipeline {
    /// Split, index and wire up retrievers for `documents`
    ///
    /// Fails if any chunk could not be indexed.
    pub fn build(
        config: &Config,
        provider: Arc<dyn EmbeddingProvider>,
        documents: Vec<Document>,
    ) -> Result<Self> {
        ConfigValidator::validate(config)?;

        let splitter = RecursiveCharacterTextSplitter::from_config(&config.splitter);
        let chunks = splitter.split_documents(&documents);

        let store = Arc::new(DocumentStore::new(chunks));

        let vector_index = Arc::new(VectorIndex::new(
            provider.dimension(),
            config.indexing.max_elements.max(store.len()),
            config.indexing.hnsw_ef_construction,
            config.indexing.hnsw_m,
        ));
        let keyword_index = Arc::new(KeywordIndex::in_memory()?);

        let processor = BatchProcessor::new(
            Arc::clone(&provider),
            Arc::clone(&vector_index),
            Arc::clone(&keyword_index),
            config.embedding.batch_size,
        );
        let outcome = processor.process(&store.batch_items())?;
        if !outcome.is_complete() {
            return Err(HybridError::Indexing {
                failed: outcome.failed,
                total: store.len(),
            });
        }

        let retrieval = &config.retrieval;
        let dense: Arc<dyn Retriever> = Arc::new(
            DenseRetriever::new(
                Arc::clone(&provider),
                vector_index,
                Arc::clone(&store),
                retrieval.dense_k,
            )
            .with_ef_search(config.indexing.hnsw_ef_search),
        );
        let sparse: Arc<dyn Retriever> = Arc::new(Bm25Retriever::new(
            keyword_index,
            Arc::clone(&store),
            retrieval.sparse_k,
        ));

        let ensemble = EnsembleRetriever::try_new(
            vec![dense, sparse],
            vec![retrieval.dense_weight, retrieval.sparse_weight],
            FusionConfig::from_retrieval(retrieval)?,
        )?;

        info!(
            "Indexed {} chunks from {} documents with {}",
            store.len(),
            documents.len(),
            provider.model_name()
        );

        Ok(Self {
            store,
            ensemble,
            model_name: provider.model_name().to_string(),
        })
    }

    /// Fused results for `query`, best first
    pub async fn query(&self, query: &str, top_k: Option<usize>) -> Result<Vec<ScoredDocument>> {
        let results = self.ensemble.fuse(query, top_k).await?;
        info!("Query {:?} returned {} results", query, results.len());
        Ok(results)
    }

    pub fn chunk_count(&self) -> usize {
        self.store.len()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn ensemble(&self) -> &EnsembleRetriever {
        &self.ensemble
    }
}
