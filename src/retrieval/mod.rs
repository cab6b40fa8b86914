//! Hybrid retrieval: dense and sparse retrievers combined by weighted
//! reciprocal rank fusion.
//!
//! Every retriever satisfies the single `Retriever` capability. The
//! `EnsembleRetriever` invokes a weighted set of them, scores each document
//! `weight / (rank + c)` per list, sums the contributions per document
//! identity and returns one deduplicated ranking.

mod deduplication;
mod dense;
mod ensemble;
mod fusion;
mod scored;
mod sparse;

pub use deduplication::{first_occurrences, RankedDocument};
pub use dense::DenseRetriever;
pub use ensemble::{fuse, fuse_with_config, EnsembleRetriever, WeightedRetriever};
pub use fusion::{weighted_reciprocal_rank, FusionConfig, FusionError, DEFAULT_RRF_C};
pub use scored::{Contribution, ScoredDocument};
pub use sparse::Bm25Retriever;

use crate::document::Document;
use crate::embedding::{EmbeddingError, KeywordIndexError, VectorIndexError};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrieverError {
    #[error("Embedding generation failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector search failed: {0}")]
    VectorSearch(#[from] VectorIndexError),

    #[error("Keyword search failed: {0}")]
    KeywordSearch(#[from] KeywordIndexError),

    #[error("Index returned unknown document id {0}")]
    MissingDocument(u64),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Retriever task panicked: {0}")]
    Panicked(String),

    #[error("Ensemble failed: {0}")]
    Ensemble(#[source] Box<FusionError>),
}

/// Anything that turns a query into documents, most relevant first
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrieverError>;

    /// Short label used in logs and error context
    fn name(&self) -> String {
        "retriever".to_string()
    }
}

/// Run index or model work on the blocking pool so it never stalls the runtime
async fn run_blocking<T, F>(work: F) -> Result<T, RetrieverError>
where
    F: FnOnce() -> Result<T, RetrieverError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| RetrieverError::Panicked(e.to_string()))?
}

fn ensure_query(query: &str) -> Result<(), RetrieverError> {
    if query.trim().is_empty() {
        return Err(RetrieverError::InvalidQuery(
            "Query text cannot be empty".to_string(),
        ));
    }
    Ok(())
}
