//! Embedding generation and the two search indexes behind the retrievers
//!
//! - `EmbeddingProvider` trait, with `FastEmbedProvider` for local models
//! - HNSW `VectorIndex` for dense similarity search
//! - Tantivy `KeywordIndex` for BM25 search
//! - `BatchProcessor` to embed and index documents in batches

mod batch;
mod keyword_index;
mod provider;
mod vector_index;

pub use batch::{BatchItem, BatchProcessor, BatchResult};
pub use keyword_index::{KeywordIndex, KeywordIndexError, KeywordSearchResult};
pub use provider::{EmbeddingError, EmbeddingProvider, FastEmbedProvider, SUPPORTED_MODELS};
pub use vector_index::{SearchResult, VectorIndex, VectorIndexError};
