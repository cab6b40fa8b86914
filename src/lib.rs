//! hybrid-rag - Hybrid dense + sparse retrieval
//!
//! Splits documents into chunks, indexes them in an HNSW vector index and a
//! BM25 keyword index, and merges the two rankings with weighted Reciprocal
//! Rank Fusion.

pub mod cli;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod pipeline;
pub mod retrieval;
pub mod splitter;
pub mod store;

pub use error::{HybridError, Result};
