/// Batch processor that embeds documents and fills both indexes
use super::{EmbeddingError, EmbeddingProvider, KeywordIndex, VectorIndex};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Text to index under a document id
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub id: u64,
    pub text: String,
}

/// Outcome of a batch run
#[derive(Debug)]
pub struct BatchResult {
    pub processed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl BatchResult {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Embeds texts in fixed-size batches and inserts them into the vector and
/// keyword indexes
pub struct BatchProcessor {
    provider: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<VectorIndex>,
    keyword_index: Arc<KeywordIndex>,
    batch_size: usize,
}

impl BatchProcessor {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<VectorIndex>,
        keyword_index: Arc<KeywordIndex>,
        batch_size: usize,
    ) -> Self {
        Self {
            provider,
            vector_index,
            keyword_index,
            batch_size: batch_size.max(1),
        }
    }

    /// Index every item, then commit the keyword index
    ///
    /// A failing batch is counted and logged; the remaining batches still run.
    pub fn process(&self, items: &[BatchItem]) -> Result<BatchResult> {
        let start = std::time::Instant::now();

        info!("Indexing {} items", items.len());

        let mut processed = 0;
        let mut failed = 0;

        for chunk in items.chunks(self.batch_size) {
            match self.process_chunk(chunk) {
                Ok(count) => {
                    processed += count;
                    debug!("Indexed batch of {} items", count);
                }
                Err(e) => {
                    warn!("Failed to index batch: {}", e);
                    failed += chunk.len();
                }
            }
        }

        self.keyword_index.commit()?;

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Indexing complete: {} processed, {} failed, {}ms",
            processed, failed, duration_ms
        );

        Ok(BatchResult {
            processed,
            failed,
            duration_ms,
        })
    }

    fn process_chunk(&self, chunk: &[BatchItem]) -> Result<usize, EmbeddingError> {
        let texts: Vec<String> = chunk.iter().map(|item| item.text.clone()).collect();

        let embeddings = self.provider.embed_batch(&texts)?;

        if embeddings.len() != chunk.len() {
            return Err(EmbeddingError::GenerationError(format!(
                "Embedding count mismatch: expected {}, got {}",
                chunk.len(),
                embeddings.len()
            )));
        }

        let vectors: Vec<(u64, Vec<f32>)> = chunk
            .iter()
            .map(|item| item.id)
            .zip(embeddings)
            .collect();
        self.vector_index
            .insert_batch(&vectors)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        let documents: Vec<(u64, String)> = chunk
            .iter()
            .map(|item| (item.id, item.text.clone()))
            .collect();
        self.keyword_index
            .insert_batch(&documents)
            .map_err(|e| EmbeddingError::GenerationError(e.to_string()))?;

        Ok(chunk.len())
    }
}
