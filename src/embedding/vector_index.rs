/// HNSW vector index for dense similarity search
use hnsw_rs::prelude::*;
use std::sync::RwLock;
use thiserror::Error;

/// Upper bound on HNSW layers (hnsw_rs caps it at 16 as well)
const MAX_LAYERS: usize = 16;

#[derive(Error, Debug)]
pub enum VectorIndexError {
    #[error("Insert failed: {0}")]
    InsertError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Index lock poisoned")]
    LockPoisoned,
}

/// Search hit with id and cosine similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Document id in the `DocumentStore`
    pub id: u64,
    /// Cosine similarity (higher is more similar)
    pub score: f32,
}

/// In-memory HNSW index using cosine distance
pub struct VectorIndex {
    index: RwLock<Hnsw<'static, f32, DistCosine>>,
    dimension: usize,
    count: RwLock<u64>,
}

impl VectorIndex {
    /// Create an empty index
    ///
    /// # Arguments
    /// * `dimension` - Vector dimension (must match the embedding provider)
    /// * `max_elements` - Expected number of vectors, used to size the graph
    /// * `ef_construction` - Build-time candidate list size
    /// * `m` - Connections per node
    pub fn new(dimension: usize, max_elements: usize, ef_construction: usize, m: usize) -> Self {
        let index = Hnsw::<f32, DistCosine>::new(
            m,
            max_elements,
            MAX_LAYERS,
            ef_construction,
            DistCosine,
        );

        Self {
            index: RwLock::new(index),
            dimension,
            count: RwLock::new(0),
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::InvalidDimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    pub fn insert(&self, id: u64, vector: &[f32]) -> Result<(), VectorIndexError> {
        self.check_dimension(vector)?;

        let id = usize::try_from(id)
            .map_err(|_| VectorIndexError::InsertError(format!("Id {} out of range", id)))?;

        let index = self
            .index
            .write()
            .map_err(|_| VectorIndexError::LockPoisoned)?;
        index.insert((vector, id));

        let mut count = self
            .count
            .write()
            .map_err(|_| VectorIndexError::LockPoisoned)?;
        *count += 1;

        Ok(())
    }

    /// Insert several vectors; nothing is inserted if any has the wrong dimension
    pub fn insert_batch(&self, items: &[(u64, Vec<f32>)]) -> Result<(), VectorIndexError> {
        for (_, vector) in items {
            self.check_dimension(vector)?;
        }

        for (id, vector) in items {
            self.insert(*id, vector)?;
        }
        Ok(())
    }

    /// Search for the `k` nearest neighbours, best first
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<SearchResult>, VectorIndexError> {
        self.check_dimension(query)?;

        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let index = self
            .index
            .read()
            .map_err(|_| VectorIndexError::LockPoisoned)?;

        let mut results: Vec<SearchResult> = index
            .search(query, k, ef_search.max(k))
            .into_iter()
            .map(|neighbour| SearchResult {
                id: neighbour.d_id as u64,
                score: 1.0 - neighbour.distance,
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(results)
    }

    pub fn len(&self) -> u64 {
        self.count.read().map(|count| *count).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(dim: usize, hot: &[(usize, f32)]) -> Vec<f32> {
        let mut v = vec![0.01; dim];
        for (i, value) in hot {
            v[*i] = *value;
        }
        v
    }

    #[test]
    fn test_index_creation() {
        let index = VectorIndex::new(8, 100, 200, 16);
        assert_eq!(index.dimension(), 8);
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let index = VectorIndex::new(8, 100, 200, 16);

        index.insert(1, &axis(8, &[(0, 1.0)])).unwrap();
        index.insert(2, &axis(8, &[(1, 1.0)])).unwrap();
        index.insert(3, &axis(8, &[(0, 0.9), (1, 0.1)])).unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search(&axis(8, &[(0, 1.0)]), 2, 50).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 1);
        assert_eq!(results[1].id, 3);
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn test_search_empty_index() {
        let index = VectorIndex::new(8, 100, 200, 16);
        let results = index.search(&axis(8, &[(0, 1.0)]), 2, 50).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_batch_insert() {
        let index = VectorIndex::new(4, 100, 200, 16);
        let items: Vec<(u64, Vec<f32>)> = (0..10)
            .map(|i| (i, vec![1.0, i as f32 + 1.0, 0.5, 0.25]))
            .collect();

        index.insert_batch(&items).unwrap();
        assert_eq!(index.len(), 10);
    }

    #[test]
    fn test_batch_insert_checks_every_dimension_first() {
        let index = VectorIndex::new(4, 100, 200, 16);
        let items = vec![(0, vec![1.0; 4]), (1, vec![1.0; 3])];

        assert!(index.insert_batch(&items).is_err());
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_dimension_validation() {
        let index = VectorIndex::new(8, 100, 200, 16);
        let result = index.insert(1, &[1.0; 4]);
        assert!(matches!(
            result,
            Err(VectorIndexError::InvalidDimension {
                expected: 8,
                actual: 4
            })
        ));
        assert!(index.search(&[1.0; 4], 1, 10).is_err());
    }
}
