//! Weighted Reciprocal Rank Fusion over heterogeneous ranked lists

use super::deduplication::first_occurrences;
use super::scored::{Contribution, ScoredDocument};
use super::RetrieverError;
use crate::config::RetrievalConfig;
use crate::document::Document;
use ahash::AHashMap;
use std::time::Duration;
use thiserror::Error;

/// Smoothing constant added to the 0-indexed rank
pub const DEFAULT_RRF_C: f64 = 60.0;

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Invalid weight for retriever {index}: {weight} (weights must be non-negative)")]
    InvalidWeight { index: usize, weight: f64 },

    #[error("No retrievers supplied")]
    EmptyRetrieverList,

    #[error("Retriever {index} ({name}) failed: {source}")]
    RetrieverFailure {
        index: usize,
        name: String,
        #[source]
        source: RetrieverError,
    },

    #[error("Number of retrievers ({retrievers}) must equal number of weights ({weights})")]
    MismatchedLengths { retrievers: usize, weights: usize },

    #[error("Invalid RRF constant: {0} (must be positive)")]
    InvalidConstant(f64),
}

/// Configuration for fusion
#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// RRF constant `c` (typically 60)
    pub c: f64,

    /// Metadata field used as document identity; content digest when unset
    pub id_key: Option<String>,

    /// Run retrievers as concurrent tasks
    pub parallel: bool,

    /// Abort a retriever call that runs longer than this
    pub retriever_timeout: Option<Duration>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            c: DEFAULT_RRF_C,
            id_key: None,
            parallel: true,
            retriever_timeout: None,
        }
    }
}

impl FusionConfig {
    pub fn from_retrieval(config: &RetrievalConfig) -> crate::error::Result<Self> {
        let fusion = Self {
            c: config.rrf_c,
            id_key: config.id_key.clone(),
            parallel: config.parallel,
            retriever_timeout: config.timeout()?,
        };
        fusion.validate()?;
        Ok(fusion)
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_id_key(mut self, id_key: impl Into<String>) -> Self {
        self.id_key = Some(id_key.into());
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.retriever_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> Result<(), FusionError> {
        if !self.c.is_finite() || self.c <= 0.0 {
            return Err(FusionError::InvalidConstant(self.c));
        }
        Ok(())
    }
}

/// Check that every weight is finite and non-negative
pub(crate) fn validate_weights(weights: &[f64]) -> Result<(), FusionError> {
    if weights.is_empty() {
        return Err(FusionError::EmptyRetrieverList);
    }

    for (index, &weight) in weights.iter().enumerate() {
        if !weight.is_finite() || weight < 0.0 {
            return Err(FusionError::InvalidWeight { index, weight });
        }
    }

    Ok(())
}

/// Fuse ranked lists with weighted Reciprocal Rank Fusion
///
/// score(d) = sum over lists i containing d of: weight_i / (rank_i(d) + c)
///
/// `ranked_lists[i]` is weighted by `weights[i]`; weights are assumed valid.
/// Output is sorted by score descending. Ties keep first-appearance order,
/// scanning lists in input order and each list front to back.
pub fn weighted_reciprocal_rank(
    ranked_lists: Vec<Vec<Document>>,
    weights: &[f64],
    config: &FusionConfig,
) -> Vec<ScoredDocument> {
    let id_key = config.id_key.as_deref();
    let mut slots: AHashMap<String, usize> = AHashMap::new();
    let mut fused: Vec<ScoredDocument> = Vec::new();

    for (retriever, (list, &weight)) in ranked_lists.into_iter().zip(weights).enumerate() {
        for ranked in first_occurrences(list, id_key) {
            let contribution = Contribution {
                retriever,
                rank: ranked.rank,
                score: weight / (ranked.rank as f64 + config.c),
            };

            match slots.get(&ranked.key) {
                Some(&slot) => fused[slot].add(contribution),
                None => {
                    slots.insert(ranked.key, fused.len());
                    fused.push(ScoredDocument::new(ranked.document, contribution));
                }
            }
        }
    }

    // Stable sort keeps first-appearance order among equal scores
    fused.sort_by(|a, b| b.score.total_cmp(&a.score));

    fused
}
