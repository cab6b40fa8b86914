//! Ensemble of weighted retrievers fused into one ranking

use super::fusion::{validate_weights, weighted_reciprocal_rank, FusionConfig, FusionError};
use super::scored::ScoredDocument;
use super::{Retriever, RetrieverError};
use crate::document::Document;
use ahash::AHashMap;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, warn};

/// A retriever paired with its fusion weight
#[derive(Clone)]
pub struct WeightedRetriever {
    pub retriever: Arc<dyn Retriever>,
    pub weight: f64,
}

impl WeightedRetriever {
    pub fn new(retriever: Arc<dyn Retriever>, weight: f64) -> Self {
        Self { retriever, weight }
    }
}

impl std::fmt::Debug for WeightedRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeightedRetriever")
            .field("retriever", &self.retriever.name())
            .field("weight", &self.weight)
            .finish()
    }
}

/// Fuse the retrievers' results for `query` with the default configuration
/// (c = 60, content identity, concurrent calls, no timeout)
pub async fn fuse(
    retrievers: &[WeightedRetriever],
    query: &str,
    top_k: Option<usize>,
) -> Result<Vec<ScoredDocument>, FusionError> {
    fuse_with_config(retrievers, query, top_k, &FusionConfig::default()).await
}

/// Invoke every retriever, then fuse with weighted reciprocal rank
///
/// Any retriever failure aborts the whole call; there are no partial results.
pub async fn fuse_with_config(
    retrievers: &[WeightedRetriever],
    query: &str,
    top_k: Option<usize>,
    config: &FusionConfig,
) -> Result<Vec<ScoredDocument>, FusionError> {
    let weights: Vec<f64> = retrievers.iter().map(|r| r.weight).collect();
    validate_weights(&weights)?;
    config.validate()?;

    let lists = if config.parallel {
        retrieve_concurrently(retrievers, query, config.retriever_timeout).await?
    } else {
        retrieve_sequentially(retrievers, query, config.retriever_timeout).await?
    };

    let retrieved: usize = lists.iter().map(Vec::len).sum();
    let mut fused = weighted_reciprocal_rank(lists, &weights, config);
    let distinct = fused.len();

    if let Some(k) = top_k {
        fused.truncate(k);
    }

    debug!(
        retrievers = retrievers.len(),
        retrieved,
        distinct,
        returned = fused.len(),
        rrf_c = config.c,
        "Rank fusion complete"
    );

    Ok(fused)
}

async fn call_retriever(
    retriever: &dyn Retriever,
    query: &str,
    timeout: Option<Duration>,
) -> Result<Vec<Document>, RetrieverError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, retriever.retrieve(query))
            .await
            .map_err(|_| RetrieverError::Timeout(limit))?,
        None => retriever.retrieve(query).await,
    }
}

fn failure(retrievers: &[WeightedRetriever], index: usize, source: RetrieverError) -> FusionError {
    let name = retrievers[index].retriever.name();
    warn!("Retriever {} ({}) failed: {}", index, name, source);
    FusionError::RetrieverFailure {
        index,
        name,
        source,
    }
}

async fn retrieve_sequentially(
    retrievers: &[WeightedRetriever],
    query: &str,
    timeout: Option<Duration>,
) -> Result<Vec<Vec<Document>>, FusionError> {
    let mut lists = Vec::with_capacity(retrievers.len());
    for (index, weighted) in retrievers.iter().enumerate() {
        let docs = call_retriever(weighted.retriever.as_ref(), query, timeout)
            .await
            .map_err(|source| failure(retrievers, index, source))?;
        lists.push(docs);
    }
    Ok(lists)
}

type Settled = (usize, Result<Vec<Document>, RetrieverError>);

/// Map a joined task back to its retriever index; cancelled tasks yield nothing
fn settle(
    joined: Result<(Id, Result<Vec<Document>, RetrieverError>), JoinError>,
    indices: &AHashMap<Id, usize>,
) -> Option<Settled> {
    match joined {
        Ok((id, outcome)) => indices.get(&id).map(|&index| (index, outcome)),
        Err(join_error) if join_error.is_cancelled() => None,
        Err(join_error) => indices
            .get(&join_error.id())
            .map(|&index| (index, Err(RetrieverError::Panicked(join_error.to_string())))),
    }
}

/// One task per retriever in a `JoinSet`
///
/// The first failure to arrive ends the call: outstanding tasks are aborted
/// and the lowest index among failures that had already finished is
/// reported. Dropping the set (a cancelled caller) aborts every task too.
async fn retrieve_concurrently(
    retrievers: &[WeightedRetriever],
    query: &str,
    timeout: Option<Duration>,
) -> Result<Vec<Vec<Document>>, FusionError> {
    let mut tasks = JoinSet::new();
    let mut indices = AHashMap::with_capacity(retrievers.len());

    for (index, weighted) in retrievers.iter().enumerate() {
        let retriever = Arc::clone(&weighted.retriever);
        let query = query.to_string();
        let handle =
            tasks.spawn(async move { call_retriever(retriever.as_ref(), &query, timeout).await });
        indices.insert(handle.id(), index);
    }

    let mut slots: Vec<Option<Vec<Document>>> = (0..retrievers.len()).map(|_| None).collect();
    let mut failed = None;

    while let Some(joined) = tasks.join_next_with_id().await {
        match settle(joined, &indices) {
            Some((index, Ok(docs))) => slots[index] = Some(docs),
            Some((index, Err(source))) => {
                failed = Some((index, source));
                break;
            }
            None => {}
        }
    }

    if let Some((mut index, mut source)) = failed {
        tasks.abort_all();
        while let Some(joined) = tasks.join_next_with_id().await {
            if let Some((other, Err(other_source))) = settle(joined, &indices) {
                if other < index {
                    index = other;
                    source = other_source;
                }
            }
        }
        return Err(failure(retrievers, index, source));
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Retriever that ensembles weighted retrievers with Reciprocal Rank Fusion
///
/// Typical use is hybrid search: a dense vector retriever and a sparse BM25
/// retriever weighted 0.7 / 0.3. The ensemble is itself a `Retriever`, so
/// ensembles nest.
pub struct EnsembleRetriever {
    retrievers: Vec<WeightedRetriever>,
    config: FusionConfig,
}

impl std::fmt::Debug for EnsembleRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleRetriever")
            .field("retrievers", &self.retrievers)
            .field("config", &self.config)
            .finish()
    }
}

impl EnsembleRetriever {
    /// Pair `retrievers` with `weights` position by position
    pub fn try_new(
        retrievers: Vec<Arc<dyn Retriever>>,
        weights: Vec<f64>,
        config: FusionConfig,
    ) -> Result<Self, FusionError> {
        if retrievers.len() != weights.len() {
            return Err(FusionError::MismatchedLengths {
                retrievers: retrievers.len(),
                weights: weights.len(),
            });
        }

        let weighted = retrievers
            .into_iter()
            .zip(weights)
            .map(|(retriever, weight)| WeightedRetriever::new(retriever, weight))
            .collect();

        Self::from_weighted(weighted, config)
    }

    pub fn from_weighted(
        retrievers: Vec<WeightedRetriever>,
        config: FusionConfig,
    ) -> Result<Self, FusionError> {
        let weights: Vec<f64> = retrievers.iter().map(|r| r.weight).collect();
        validate_weights(&weights)?;
        config.validate()?;

        Ok(Self { retrievers, config })
    }

    /// Give each retriever weight 1/n
    pub fn with_equal_weights(
        retrievers: Vec<Arc<dyn Retriever>>,
        config: FusionConfig,
    ) -> Result<Self, FusionError> {
        if retrievers.is_empty() {
            return Err(FusionError::EmptyRetrieverList);
        }
        let weight = 1.0 / retrievers.len() as f64;
        let weights = vec![weight; retrievers.len()];
        Self::try_new(retrievers, weights, config)
    }

    pub fn weights(&self) -> Vec<f64> {
        self.retrievers.iter().map(|r| r.weight).collect()
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.retrievers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retrievers.is_empty()
    }

    /// Fused, scored results for `query`, truncated to `top_k` when given
    pub async fn fuse(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<ScoredDocument>, FusionError> {
        fuse_with_config(&self.retrievers, query, top_k, &self.config).await
    }
}

#[async_trait]
impl Retriever for EnsembleRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrieverError> {
        let fused = self
            .fuse(query, None)
            .await
            .map_err(|e| RetrieverError::Ensemble(Box::new(e)))?;

        Ok(fused.into_iter().map(|scored| scored.document).collect())
    }

    fn name(&self) -> String {
        let names: Vec<String> = self.retrievers.iter().map(|r| r.retriever.name()).collect();
        format!("ensemble[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns a fixed list of documents
    struct StaticRetriever {
        docs: Vec<Document>,
    }

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn retrieve(&self, _query: &str) -> Result<Vec<Document>, RetrieverError> {
            Ok(self.docs.clone())
        }

        fn name(&self) -> String {
            "static".to_string()
        }
    }

    fn retriever(contents: &[&str]) -> Arc<dyn Retriever> {
        Arc::new(StaticRetriever {
            docs: contents.iter().map(|c| Document::new(*c)).collect(),
        })
    }

    #[tokio::test]
    async fn test_ensemble_basic_merging() {
        let ensemble = EnsembleRetriever::try_new(
            vec![retriever(&["a", "b", "c"]), retriever(&["b"])],
            vec![0.5, 0.5],
            FusionConfig::default(),
        )
        .unwrap();

        let docs = ensemble.retrieve("_").await.unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].page_content, "b");
    }

    #[tokio::test]
    async fn test_ensemble_weighted_preference() {
        let ensemble = EnsembleRetriever::try_new(
            vec![retriever(&["a", "b"]), retriever(&["c", "d"])],
            vec![0.1, 0.9],
            FusionConfig::default(),
        )
        .unwrap();

        let docs = ensemble.retrieve("_").await.unwrap();
        assert_eq!(docs[0].page_content, "c");
    }

    #[tokio::test]
    async fn test_ensemble_empty_retriever() {
        let ensemble = EnsembleRetriever::try_new(
            vec![retriever(&["a", "b"]), retriever(&[])],
            vec![0.5, 0.5],
            FusionConfig::default(),
        )
        .unwrap();

        let docs = ensemble.retrieve("_").await.unwrap();
        let contents: Vec<&str> = docs.iter().map(|d| d.page_content.as_str()).collect();
        assert_eq!(contents, vec!["a", "b"]);
    }

    #[test]
    fn test_equal_weights() {
        let ensemble = EnsembleRetriever::with_equal_weights(
            vec![retriever(&["a"]), retriever(&["b"]), retriever(&["c"])],
            FusionConfig::default(),
        )
        .unwrap();

        assert_eq!(ensemble.len(), 3);
        for weight in ensemble.weights() {
            assert!((weight - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_try_new_mismatched_weights() {
        let result = EnsembleRetriever::try_new(
            vec![retriever(&["a"])],
            vec![0.5, 0.5],
            FusionConfig::default(),
        );
        assert!(matches!(
            result,
            Err(FusionError::MismatchedLengths {
                retrievers: 1,
                weights: 2
            })
        ));
    }

    #[test]
    fn test_try_new_rejects_negative_weight() {
        let result = EnsembleRetriever::try_new(
            vec![retriever(&["a"]), retriever(&["b"])],
            vec![0.5, -0.5],
            FusionConfig::default(),
        );
        assert!(matches!(
            result,
            Err(FusionError::InvalidWeight { index: 1, .. })
        ));
    }

    #[test]
    fn test_with_equal_weights_requires_retrievers() {
        let result = EnsembleRetriever::with_equal_weights(vec![], FusionConfig::default());
        assert!(matches!(result, Err(FusionError::EmptyRetrieverList)));
    }

    #[tokio::test]
    async fn test_nested_ensemble() {
        let inner = EnsembleRetriever::try_new(
            vec![retriever(&["a", "b"]), retriever(&["b"])],
            vec![0.5, 0.5],
            FusionConfig::default(),
        )
        .unwrap();
        let outer = EnsembleRetriever::try_new(
            vec![Arc::new(inner) as Arc<dyn Retriever>, retriever(&["c"])],
            vec![0.5, 0.5],
            FusionConfig::default(),
        )
        .unwrap();

        assert_eq!(outer.name(), "ensemble[ensemble[static, static], static]");

        let fused = outer.fuse("_", None).await.unwrap();
        let contents: Vec<&str> = fused
            .iter()
            .map(|s| s.document.page_content.as_str())
            .collect();
        // "b" leads the inner ranking and ties "c" at rank 0; inner comes first
        assert_eq!(contents, vec!["b", "c", "a"]);
    }
}
