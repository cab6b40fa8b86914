//! Fused results and their per-retriever provenance

use crate::document::Document;
use serde::{Deserialize, Serialize};

/// One retriever's share of a document's fused score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// Index of the retriever in the ensemble
    pub retriever: usize,

    /// 0-indexed position in that retriever's results
    pub rank: usize,

    /// `weight / (rank + c)`
    pub score: f64,
}

/// A document with its fused score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    /// First instance seen across the retrievers
    pub document: Document,

    /// Sum of all contributions
    pub score: f64,

    /// Which retrievers returned it, in input order
    pub contributions: Vec<Contribution>,
}

impl ScoredDocument {
    pub fn new(document: Document, contribution: Contribution) -> Self {
        Self {
            document,
            score: contribution.score,
            contributions: vec![contribution],
        }
    }

    pub fn add(&mut self, contribution: Contribution) {
        self.score += contribution.score;
        self.contributions.push(contribution);
    }

    /// Position the given retriever ranked this document at, if it returned it
    pub fn rank_in(&self, retriever: usize) -> Option<usize> {
        self.contributions
            .iter()
            .find(|c| c.retriever == retriever)
            .map(|c| c.rank)
    }

    /// First `max_chars` characters of the content
    pub fn preview(&self, max_chars: usize) -> String {
        let text = &self.document.page_content;
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.clone(),
        }
    }
}
