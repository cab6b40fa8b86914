//! Per-list deduplication by document identity

use crate::document::Document;
use std::collections::HashSet;

/// A document with its identity key and position in the list it came from
#[derive(Debug, Clone)]
pub struct RankedDocument {
    pub rank: usize,
    pub key: String,
    pub document: Document,
}

/// Keep the first occurrence of each identity, preserving original positions
///
/// A retriever that repeats a document is credited once, at the best rank it
/// gave it. Later documents keep their original position.
pub fn first_occurrences(documents: Vec<Document>, id_key: Option<&str>) -> Vec<RankedDocument> {
    let mut seen: HashSet<String> = HashSet::new();

    documents
        .into_iter()
        .enumerate()
        .filter_map(|(rank, document)| {
            let key = document.identity_key(id_key);
            seen.insert(key.clone()).then_some(RankedDocument {
                rank,
                key,
                document,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduplication() {
        let docs = vec![
            Document::new("a"),
            Document::new("b"),
            Document::new("a"), // Duplicate
            Document::new("c"),
        ];

        let ranked = first_occurrences(docs, None);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].document.page_content, "a");
        assert_eq!(ranked[0].rank, 0);
        // "c" keeps its original position
        assert_eq!(ranked[2].document.page_content, "c");
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn test_deduplication_by_id_key() {
        let docs = vec![
            Document::new("a").with_metadata("id", 1),
            Document::new("b").with_metadata("id", 1),
        ];

        assert_eq!(first_occurrences(docs.clone(), None).len(), 2);
        assert_eq!(first_occurrences(docs, Some("id")).len(), 1);
    }
}
