/// Tantivy keyword index for BM25 search
use std::sync::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::*;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyError};
use thiserror::Error;

/// Indexing memory budget shared by the writer threads
const WRITER_MEMORY_BUDGET: usize = 50_000_000;

#[derive(Error, Debug)]
pub enum KeywordIndexError {
    #[error("Index initialization failed: {0}")]
    InitializationError(String),

    #[error("Insert failed: {0}")]
    InsertError(String),

    #[error("Search failed: {0}")]
    SearchError(String),

    #[error("Tantivy error: {0}")]
    TantivyError(#[from] TantivyError),

    #[error("Index writer lock poisoned")]
    LockPoisoned,
}

/// BM25 hit with document id and score
#[derive(Debug, Clone)]
pub struct KeywordSearchResult {
    /// Document id in the `DocumentStore`
    pub id: u64,
    /// BM25 relevance score
    pub score: f32,
}

/// Tantivy index wrapper with an `id` and a `text` field
///
/// Searches go through the reader and never block on the writer.
pub struct KeywordIndex {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    id_field: Field,
    text_field: Field,
}

impl KeywordIndex {
    fn schema() -> (Schema, Field, Field) {
        let mut schema_builder = Schema::builder();
        let id_field = schema_builder.add_u64_field("id", INDEXED | STORED);
        let text_field = schema_builder.add_text_field("text", TEXT);
        (schema_builder.build(), id_field, text_field)
    }

    /// Create an index held entirely in memory
    pub fn in_memory() -> Result<Self, KeywordIndexError> {
        let (schema, id_field, text_field) = Self::schema();
        let index = Index::create_in_ram(schema);
        Self::from_index(index, id_field, text_field)
    }

    fn from_index(
        index: Index,
        id_field: Field,
        text_field: Field,
    ) -> Result<Self, KeywordIndexError> {
        let writer = index
            .writer(WRITER_MEMORY_BUDGET)
            .map_err(|e| KeywordIndexError::InitializationError(e.to_string()))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| KeywordIndexError::InitializationError(e.to_string()))?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            id_field,
            text_field,
        })
    }

    /// Stage a document; visible to searches after `commit`
    pub fn insert(&self, id: u64, text: &str) -> Result<(), KeywordIndexError> {
        let doc = doc!(
            self.id_field => id,
            self.text_field => text,
        );

        self.writer
            .lock()
            .map_err(|_| KeywordIndexError::LockPoisoned)?
            .add_document(doc)
            .map_err(|e| KeywordIndexError::InsertError(e.to_string()))?;

        Ok(())
    }

    /// Stage several documents under a single writer lock
    pub fn insert_batch(&self, items: &[(u64, String)]) -> Result<(), KeywordIndexError> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| KeywordIndexError::LockPoisoned)?;

        for (id, text) in items {
            writer
                .add_document(doc!(
                    self.id_field => *id,
                    self.text_field => text.as_str(),
                ))
                .map_err(|e| KeywordIndexError::InsertError(e.to_string()))?;
        }
        Ok(())
    }

    /// Commit pending changes and reload the reader
    pub fn commit(&self) -> Result<(), KeywordIndexError> {
        self.writer
            .lock()
            .map_err(|_| KeywordIndexError::LockPoisoned)?
            .commit()
            .map_err(|e| KeywordIndexError::InsertError(e.to_string()))?;

        self.reader
            .reload()
            .map_err(|e| KeywordIndexError::SearchError(e.to_string()))?;

        Ok(())
    }

    /// BM25 search over the text field, best first
    ///
    /// Parsing is lenient: natural-language questions with stray punctuation
    /// are searched on whatever terms could be parsed.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<KeywordSearchResult>, KeywordIndexError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let query_parser = QueryParser::for_index(&self.index, vec![self.text_field]);
        let (parsed, errors) = query_parser.parse_query_lenient(query);
        if !errors.is_empty() {
            tracing::debug!("Lenient query parse of {:?}: {} issue(s)", query, errors.len());
        }

        let top_docs = searcher
            .search(&parsed, &TopDocs::with_limit(limit))
            .map_err(|e| KeywordIndexError::SearchError(e.to_string()))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let retrieved: tantivy::TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| KeywordIndexError::SearchError(e.to_string()))?;

            let id = retrieved
                .get_first(self.id_field)
                .and_then(|v| v.as_u64())
                .ok_or_else(|| {
                    KeywordIndexError::SearchError("Missing or invalid ID field".to_string())
                })?;

            results.push(KeywordSearchResult { id, score });
        }

        Ok(results)
    }

    pub fn len(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> KeywordIndex {
        let index = KeywordIndex::in_memory().unwrap();
        index
            .insert(0, "Hybrid RAG combines semantic and keyword search for better accuracy.")
            .unwrap();
        index
            .insert(1, "Vector search retrieves results based on semantic similarity.")
            .unwrap();
        index
            .insert(2, "BM25 is a sparse retriever using keyword-based matching.")
            .unwrap();
        index
            .insert(3, "RAG pipelines integrate retrieval and generation steps.")
            .unwrap();
        index.commit().unwrap();
        index
    }

    #[test]
    fn test_in_memory_creation() {
        let index = KeywordIndex::in_memory().unwrap();
        assert_eq!(index.len(), 0);
        assert!(index.is_empty());
    }

    #[test]
    fn test_insert_and_search() {
        let index = sample_index();
        assert_eq!(index.len(), 4);

        let results = index.search("semantic", 10).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.id == 0 || r.id == 1));

        let results = index.search("bm25", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 2);
    }

    #[test]
    fn test_question_with_punctuation() {
        let index = sample_index();

        let results = index.search("How does hybrid RAG work?", 4).unwrap();
        assert_eq!(results.len(), 2);
        // Matches both "hybrid" and "rag"
        assert_eq!(results[0].id, 0);
        assert_eq!(results[1].id, 3);
    }

    #[test]
    fn test_limit() {
        let index = sample_index();
        let results = index.search("search semantic keyword", 1).unwrap();
        assert_eq!(results.len(), 1);
        assert!(index.search("search", 0).unwrap().is_empty());
    }

    #[test]
    fn test_batch_insert() {
        let index = KeywordIndex::in_memory().unwrap();
        let items = vec![
            (1, "Document one".to_string()),
            (2, "Document two".to_string()),
            (3, "Document three".to_string()),
        ];

        index.insert_batch(&items).unwrap();
        index.commit().unwrap();
        assert_eq!(index.len(), 3);
    }
}
