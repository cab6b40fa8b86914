use crate::config::{parse_duration, Config, SCHEMA_VERSION};
use crate::error::{HybridError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_splitter(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(HybridError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.indexing.max_elements == 0 {
            errors.push(ValidationError::new(
                "indexing.max_elements",
                "Max elements must be greater than 0",
            ));
        }

        if config.indexing.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if config.indexing.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }

        if config.indexing.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }
    }

    fn validate_splitter(config: &Config, errors: &mut Vec<ValidationError>) {
        let splitter = &config.splitter;
        if splitter.chunk_size == 0 {
            errors.push(ValidationError::new(
                "splitter.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if splitter.chunk_overlap > splitter.chunk_size {
            errors.push(ValidationError::new(
                "splitter.chunk_overlap",
                format!(
                    "Chunk overlap ({}) must not exceed chunk size ({})",
                    splitter.chunk_overlap, splitter.chunk_size
                ),
            ));
        }

        if splitter.separators.is_empty() {
            errors.push(ValidationError::new(
                "splitter.separators",
                "At least one separator is required",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.dense_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.dense_k",
                "Dense k must be greater than 0",
            ));
        }

        if retrieval.sparse_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.sparse_k",
                "Sparse k must be greater than 0",
            ));
        }

        for (path, weight) in [
            ("retrieval.dense_weight", retrieval.dense_weight),
            ("retrieval.sparse_weight", retrieval.sparse_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                errors.push(ValidationError::new(
                    path,
                    format!("Weight must be a non-negative number, got {}", weight),
                ));
            }
        }

        if !retrieval.rrf_c.is_finite() || retrieval.rrf_c <= 0.0 {
            errors.push(ValidationError::new(
                "retrieval.rrf_c",
                format!("RRF constant must be positive, got {}", retrieval.rrf_c),
            ));
        }

        if retrieval.top_k == Some(0) {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0 when set",
            ));
        }

        if parse_duration(&retrieval.retriever_timeout).is_none() {
            errors.push(ValidationError::new(
                "retrieval.retriever_timeout",
                format!("Invalid duration format: {}", retrieval.retriever_timeout),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_paths(config: &Config) -> Vec<String> {
        match ConfigValidator::validate(config) {
            Err(HybridError::ConfigValidation { errors }) => {
                errors.into_iter().map(|e| e.path).collect()
            }
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_negative_weight() {
        let mut config = Config::default();
        config.retrieval.sparse_weight = -0.3;
        assert_eq!(error_paths(&config), vec!["retrieval.sparse_weight"]);
    }

    #[test]
    fn test_zero_weight_is_allowed() {
        let mut config = Config::default();
        config.retrieval.dense_weight = 0.0;
        assert!(ConfigValidator::validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_rrf_constant() {
        let mut config = Config::default();
        config.retrieval.rrf_c = 0.0;
        assert_eq!(error_paths(&config), vec!["retrieval.rrf_c"]);
    }

    #[test]
    fn test_overlap_larger_than_chunk() {
        let mut config = Config::default();
        config.splitter.chunk_overlap = 500;
        assert_eq!(error_paths(&config), vec!["splitter.chunk_overlap"]);
    }

    #[test]
    fn test_errors_accumulate() {
        let mut config = Config::default();
        config.meta.schema_version = "0.1.0".to_string();
        config.embedding.batch_size = 0;
        config.retrieval.retriever_timeout = "forever".to_string();

        let paths = error_paths(&config);
        assert_eq!(paths.len(), 3);
        assert!(paths.contains(&"retrieval.retriever_timeout".to_string()));
    }
}
