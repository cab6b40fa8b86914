use hybrid_rag::cli::{Cli, Commands, ConfigAction};
use hybrid_rag::config::Config;
use hybrid_rag::document::Document;
use hybrid_rag::embedding::{EmbeddingProvider, FastEmbedProvider};
use hybrid_rag::error::{HybridError, Result};
use hybrid_rag::pipeline::{sample_documents, HybridPipeline, DEFAULT_QUERY};
use hybrid_rag::retrieval::ScoredDocument;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Demo { json } => {
            let config = load_config(cli.config, cli.profile)?;
            let top_k = config.retrieval.top_k;
            run_query(&config, sample_documents(), DEFAULT_QUERY, top_k, json)?;
        }
        Commands::Query {
            query,
            top_k,
            docs,
            dense_weight,
            sparse_weight,
            json,
        } => {
            let mut config = load_config(cli.config, cli.profile)?;
            if let Some(weight) = dense_weight {
                config.retrieval.dense_weight = weight;
            }
            if let Some(weight) = sparse_weight {
                config.retrieval.sparse_weight = weight;
            }

            let documents = if docs.is_empty() {
                sample_documents()
            } else {
                read_documents(&docs)?
            };

            let top_k = top_k.or(config.retrieval.top_k);
            run_query(&config, documents, &query, top_k, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose {
        "hybrid_rag=debug"
    } else {
        "hybrid_rag=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_query(
    config: &Config,
    documents: Vec<Document>,
    query: &str,
    top_k: Option<usize>,
    json: bool,
) -> Result<()> {
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::new(FastEmbedProvider::new(&config.embedding.model)?);

    let pipeline = HybridPipeline::build(config, provider, documents)?;
    tracing::debug!("Pipeline ready: {:?}", pipeline);

    let rt = tokio::runtime::Runtime::new().map_err(|e| HybridError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })?;
    let results = rt.block_on(pipeline.query(query, top_k))?;

    if json {
        let output = serde_json::to_string_pretty(&results).map_err(|e| HybridError::Json {
            source: e,
            context: "Failed to serialize results".to_string(),
        })?;
        println!("{}", output);
    } else {
        print_results(query, &results);
    }

    Ok(())
}

fn print_results(query: &str, results: &[ScoredDocument]) {
    println!("Query: {}", query);

    if results.is_empty() {
        println!("No results found");
        return;
    }

    for (i, result) in results.iter().enumerate() {
        println!("{}. {}", i + 1, result.document.page_content);

        let sources: Vec<String> = result
            .contributions
            .iter()
            .map(|c| format!("retriever {} @ {}", c.retriever, c.rank))
            .collect();
        println!("   score {:.6} ({})", result.score, sources.join(", "));
    }
}

fn read_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    paths
        .iter()
        .map(|path| {
            let content = std::fs::read_to_string(path).map_err(|e| HybridError::Io {
                source: e,
                context: format!("Failed to read document: {:?}", path),
            })?;
            Ok(Document::new(content).with_metadata("source", path.display().to_string()))
        })
        .collect()
}

fn cmd_config(
    config_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show { section } => {
            let config = load_config(config_path, profile)?;
            let mut value = serde_json::to_value(&config).map_err(|e| HybridError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;

            if let Some(section) = section {
                value = value.get(&section).cloned().ok_or_else(|| {
                    HybridError::Config(format!("Unknown config section: {}", section))
                })?;
            }

            let json = serde_json::to_string_pretty(&value).map_err(|e| HybridError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| HybridError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::debug!(
            "Config file not found, using defaults. Run 'hybrid-rag config init' to create one."
        );
        return default_config(&path, profile);
    }

    if let Some(profile) = profile {
        Config::load_with_profile(&path, &profile)
    } else {
        Config::load(&path)
    }
}

fn default_config(path: &Path, profile: Option<String>) -> Result<Config> {
    let mut config = Config::default();
    config.apply_env_overrides();

    if let Some(profile) = profile {
        config.apply_profile(&profile).map_err(|e| {
            HybridError::Config(format!("{} (no config file at {:?})", e, path))
        })?;
    }

    Ok(config)
}
