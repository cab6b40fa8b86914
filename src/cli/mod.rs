//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "hybrid-rag",
    version,
    about = "Hybrid dense + BM25 retrieval with weighted reciprocal rank fusion",
    long_about = "hybrid-rag splits documents into chunks, indexes them for both semantic (vector) \
                  and keyword (BM25) search, and merges the two rankings with weighted Reciprocal \
                  Rank Fusion."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/hybrid-rag/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile to apply on top of the config file
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the default query against the four sample documents
    Demo {
        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Query documents using semantic and keyword search
    Query {
        /// Search query text
        query: String,

        /// Maximum number of results to return (all fused results when omitted)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Text files to index instead of the sample documents
        #[arg(short, long, value_name = "FILE")]
        docs: Vec<PathBuf>,

        /// Override the dense retriever weight
        #[arg(long)]
        dense_weight: Option<f64>,

        /// Override the sparse retriever weight
        #[arg(long)]
        sparse_weight: Option<f64>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show only a specific section (e.g. "retrieval")
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
