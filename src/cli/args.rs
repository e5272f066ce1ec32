//! Command line argument parsing for prf-rank using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalyzerKind;
use crate::config::{RunConfig, TopicField};
use crate::similarity::SimilarityKind;

/// prf-rank - pseudo-relevance feedback ranking for TREC collections
#[derive(Parser, Debug, Clone)]
#[command(name = "prf-rank")]
#[command(about = "Index TREC collections and rank topics with pseudo-relevance feedback")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct PrfRankArgs {
    /// Verbosity level (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Run configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG", env = "PRF_RANK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Summary output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl PrfRankArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n + 1,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build an index from TREC collection directories
    Index(IndexArgs),

    /// Rank a topic file against an existing index
    Search(SearchArgs),

    /// Build the index, then rank the topics
    Run(RunArgs),
}

/// Arguments for building an index
#[derive(Args, Debug, Clone)]
pub struct IndexArgs {
    /// Path to the index directory
    #[arg(value_name = "INDEX_DIR")]
    pub index_path: PathBuf,

    /// Collection directories or files
    #[arg(value_name = "CORPUS_DIR", required = true, num_args = 1..)]
    pub corpus: Vec<PathBuf>,

    /// Analyzer (defaults to the configured one)
    #[arg(short, long)]
    pub analyzer: Option<AnalyzerKind>,

    /// Overwrite an existing index
    #[arg(long)]
    pub force: bool,
}

/// Arguments for ranking a topic file
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Path to the index directory
    #[arg(value_name = "INDEX_DIR")]
    pub index_path: PathBuf,

    /// TREC topic file
    #[arg(value_name = "TOPICS")]
    pub topics: PathBuf,

    /// Results file (trec_eval format)
    #[arg(short, long, value_name = "RESULTS")]
    pub output: PathBuf,

    #[command(flatten)]
    pub overrides: RunOverrides,
}

/// Arguments for indexing and ranking in one go
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the index directory
    #[arg(value_name = "INDEX_DIR")]
    pub index_path: PathBuf,

    /// TREC topic file
    #[arg(value_name = "TOPICS")]
    pub topics: PathBuf,

    /// Collection directories or files
    #[arg(long = "corpus", value_name = "CORPUS_DIR", required = true, num_args = 1..)]
    pub corpus: Vec<PathBuf>,

    /// Results file (trec_eval format)
    #[arg(short, long, value_name = "RESULTS")]
    pub output: PathBuf,

    /// Overwrite an existing index
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub overrides: RunOverrides,
}

/// Command line overrides of the run configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOverrides {
    /// Hits mined for expansion terms
    #[arg(long)]
    pub first_pass_limit: Option<usize>,

    /// Hits written per query
    #[arg(long)]
    pub second_pass_limit: Option<usize>,

    /// Expansion terms per query
    #[arg(long)]
    pub expansion_limit: Option<usize>,

    /// Boost of the best expansion term
    #[arg(long)]
    pub expansion_term_scale: Option<f64>,

    /// Run tag written in the last column
    #[arg(long)]
    pub run_tag: Option<String>,

    /// Similarity for both passes
    #[arg(short, long)]
    pub similarity: Option<SimilarityKind>,

    /// Analyzer
    #[arg(short, long)]
    pub analyzer: Option<AnalyzerKind>,

    /// Field mined for expansion terms
    #[arg(long)]
    pub field: Option<String>,

    /// Fields searched by the query (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub search_fields: Vec<String>,

    /// Worker threads
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Per-query time budget in milliseconds
    #[arg(long)]
    pub query_timeout_ms: Option<u64>,

    /// Topic fields joined into the query (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub topic_fields: Vec<TopicField>,

    /// Stop query terms whose collection frequency exceeds this
    #[arg(long)]
    pub frequent_term_threshold: Option<u64>,
}

impl RunOverrides {
    /// Apply every given override to `config`.
    pub fn apply(&self, mut config: RunConfig) -> RunConfig {
        if let Some(limit) = self.first_pass_limit {
            config.first_pass_limit = limit;
        }
        if let Some(limit) = self.second_pass_limit {
            config.second_pass_limit = limit;
        }
        if let Some(limit) = self.expansion_limit {
            config.expansion_limit = limit;
        }
        if let Some(scale) = self.expansion_term_scale {
            config.expansion_term_scale = scale;
        }
        if let Some(tag) = &self.run_tag {
            config.run_tag = tag.clone();
        }
        if let Some(similarity) = self.similarity {
            config.similarity = similarity;
        }
        if let Some(analyzer) = self.analyzer {
            config.analyzer = analyzer;
        }
        if let Some(field) = &self.field {
            config.field = field.clone();
        }
        if !self.search_fields.is_empty() {
            config.search_fields = self.search_fields.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.query_timeout_ms.is_some() {
            config.query_timeout_ms = self.query_timeout_ms;
        }
        if !self.topic_fields.is_empty() {
            config.topic_fields = self.topic_fields.clone();
        }
        if self.frequent_term_threshold.is_some() {
            config.frequent_term_threshold = self.frequent_term_threshold;
        }
        config
    }
}

/// Output formats for command summaries
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
