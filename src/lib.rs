//! # prf-rank
//!
//! Two-pass pseudo-relevance feedback ranking for TREC-style collections.
//!
//! Each query is run once, the top documents of that first pass are mined
//! for informative terms, and the query is run again with those terms added
//! as boosted optional clauses. The second ranking is written in trec_eval
//! format.
//!
//! ## Features
//!
//! - TREC collection and topic readers
//! - Configurable analysis pipelines and an inverted index on disk
//! - Lucene-style query parsing and boolean retrieval
//! - BM25, classic tf-idf and Dirichlet language model similarities
//! - Parallel batch execution with per-query fault isolation
//!
//! ## Example
//!
//! ```rust,no_run
//! use prf_rank::batch::{BatchRunner, QueryRequest};
//! use prf_rank::config::RunConfig;
//!
//! let runner = BatchRunner::new(RunConfig::default().with_run_tag("demo"));
//! let queries = vec![QueryRequest::new(401, "foreign minorities Germany")];
//! let report = runner.run("index", queries, "results.txt").unwrap();
//! println!("{} queries written", report.written.len());
//! ```

pub mod analysis;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod expansion;
pub mod index;
pub mod metrics;
pub mod query;
pub mod ranking;
pub mod search;
pub mod similarity;
pub mod trec;

pub mod prelude {
    pub use crate::batch::{BatchReport, BatchRunner, CancellationToken, QueryRequest};
    pub use crate::config::{RunConfig, TopicField};
    pub use crate::error::{PrfError, Result};
    pub use crate::expansion::QueryExpansionEngine;
    pub use crate::index::{Document, IndexReader, IndexWriter};
    pub use crate::ranking::RankingWriter;
    pub use crate::search::{Hit, IndexSearcher, RetrievalEngine, TermStatistics};
    pub use crate::similarity::SimilarityKind;
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
