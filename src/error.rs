//! Error types for prf-rank.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`PrfError`] enum. Errors fall into two groups:
//!
//! - per-query errors ([`PrfError::QueryParse`], [`PrfError::Timeout`],
//!   [`PrfError::StatisticsUnavailable`]) which the batch runner records and
//!   then moves on from;
//! - run-level errors ([`PrfError::IndexUnavailable`],
//!   [`PrfError::OutputWrite`], configuration and I/O failures) which abort
//!   the batch.
//!
//! # Examples
//!
//! ```
//! use prf_rank::error::{PrfError, Result};
//!
//! fn parse_limit(raw: &str) -> Result<usize> {
//!     raw.parse()
//!         .map_err(|_| PrfError::config(format!("not a number: {raw}")))
//! }
//!
//! assert!(parse_limit("10").is_ok());
//! assert!(parse_limit("ten").is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for prf-rank operations.
#[derive(Error, Debug)]
pub enum PrfError {
    /// I/O errors (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The index could not be opened, read or closed.
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Errors raised while building an index.
    #[error("Index error: {0}")]
    Index(String),

    /// Analysis-related errors (tokenization, filtering, etc.)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// A query string could not be parsed, even after escaping.
    #[error("Query parse error: {0}")]
    QueryParse(String),

    /// Term statistics could not be looked up for a term.
    #[error("Statistics unavailable: {0}")]
    StatisticsUnavailable(String),

    /// The results destination could not be written.
    ///
    /// `flushed` lists the query ids whose lines were completely written
    /// before the failure.
    #[error("Output write failure: {message} ({} queries flushed)", flushed.len())]
    OutputWrite { message: String, flushed: Vec<u32> },

    /// Invalid configuration values.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed corpus or topic input.
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// A query exceeded its time budget.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Binary (de)serialization errors for index segments.
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with PrfError.
pub type Result<T> = std::result::Result<T, PrfError>;

impl PrfError {
    /// Create a new index-unavailable error.
    pub fn index_unavailable<S: Into<String>>(msg: S) -> Self {
        PrfError::IndexUnavailable(msg.into())
    }

    /// Create a new index build error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        PrfError::Index(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        PrfError::Analysis(msg.into())
    }

    /// Create a new query parse error.
    pub fn query_parse<S: Into<String>>(msg: S) -> Self {
        PrfError::QueryParse(msg.into())
    }

    /// Create a new statistics-unavailable error.
    pub fn statistics<S: Into<String>>(msg: S) -> Self {
        PrfError::StatisticsUnavailable(msg.into())
    }

    /// Create a new output write error.
    pub fn output_write<S: Into<String>>(msg: S, flushed: Vec<u32>) -> Self {
        PrfError::OutputWrite {
            message: msg.into(),
            flushed,
        }
    }

    /// Create a new invalid config error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        PrfError::Config(msg.into())
    }

    /// Create a new corpus error.
    pub fn corpus<S: Into<String>>(msg: S) -> Self {
        PrfError::Corpus(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        PrfError::Timeout(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PrfError::Other(msg.into())
    }

    /// Whether this error is confined to a single query.
    ///
    /// The batch runner records these and keeps going; anything else aborts
    /// the run.
    pub fn is_query_scoped(&self) -> bool {
        matches!(
            self,
            PrfError::QueryParse(_)
                | PrfError::StatisticsUnavailable(_)
                | PrfError::Timeout(_)
                | PrfError::Analysis(_)
        )
    }
}
