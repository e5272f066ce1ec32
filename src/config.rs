//! Run configuration.
//!
//! A [`RunConfig`] is loaded from JSON (every key optional, unknown keys
//! rejected), overridden from the command line, and validated once before a
//! batch starts. Everything downstream reads its limits from here; there are
//! no global constants.
//!
//! # Example
//!
//! ```
//! use prf_rank::config::RunConfig;
//! use prf_rank::similarity::SimilarityKind;
//!
//! let config = RunConfig::default()
//!     .with_similarity(SimilarityKind::Classic)
//!     .with_expansion_term_scale(0.3)
//!     .with_run_tag("classic-prf");
//! assert!(config.validate().is_ok());
//! assert_eq!(config.search_fields(), vec!["text".to_string()]);
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalyzerKind;
use crate::error::{PrfError, Result};
use crate::index::TEXT_FIELD;
use crate::similarity::SimilarityKind;

/// Topic subfields that can make up a query's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TopicField {
    /// The short `<title>`.
    Title,
    /// The one-sentence `<desc>`.
    Description,
    /// The `<narr>` paragraph.
    Narrative,
}

impl fmt::Display for TopicField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TopicField::Title => "title",
            TopicField::Description => "description",
            TopicField::Narrative => "narrative",
        })
    }
}

/// Configuration of a ranking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Hits kept from the first pass and mined for expansion terms.
    pub first_pass_limit: usize,

    /// Hits kept from the second pass; this is the ranking written out.
    pub second_pass_limit: usize,

    /// Number of expansion terms added to a query.
    pub expansion_limit: usize,

    /// Boost given to the best expansion term; others are scaled below it.
    pub expansion_term_scale: f64,

    /// Last column of every results line.
    pub run_tag: String,

    /// Similarity used for both passes.
    pub similarity: SimilarityKind,

    /// Field whose stored text feeds expansion and whose statistics weight
    /// the expansion terms.
    pub field: String,

    /// Fields searched by the parsed query. Empty means `[field]`.
    pub search_fields: Vec<String>,

    /// Analyzer family for indexing and querying.
    pub analyzer: AnalyzerKind,

    /// Worker threads for the batch.
    pub threads: usize,

    /// Per-query time budget in milliseconds.
    pub query_timeout_ms: Option<u64>,

    /// Topic subfields joined into the query text, in this order.
    pub topic_fields: Vec<TopicField>,

    /// Terms of `field` whose collection frequency exceeds this threshold
    /// are added to the query-stage stop list.
    pub frequent_term_threshold: Option<u64>,

    /// How many of the most frequent terms are checked against
    /// `frequent_term_threshold`.
    pub frequent_term_candidates: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            first_pass_limit: 10,
            second_pass_limit: 1000,
            expansion_limit: 20,
            expansion_term_scale: 0.5,
            run_tag: "prf-rank".to_string(),
            similarity: SimilarityKind::default(),
            field: TEXT_FIELD.to_string(),
            search_fields: Vec::new(),
            analyzer: AnalyzerKind::default(),
            threads: num_cpus::get(),
            query_timeout_ms: None,
            topic_fields: vec![
                TopicField::Title,
                TopicField::Description,
                TopicField::Narrative,
            ],
            frequent_term_threshold: None,
            frequent_term_candidates: 500,
        }
    }
}

impl RunConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            PrfError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        let config: RunConfig = serde_json::from_str(&raw)
            .map_err(|e| PrfError::config(format!("invalid config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value; the first problem found is reported.
    pub fn validate(&self) -> Result<()> {
        if self.first_pass_limit == 0 {
            return Err(PrfError::config("first_pass_limit must be positive"));
        }
        if self.second_pass_limit == 0 {
            return Err(PrfError::config("second_pass_limit must be positive"));
        }
        if self.expansion_limit == 0 {
            return Err(PrfError::config("expansion_limit must be positive"));
        }
        if !self.expansion_term_scale.is_finite() || self.expansion_term_scale < 0.0 {
            return Err(PrfError::config(format!(
                "expansion_term_scale must be finite and non-negative, got {}",
                self.expansion_term_scale
            )));
        }
        if self.run_tag.is_empty() || self.run_tag.chars().any(char::is_whitespace) {
            return Err(PrfError::config(format!(
                "run_tag must be non-empty without whitespace, got {:?}",
                self.run_tag
            )));
        }
        if self.field.trim().is_empty() || self.search_fields.iter().any(|f| f.trim().is_empty())
        {
            return Err(PrfError::config("field names must be non-empty"));
        }
        if self.threads == 0 {
            return Err(PrfError::config("threads must be positive"));
        }
        if self.query_timeout_ms == Some(0) {
            return Err(PrfError::config("query_timeout_ms must be positive"));
        }
        if self.topic_fields.is_empty() {
            return Err(PrfError::config("topic_fields must name at least one field"));
        }
        if self.frequent_term_threshold.is_some() && self.frequent_term_candidates == 0 {
            return Err(PrfError::config("frequent_term_candidates must be positive"));
        }
        Ok(())
    }

    /// Fields searched by the parsed query.
    pub fn search_fields(&self) -> Vec<String> {
        if self.search_fields.is_empty() {
            vec![self.field.clone()]
        } else {
            self.search_fields.clone()
        }
    }

    /// The per-query time budget.
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    /// Set the first pass limit.
    pub fn with_first_pass_limit(mut self, limit: usize) -> Self {
        self.first_pass_limit = limit;
        self
    }

    /// Set the second pass limit.
    pub fn with_second_pass_limit(mut self, limit: usize) -> Self {
        self.second_pass_limit = limit;
        self
    }

    /// Set the number of expansion terms.
    pub fn with_expansion_limit(mut self, limit: usize) -> Self {
        self.expansion_limit = limit;
        self
    }

    /// Set the boost of the best expansion term.
    pub fn with_expansion_term_scale(mut self, scale: f64) -> Self {
        self.expansion_term_scale = scale;
        self
    }

    /// Set the run tag.
    pub fn with_run_tag<S: Into<String>>(mut self, run_tag: S) -> Self {
        self.run_tag = run_tag.into();
        self
    }

    /// Set the similarity.
    pub fn with_similarity(mut self, similarity: SimilarityKind) -> Self {
        self.similarity = similarity;
        self
    }

    /// Set the analyzer.
    pub fn with_analyzer(mut self, analyzer: AnalyzerKind) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Set the expansion field.
    pub fn with_field<S: Into<String>>(mut self, field: S) -> Self {
        self.field = field.into();
        self
    }

    /// Set the searched fields.
    pub fn with_search_fields(mut self, fields: Vec<String>) -> Self {
        self.search_fields = fields;
        self
    }

    /// Set the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the per-query timeout.
    pub fn with_query_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.query_timeout_ms = timeout_ms;
        self
    }

    /// Set the topic fields.
    pub fn with_topic_fields(mut self, fields: Vec<TopicField>) -> Self {
        self.topic_fields = fields;
        self
    }

    /// Enable the frequent-term stop list.
    pub fn with_frequent_term_threshold(mut self, threshold: Option<u64>) -> Self {
        self.frequent_term_threshold = threshold;
        self
    }
}
