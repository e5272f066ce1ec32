//! Named analyzer configurations.
//!
//! The set of analyzers is closed: a configuration names one of the
//! [`AnalyzerKind`] variants and it is resolved into a concrete pipeline once
//! at startup, never per call.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::{Analyzer, PipelineAnalyzer};
use crate::analysis::token_filter::stop::{TREC_INDEX_STOP_WORDS_SET, TREC_QUERY_STOP_WORDS_SET};
use crate::analysis::token_filter::{LowercaseFilter, PossessiveFilter, StemFilter, StopFilter};
use crate::analysis::tokenizer::{RegexTokenizer, WhitespaceTokenizer};
use crate::error::{PrfError, Result};

/// Where an analyzer is used. Only [`AnalyzerKind::Custom`] differs by stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Analyzing documents while building the index.
    Index,
    /// Analyzing topics and pass-1 feedback documents.
    Query,
}

/// The analyzers a run can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    /// Regex words, lowercase, classic English stop words.
    Standard,
    /// Standard plus possessive stripping and Porter stemming.
    English,
    /// Whitespace split only; no normalization.
    Whitespace,
    /// The TREC pipeline: regex words, lowercase, possessives, extended
    /// stop list (stage dependent), Porter stemming.
    #[default]
    Custom,
}

impl AnalyzerKind {
    /// Build the analyzer for the given stage.
    pub fn build(self, stage: Stage) -> Result<Arc<dyn Analyzer>> {
        let analyzer = self.pipeline(stage)?;
        Ok(Arc::new(analyzer.with_name(format!("{self}_{}", stage.as_str()))))
    }

    fn pipeline(self, stage: Stage) -> Result<PipelineAnalyzer> {
        let analyzer = match self {
            AnalyzerKind::Standard => PipelineAnalyzer::new(Arc::new(RegexTokenizer::new()?))
                .add_filter(Arc::new(LowercaseFilter::new()))
                .add_filter(Arc::new(StopFilter::new())),
            AnalyzerKind::English => PipelineAnalyzer::new(Arc::new(RegexTokenizer::new()?))
                .add_filter(Arc::new(LowercaseFilter::new()))
                .add_filter(Arc::new(PossessiveFilter::new()))
                .add_filter(Arc::new(StopFilter::new()))
                .add_filter(Arc::new(StemFilter::new())),
            AnalyzerKind::Whitespace => PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new())),
            AnalyzerKind::Custom => {
                let stop_words = match stage {
                    Stage::Index => TREC_INDEX_STOP_WORDS_SET.clone(),
                    Stage::Query => TREC_QUERY_STOP_WORDS_SET.clone(),
                };
                PipelineAnalyzer::new(Arc::new(RegexTokenizer::new()?))
                    .add_filter(Arc::new(LowercaseFilter::new()))
                    .add_filter(Arc::new(PossessiveFilter::new()))
                    .add_filter(Arc::new(StopFilter::with_stop_words(stop_words)))
                    .add_filter(Arc::new(StemFilter::new()))
            }
        };
        Ok(analyzer)
    }

    /// Build the analyzer for `stage` with extra stop words removed after
    /// every other filter has run.
    ///
    /// The extra words are matched against final (stemmed) terms, so they
    /// can be taken straight from the index vocabulary.
    pub fn build_with_stop_words(
        self,
        stage: Stage,
        extra_stop_words: HashSet<String>,
    ) -> Result<Arc<dyn Analyzer>> {
        if extra_stop_words.is_empty() {
            return self.build(stage);
        }

        let analyzer = self
            .pipeline(stage)?
            .add_filter(Arc::new(StopFilter::with_stop_words(extra_stop_words)));
        Ok(Arc::new(analyzer.with_name(format!("{self}_{}+frequent", stage.as_str()))))
    }

    /// The configuration name of this analyzer.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::Standard => "standard",
            AnalyzerKind::English => "english",
            AnalyzerKind::Whitespace => "whitespace",
            AnalyzerKind::Custom => "custom",
        }
    }
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::Index => "index",
            Stage::Query => "query",
        }
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyzerKind {
    type Err = PrfError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "standard" => Ok(AnalyzerKind::Standard),
            "english" => Ok(AnalyzerKind::English),
            "whitespace" => Ok(AnalyzerKind::Whitespace),
            "custom" => Ok(AnalyzerKind::Custom),
            other => Err(PrfError::config(format!("unknown analyzer: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_analyzer_stages() {
        let index = AnalyzerKind::Custom.build(Stage::Index).unwrap();
        let query = AnalyzerKind::Custom.build(Stage::Query).unwrap();

        let text = "The nation's satellites also haven't orbited";
        assert_eq!(
            index.terms(text).unwrap(),
            vec!["nation", "satellit", "also", "orbit"]
        );
        assert_eq!(query.terms(text).unwrap(), vec!["nation", "satellit", "orbit"]);
        assert_eq!(query.name(), "custom_query");
    }

    #[test]
    fn test_whitespace_analyzer_keeps_case() {
        let analyzer = AnalyzerKind::Whitespace.build(Stage::Query).unwrap();
        assert_eq!(analyzer.terms("The Cat").unwrap(), vec!["The", "Cat"]);
    }

    #[test]
    fn test_extra_stop_words_apply_to_stemmed_terms() {
        let extra: HashSet<String> = ["satellit".to_string()].into_iter().collect();
        let analyzer = AnalyzerKind::Custom
            .build_with_stop_words(Stage::Query, extra)
            .unwrap();

        assert_eq!(
            analyzer.terms("satellites orbit").unwrap(),
            vec!["orbit".to_string()]
        );
        assert_eq!(analyzer.name(), "custom_query+frequent");
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "English".parse::<AnalyzerKind>().unwrap(),
            AnalyzerKind::English
        );
        assert!("snowball".parse::<AnalyzerKind>().is_err());
    }
}
