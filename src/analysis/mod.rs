//! Text analysis: tokenization, filtering and analysis pipelines.

pub mod analyzer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use analyzer::{Analyzer, AnalyzerKind, PipelineAnalyzer, Stage};
pub use token::{Token, TokenStream};
