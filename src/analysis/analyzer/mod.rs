//! Analyzers combine a tokenizer with a chain of filters.
//!
//! ```text
//! Raw Text → Tokenizer → Filter 1 → ... → Filter N → Token Stream
//! ```
//!
//! Concrete pipelines are built by [`AnalyzerKind::build`], which resolves a
//! configured analyzer name once into an `Arc<dyn Analyzer>` for a given
//! [`Stage`].

pub mod kind;
pub mod pipeline;

use crate::analysis::token::TokenStream;
use crate::error::Result;

pub use kind::{AnalyzerKind, Stage};
pub use pipeline::PipelineAnalyzer;

/// Trait for analyzers that convert text into processed tokens.
///
/// The trait requires `Send + Sync` so one analyzer instance can serve every
/// query worker in a batch.
pub trait Analyzer: Send + Sync + std::fmt::Debug {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &str;

    /// Analyze `text` and keep only the surface forms of the surviving tokens.
    fn terms(&self, text: &str) -> Result<Vec<String>> {
        Ok(self
            .analyze(text)?
            .filter(|token| !token.is_empty())
            .map(|token| token.text)
            .collect())
    }
}
