//! Tokenizer implementations for text analysis.
//!
//! Tokenizers are the first stage of an analyzer: they split raw text into
//! [`Token`](crate::analysis::token::Token)s that the filters then rewrite.
//!
//! - [`RegexTokenizer`] - word extraction by regular expression (default)
//! - [`WhitespaceTokenizer`] - splits on whitespace only

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for tokenizers that convert text into tokens.
///
/// The trait requires `Send + Sync` so analyzers can be shared between the
/// query workers of a batch.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod regex;
pub mod whitespace;

pub use regex::RegexTokenizer;
pub use whitespace::WhitespaceTokenizer;
