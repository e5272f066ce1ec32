//! Token filter implementations for token transformation.
//!
//! Filters receive the stream produced by a tokenizer (or by the previous
//! filter) and return a new one:
//!
//! ```text
//! Tokenizer → Lowercase → Possessive → Stop Words → Stemmer
//! ```

use crate::analysis::token::TokenStream;
use crate::error::Result;

/// Trait for filters that transform token streams.
pub trait Filter: Send + Sync {
    /// Apply this filter to a token stream.
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream>;

    /// Get the name of this filter (for debugging and configuration).
    fn name(&self) -> &'static str;
}

pub mod lowercase;
pub mod possessive;
pub mod stem;
pub mod stop;

pub use lowercase::LowercaseFilter;
pub use possessive::PossessiveFilter;
pub use stem::{PorterStemmer, StemFilter, Stemmer};
pub use stop::StopFilter;
