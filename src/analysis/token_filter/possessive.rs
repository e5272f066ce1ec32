//! English possessive filter.
//!
//! Strips a trailing `'s` (ASCII or typographic apostrophe) so that
//! "nation's" indexes as "nation".

use crate::analysis::token::TokenStream;
use crate::analysis::token_filter::Filter;
use crate::error::Result;

const SUFFIXES: [&str; 4] = ["'s", "'S", "\u{2019}s", "\u{2019}S"];

/// A filter that removes English possessive suffixes.
#[derive(Clone, Debug, Default)]
pub struct PossessiveFilter;

impl PossessiveFilter {
    /// Create a new possessive filter.
    pub fn new() -> Self {
        PossessiveFilter
    }
}

impl Filter for PossessiveFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let filtered_tokens = tokens
            .map(|token| match SUFFIXES.iter().find_map(|s| token.text.strip_suffix(s)) {
                Some(stem) if !stem.is_empty() => {
                    let stem = stem.to_string();
                    token.with_text(stem)
                }
                _ => token,
            })
            .collect::<Vec<_>>();

        Ok(Box::new(filtered_tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "possessive"
    }
}
