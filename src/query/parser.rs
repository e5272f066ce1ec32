//! Query parser for converting query strings to structured query objects.
//!
//! The accepted language is the core of the classic Lucene syntax:
//!
//! - bare words, analyzed with the query-stage analyzer: `satellite`
//! - fielded words: `headline:satellite`
//! - boosts: `satellite^2.5`, `(orbit launch)^0.5`
//! - required / prohibited clauses: `+satellite -rocket`, `!rocket`
//! - conjunctions: `satellite AND orbit`, `a OR b`, `NOT c`, `&&`, `||`
//! - grouping: `(satellite OR probe) AND launch`
//! - quoted phrases, matched as a conjunction of their terms
//! - backslash escapes for every special character (see [`escape`])
//!
//! Wildcards, fuzzy terms, ranges and regular expressions are rejected.

use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

use crate::analysis::Analyzer;
use crate::error::{PrfError, Result};
use crate::query::{BooleanClause, BooleanQuery, Occur, Query, TermQuery};

/// Characters with a meaning in the query language.
pub const SPECIAL_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
    '/',
];

/// Maximum number of clauses in a single boolean query.
pub const MAX_CLAUSE_COUNT: usize = 1024;

/// Backslash-escape every special character so `text` parses as plain words.
///
/// ```
/// use prf_rank::query::escape;
///
/// assert_eq!(escape("C++ (language)?"), r"C\+\+ \(language\)\?");
/// ```
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        if SPECIAL_CHARS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Parses query strings over one or more fields.
#[derive(Debug, Clone)]
pub struct QueryParser {
    /// Fields searched by unfielded words.
    fields: Vec<String>,
    /// Analyzer applied to every word and phrase.
    analyzer: Arc<dyn Analyzer>,
}

impl QueryParser {
    /// Create a parser searching `field` by default.
    pub fn new<S: Into<String>>(field: S, analyzer: Arc<dyn Analyzer>) -> Self {
        QueryParser {
            fields: vec![field.into()],
            analyzer,
        }
    }

    /// Create a parser whose unfielded words are searched in every field.
    pub fn multi_field(fields: Vec<String>, analyzer: Arc<dyn Analyzer>) -> Result<Self> {
        if fields.is_empty() {
            return Err(PrfError::config("query parser needs at least one field"));
        }
        Ok(QueryParser { fields, analyzer })
    }

    /// Parse a query string into a Query object.
    ///
    /// A string that analyzes to nothing (only stop words, say) yields an
    /// empty [`BooleanQuery`]; an empty or blank string is a parse error.
    pub fn parse(&self, query_str: &str) -> Result<Box<dyn Query>> {
        if query_str.trim().is_empty() {
            return Err(PrfError::query_parse(format!(
                "cannot parse '{query_str}': empty query"
            )));
        }

        let lexemes = Lexer::new(query_str)
            .tokenize()
            .map_err(|e| PrfError::query_parse(format!("cannot parse '{query_str}': {e}")))?;

        let mut parser = Parser {
            lexemes: lexemes.into_iter().peekable(),
            query_parser: self,
            scope: None,
        };
        let query = parser
            .parse_top()
            .map_err(|e| PrfError::query_parse(format!("cannot parse '{query_str}': {e}")))?;

        Ok(query.unwrap_or_else(|| Box::new(BooleanQuery::new())))
    }

    /// Build the query for one analyzed word.
    fn word_query(&self, field: Option<&str>, text: &str) -> Result<Option<Box<dyn Query>>> {
        let terms = self.analyzer.terms(text)?;
        Ok(self.per_field(field, |f| combine(f, &terms, Occur::Should)))
    }

    /// Build the query for a quoted phrase.
    fn phrase_query(&self, field: Option<&str>, text: &str) -> Result<Option<Box<dyn Query>>> {
        let terms = self.analyzer.terms(text)?;
        Ok(self.per_field(field, |f| combine(f, &terms, Occur::Must)))
    }

    fn per_field<F>(&self, field: Option<&str>, build: F) -> Option<Box<dyn Query>>
    where
        F: Fn(&str) -> Option<Box<dyn Query>>,
    {
        if let Some(field) = field {
            return build(field);
        }

        let mut per_field: Vec<Box<dyn Query>> =
            self.fields.iter().filter_map(|f| build(f.as_str())).collect();
        match per_field.len() {
            0 => None,
            1 => per_field.pop(),
            _ => {
                let mut query = BooleanQuery::new();
                for q in per_field {
                    query.add_should(q);
                }
                Some(Box::new(query))
            }
        }
    }
}

/// Combine the terms of one word or phrase in `field`.
fn combine(field: &str, terms: &[String], occur: Occur) -> Option<Box<dyn Query>> {
    match terms {
        [] => None,
        [term] => Some(Box::new(TermQuery::new(field, term.as_str()))),
        _ => {
            let mut query = BooleanQuery::new();
            for term in terms {
                query.add_clause(BooleanClause::new(
                    Box::new(TermQuery::new(field, term.as_str())),
                    occur,
                ));
            }
            Some(Box::new(query))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Word(String),
    Phrase(String),
    Field(String),
    Boost(f32),
    Plus,
    Minus,
    Not,
    And,
    Or,
    LParen,
    RParen,
}

/// Splits a query string into lexemes, resolving escapes.
struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(mut self) -> std::result::Result<Vec<Lexeme>, String> {
        let mut lexemes = Vec::new();

        while let Some(&ch) = self.chars.peek() {
            match ch {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '(' => {
                    self.chars.next();
                    lexemes.push(Lexeme::LParen);
                }
                ')' => {
                    self.chars.next();
                    lexemes.push(Lexeme::RParen);
                }
                '+' => {
                    self.chars.next();
                    lexemes.push(Lexeme::Plus);
                }
                '-' => {
                    self.chars.next();
                    lexemes.push(Lexeme::Minus);
                }
                '!' => {
                    self.chars.next();
                    lexemes.push(Lexeme::Not);
                }
                '"' => {
                    self.chars.next();
                    lexemes.push(Lexeme::Phrase(self.read_phrase()?));
                }
                '^' => {
                    self.chars.next();
                    lexemes.push(Lexeme::Boost(self.read_boost()?));
                }
                ':' => return Err("empty field name".to_string()),
                _ => {
                    let (word, raw) = self.read_word()?;
                    if self.chars.peek() == Some(&':') {
                        self.chars.next();
                        lexemes.push(Lexeme::Field(word));
                        continue;
                    }
                    lexemes.push(match raw.as_str() {
                        "AND" | "&&" => Lexeme::And,
                        "OR" | "||" => Lexeme::Or,
                        "NOT" => Lexeme::Not,
                        _ => Lexeme::Word(word),
                    });
                }
            }
        }

        Ok(lexemes)
    }

    /// Read a word. Returns the unescaped text and the raw source text, so
    /// an escaped `\AND` is not mistaken for the operator.
    fn read_word(&mut self) -> std::result::Result<(String, String), String> {
        let mut word = String::new();
        let mut raw = String::new();

        while let Some(&ch) = self.chars.peek() {
            match ch {
                c if c.is_whitespace() => break,
                '(' | ')' | '"' | '^' | ':' => break,
                '\\' => {
                    self.chars.next();
                    let escaped = self
                        .chars
                        .next()
                        .ok_or_else(|| "trailing backslash".to_string())?;
                    word.push(escaped);
                    raw.push('\\');
                    raw.push(escaped);
                }
                '*' | '?' | '~' | '[' | ']' | '{' | '}' | '/' => {
                    return Err(format!("unsupported syntax '{ch}'"));
                }
                _ => {
                    self.chars.next();
                    word.push(ch);
                    raw.push(ch);
                }
            }
        }

        Ok((word, raw))
    }

    fn read_phrase(&mut self) -> std::result::Result<String, String> {
        let mut phrase = String::new();
        loop {
            match self.chars.next() {
                None => return Err("unterminated phrase".to_string()),
                Some('"') => return Ok(phrase),
                Some('\\') => match self.chars.next() {
                    Some(escaped) => phrase.push(escaped),
                    None => return Err("trailing backslash".to_string()),
                },
                Some(ch) => phrase.push(ch),
            }
        }
    }

    fn read_boost(&mut self) -> std::result::Result<f32, String> {
        let mut number = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() || ch == '.' {
                number.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }

        if number.is_empty() {
            return Err("'^' must be followed by a number".to_string());
        }
        number
            .parse::<f32>()
            .map_err(|_| format!("invalid boost '{number}'"))
    }
}

/// Recursive-descent parser over lexemes.
struct Parser<'p> {
    lexemes: Peekable<std::vec::IntoIter<Lexeme>>,
    query_parser: &'p QueryParser,
    /// Field set by an enclosing `field:( ... )` group.
    scope: Option<String>,
}

type ParseResult<T> = std::result::Result<T, String>;

impl Parser<'_> {
    fn parse_top(&mut self) -> ParseResult<Option<Box<dyn Query>>> {
        let query = self.parse_clauses()?;
        match self.lexemes.next() {
            None => Ok(query),
            Some(Lexeme::RParen) => Err("unbalanced ')'".to_string()),
            Some(other) => Err(format!("unexpected {other:?}")),
        }
    }

    /// Parse a clause list up to a closing parenthesis or the end of input.
    fn parse_clauses(&mut self) -> ParseResult<Option<Box<dyn Query>>> {
        let mut clauses: Vec<(Occur, Option<Box<dyn Query>>)> = Vec::new();

        loop {
            let conjunction = match self.lexemes.peek() {
                None | Some(Lexeme::RParen) => break,
                Some(Lexeme::And) | Some(Lexeme::Or) => {
                    let conj = self.lexemes.next();
                    if clauses.is_empty() {
                        return Err("conjunction without a left operand".to_string());
                    }
                    conj
                }
                _ => None,
            };

            let modifier = match self.lexemes.peek() {
                Some(Lexeme::Plus) => Some(Occur::Must),
                Some(Lexeme::Minus) | Some(Lexeme::Not) => Some(Occur::MustNot),
                _ => None,
            };
            if modifier.is_some() {
                self.lexemes.next();
            }

            let query = self.parse_clause().map_err(|e| match (&conjunction, modifier) {
                (None, None) => e,
                _ => format!("dangling operator: {e}"),
            })?;

            let mut occur = modifier.unwrap_or(Occur::Should);
            if conjunction == Some(Lexeme::And) {
                if let Some(last) = clauses.last_mut() {
                    if last.0 == Occur::Should {
                        last.0 = Occur::Must;
                    }
                }
                if modifier.is_none() {
                    occur = Occur::Must;
                }
            }
            clauses.push((occur, query));
        }

        let clauses: Vec<(Occur, Box<dyn Query>)> = clauses
            .into_iter()
            .filter_map(|(occur, query)| query.map(|q| (occur, q)))
            .collect();
        if clauses.len() > MAX_CLAUSE_COUNT {
            return Err(format!(
                "too many clauses ({} > {MAX_CLAUSE_COUNT})",
                clauses.len()
            ));
        }

        match clauses.len() {
            0 => Ok(None),
            1 if clauses[0].0 == Occur::Should => Ok(clauses.into_iter().next().map(|(_, q)| q)),
            _ => {
                let mut query = BooleanQuery::new();
                for (occur, q) in clauses {
                    query.add_clause(BooleanClause::new(q, occur));
                }
                Ok(Some(Box::new(query)))
            }
        }
    }

    /// Parse one clause: an optional field, a value, and an optional boost.
    fn parse_clause(&mut self) -> ParseResult<Option<Box<dyn Query>>> {
        let field = match self.lexemes.next_if(|l| matches!(l, Lexeme::Field(_))) {
            Some(Lexeme::Field(name)) => Some(name),
            _ => None,
        };
        let target = field.clone().or_else(|| self.scope.clone());

        let query = match self.lexemes.next() {
            Some(Lexeme::Word(word)) => self
                .query_parser
                .word_query(target.as_deref(), &word)
                .map_err(|e| e.to_string())?,
            Some(Lexeme::Phrase(phrase)) => self
                .query_parser
                .phrase_query(target.as_deref(), &phrase)
                .map_err(|e| e.to_string())?,
            Some(Lexeme::LParen) => {
                let outer = std::mem::replace(&mut self.scope, target);
                let inner = self.parse_clauses();
                self.scope = outer;
                let inner = inner?;
                match self.lexemes.next() {
                    Some(Lexeme::RParen) => inner,
                    _ => return Err("missing ')'".to_string()),
                }
            }
            Some(other) => return Err(format!("unexpected {other:?}")),
            None => {
                return Err(match field {
                    Some(f) => format!("missing value for field '{f}'"),
                    None => "unexpected end of query".to_string(),
                });
            }
        };

        if let Some(&Lexeme::Boost(boost)) = self.lexemes.peek() {
            self.lexemes.next();
            return Ok(query.map(|mut q| {
                q.set_boost(q.boost() * boost);
                q
            }));
        }
        Ok(query)
    }
}
