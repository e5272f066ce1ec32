//! TREC ad hoc topic files.
//!
//! ```text
//! <top>
//! <num> Number: 401
//! <title> foreign minorities, Germany
//! <desc> Description:
//! What language and cultural differences impede the integration
//! of foreign minorities in Germany?
//! <narr> Narrative:
//! A relevant document will focus on the causes of the lack of
//! integration in a significant way.
//! </top>
//! ```
//!
//! Elements are not closed; each runs until the next tag.

use std::fs;
use std::path::Path;

use log::{info, warn};
use regex::Regex;

use crate::batch::QueryRequest;
use crate::config::TopicField;
use crate::error::{PrfError, Result};

/// Record delimiter of TREC topic files.
pub const TOPIC_SEPARATOR: &str = "<top>";

/// One information need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topic {
    /// Topic number.
    pub id: u32,
    /// Short keyword title.
    pub title: String,
    /// One-sentence description, without its label.
    pub description: String,
    /// Narrative, without its label and the boilerplate words that every
    /// narrative repeats.
    pub narrative: String,
}

impl Topic {
    /// The value of one subfield.
    pub fn field(&self, field: TopicField) -> &str {
        match field {
            TopicField::Title => &self.title,
            TopicField::Description => &self.description,
            TopicField::Narrative => &self.narrative,
        }
    }

    /// The non-empty `fields`, in order, joined by spaces.
    pub fn text(&self, fields: &[TopicField]) -> String {
        fields
            .iter()
            .map(|&f| self.field(f))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A query for this topic built from `fields`.
    pub fn to_request(&self, fields: &[TopicField]) -> QueryRequest {
        QueryRequest::new(self.id, self.text(fields))
    }
}

/// Parser for TREC topic files.
#[derive(Debug, Clone)]
pub struct TopicParser {
    num: Regex,
    title: Regex,
    desc: Regex,
    narr: Regex,
    number_label: Regex,
    description_label: Regex,
    narrative_label: Regex,
    boilerplate: Regex,
}

impl TopicParser {
    /// Create a new parser.
    pub fn new() -> Result<Self> {
        Ok(TopicParser {
            num: element_regex("num")?,
            title: element_regex("title")?,
            desc: element_regex("desc")?,
            narr: element_regex("narr")?,
            number_label: compile(r"(?i)^number:")?,
            description_label: compile(r"(?i)^description:")?,
            narrative_label: compile(r"(?i)^narrative:")?,
            boilerplate: compile(r"\b(?:relevant|documents|document)\b")?,
        })
    }

    /// Parse every topic in `raw`, in file order.
    ///
    /// Topics whose number cannot be read are skipped with a warning.
    pub fn parse(&self, raw: &str) -> Vec<Topic> {
        let mut topics = Vec::new();
        for (position, chunk) in raw.split(TOPIC_SEPARATOR).enumerate() {
            if chunk.trim().is_empty() {
                continue;
            }
            match self.parse_topic(chunk) {
                Ok(topic) => topics.push(topic),
                Err(e) => warn!("topic {position}: {e}, skipping"),
            }
        }
        topics
    }

    /// Parse the body of one `<top>` element.
    pub fn parse_topic(&self, chunk: &str) -> Result<Topic> {
        let num = element(&self.num, chunk)
            .ok_or_else(|| PrfError::corpus("missing <num>"))?;
        let num = self.number_label.replace(&num, "");
        let id = num
            .trim()
            .parse::<u32>()
            .map_err(|_| PrfError::corpus(format!("bad topic number {:?}", num.trim())))?;

        let title = element(&self.title, chunk).unwrap_or_default();
        let description = element(&self.desc, chunk)
            .map(|d| normalize(&self.description_label.replace(&d, "")))
            .unwrap_or_default();
        let narrative = element(&self.narr, chunk)
            .map(|n| {
                let n = self.narrative_label.replace(&n, "");
                normalize(&self.boilerplate.replace_all(&n, " "))
            })
            .unwrap_or_default();

        Ok(Topic {
            id,
            title,
            description,
            narrative,
        })
    }
}

/// Whitespace-normalized text following `<name>`, up to the next tag.
fn element(pattern: &Regex, chunk: &str) -> Option<String> {
    pattern
        .captures(chunk)
        .and_then(|caps| caps.get(1))
        .map(|m| normalize(m.as_str()))
}

fn element_regex(name: &str) -> Result<Regex> {
    compile(&format!(r"(?i)<{name}>([^<]*)"))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PrfError::corpus(format!("invalid pattern {pattern}: {e}")))
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Read and parse a topic file.
pub fn read_topics<P: AsRef<Path>>(path: P) -> Result<Vec<Topic>> {
    let path = path.as_ref();
    let bytes = fs::read(path)
        .map_err(|e| PrfError::corpus(format!("cannot read topics {}: {e}", path.display())))?;
    let topics = TopicParser::new()?.parse(&String::from_utf8_lossy(&bytes));
    info!("read {} topics from {}", topics.len(), path.display());
    Ok(topics)
}
