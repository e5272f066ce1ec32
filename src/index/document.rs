//! Documents as they are stored in the index.

use serde::{Deserialize, Serialize};

/// The external identifier field. Stored verbatim, never analyzed.
pub const DOCNO_FIELD: &str = "docno";

/// The headline field. Stored and analyzed.
pub const HEADLINE_FIELD: &str = "headline";

/// The body text field. Stored and analyzed.
pub const TEXT_FIELD: &str = "text";

/// A document with the three fields of a TREC news record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// External document id, e.g. `FT911-3`.
    pub docno: String,
    /// Headline text; may be empty.
    pub headline: String,
    /// Body text; may be empty.
    pub text: String,
}

impl Document {
    /// Create a document with only an id.
    pub fn new<S: Into<String>>(docno: S) -> Self {
        Document {
            docno: docno.into(),
            ..Default::default()
        }
    }

    /// Set the headline.
    pub fn with_headline<S: Into<String>>(mut self, headline: S) -> Self {
        self.headline = headline.into();
        self
    }

    /// Set the body text.
    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.text = text.into();
        self
    }

    /// Get a stored field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            DOCNO_FIELD => Some(&self.docno),
            HEADLINE_FIELD => Some(&self.headline),
            TEXT_FIELD => Some(&self.text),
            _ => None,
        }
    }

    /// The analyzed fields with their values, in a fixed order.
    pub fn analyzed_fields(&self) -> [(&'static str, &str); 2] {
        [(HEADLINE_FIELD, &self.headline), (TEXT_FIELD, &self.text)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup() {
        let doc = Document::new("LA010189-0001")
            .with_headline("Launch delayed")
            .with_text("The satellite launch was delayed.");

        assert_eq!(doc.field(DOCNO_FIELD), Some("LA010189-0001"));
        assert_eq!(doc.field(HEADLINE_FIELD), Some("Launch delayed"));
        assert_eq!(doc.field(TEXT_FIELD), Some("The satellite launch was delayed."));
        assert_eq!(doc.field("body"), None);
    }

    #[test]
    fn test_analyzed_fields_exclude_docno() {
        let doc = Document::new("FT911-3");
        let names: Vec<_> = doc.analyzed_fields().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec![HEADLINE_FIELD, TEXT_FIELD]);
    }
}
