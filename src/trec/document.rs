//! TREC document collections (FT, FR94, FBIS, LA Times).
//!
//! A collection file holds many `<DOC>` records. Each record carries a
//! `<DOCNO>` id and any number of `<HEADLINE>` and `<TEXT>` elements whose
//! content may contain nested SGML markup and entities.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;
use regex::{Captures, Regex};

use crate::error::{PrfError, Result};
use crate::index::Document;

/// Record delimiter of TREC collection files.
pub const DOCUMENT_SEPARATOR: &str = "<DOC>";

/// Collection files whose names match this are documentation, not data.
const SKIPPED_FILE_PATTERN: &str = "read|Store";

/// Parser for TREC collection records.
#[derive(Debug, Clone)]
pub struct TrecDocumentParser {
    docno: Regex,
    headline: Regex,
    text: Regex,
    markup: Regex,
    entity: Regex,
}

impl TrecDocumentParser {
    /// Create a new parser.
    pub fn new() -> Result<Self> {
        Ok(TrecDocumentParser {
            docno: element_regex("DOCNO")?,
            headline: element_regex("HEADLINE")?,
            text: element_regex("TEXT")?,
            markup: compile(r"<[^>]*>")?,
            entity: compile(r"&([A-Za-z0-9#]+);")?,
        })
    }

    /// Parse every record of a collection file. `source` names the file in
    /// log messages.
    pub fn parse(&self, raw: &str, source: &str) -> Vec<Document> {
        let mut documents = Vec::new();
        for (position, record) in raw.split(DOCUMENT_SEPARATOR).enumerate() {
            match self.parse_record(record) {
                Some(doc) => documents.push(doc),
                None if self.clean(record).is_empty() => {}
                None => warn!("{source}: record {position} has no DOCNO, skipping"),
            }
        }
        documents
    }

    /// Parse one record; `None` if it has no document id.
    pub fn parse_record(&self, record: &str) -> Option<Document> {
        let docno = self.element(&self.docno, record);
        if docno.is_empty() {
            return None;
        }

        Some(
            Document::new(docno)
                .with_headline(self.element(&self.headline, record))
                .with_text(self.element(&self.text, record)),
        )
    }

    /// Cleaned content of every occurrence of an element, joined by spaces.
    fn element(&self, pattern: &Regex, record: &str) -> String {
        let parts: Vec<String> = pattern
            .captures_iter(record)
            .filter_map(|caps| caps.get(1))
            .map(|m| self.clean(m.as_str()))
            .filter(|s| !s.is_empty())
            .collect();
        parts.join(" ")
    }

    /// Strip markup, decode entities and collapse whitespace.
    pub fn clean(&self, raw: &str) -> String {
        let stripped = self.markup.replace_all(raw, " ");
        let decoded = self
            .entity
            .replace_all(&stripped, |caps: &Captures| match &caps[1] {
                "amp" => "&",
                "lt" => "<",
                "gt" => ">",
                _ => " ",
            });
        decoded.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// `<NAME> ... </NAME>`, case-insensitive, tolerating a missing close tag.
fn element_regex(name: &str) -> Result<Regex> {
    compile(&format!(r"(?is)<{name}>(.*?)(?:</{name}>|\z)"))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| PrfError::corpus(format!("invalid pattern {pattern}: {e}")))
}

/// Every collection file under `root`, in sorted path order.
///
/// Directories are walked recursively; files named like `readme*` or
/// `*Store*` are skipped. A `root` that is itself a file is returned as is.
pub fn corpus_files<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(PrfError::corpus(format!(
            "corpus path {} does not exist",
            root.display()
        )));
    }

    let skip = compile(SKIPPED_FILE_PATTERN)?;
    let mut files = Vec::new();
    collect_files(root, &skip, &mut files)?;
    Ok(files)
}

fn collect_files(dir: &Path, skip: &Regex, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_files(&path, skip, files)?;
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if skip.is_match(&name) {
            debug!("skipping {}", path.display());
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Read and parse every document under `roots`, in root order and then in
/// sorted file order.
///
/// Files are parsed in parallel. Bytes that are not valid UTF-8 are replaced.
pub fn read_corpus<P: AsRef<Path>>(roots: &[P]) -> Result<Vec<Document>> {
    let parser = TrecDocumentParser::new()?;

    let mut files = Vec::new();
    for root in roots {
        files.extend(corpus_files(root)?);
    }
    info!("parsing {} collection files", files.len());

    let parsed = files
        .par_iter()
        .map(|path| {
            let bytes = fs::read(path).map_err(|e| {
                PrfError::corpus(format!("cannot read {}: {e}", path.display()))
            })?;
            let raw = String::from_utf8_lossy(&bytes);
            let documents = parser.parse(&raw, &path.display().to_string());
            debug!("{}: {} documents", path.display(), documents.len());
            Ok(documents)
        })
        .collect::<Result<Vec<Vec<Document>>>>()?;

    Ok(parsed.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FT_SAMPLE: &str = "<DOC>
<DOCNO>FT911-1</DOCNO>
<PROFILE>_AN-BEOA7AAIFT</PROFILE>
<HEADLINE>
FT  14 MAY 91 / International Company News: Satellite launch
</HEADLINE>
<TEXT>
The satellite was launched &amp; reached orbit.
</TEXT>
</DOC>
<DOC>
<DOCNO> FT911-2 </DOCNO>
<TEXT>
Second &hyph;record text &lt;b&gt;
</TEXT>
</DOC>
";

    #[test]
    fn test_parse_records() -> Result<()> {
        let parser = TrecDocumentParser::new()?;
        let docs = parser.parse(FT_SAMPLE, "ft");

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].docno, "FT911-1");
        assert_eq!(
            docs[0].headline,
            "FT 14 MAY 91 / International Company News: Satellite launch"
        );
        assert_eq!(docs[0].text, "The satellite was launched & reached orbit.");
        assert_eq!(docs[1].docno, "FT911-2");
        assert_eq!(docs[1].headline, "");
        assert_eq!(docs[1].text, "Second record text <b>");
        Ok(())
    }

    #[test]
    fn test_nested_markup_and_multiple_text_elements() -> Result<()> {
        let parser = TrecDocumentParser::new()?;
        let doc = parser
            .parse_record(
                "<docno>LA010189-0001</docno>
                 <headline><P>Bridge reopens</P></headline>
                 <text><P>First part.</P></text>
                 <graphic>ignored</graphic>
                 <text><P>Second part.</P>",
            )
            .unwrap();

        assert_eq!(doc.docno, "LA010189-0001");
        assert_eq!(doc.headline, "Bridge reopens");
        assert_eq!(doc.text, "First part. Second part.");
        Ok(())
    }

    #[test]
    fn test_record_without_docno_is_skipped() -> Result<()> {
        let parser = TrecDocumentParser::new()?;
        let docs = parser.parse("<DOC><TEXT>orphan</TEXT></DOC><DOC><DOCNO>X1</DOCNO></DOC>", "x");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].docno, "X1");
        Ok(())
    }

    #[test]
    fn test_corpus_walk_is_sorted_and_skips_docs() -> Result<()> {
        let dir = TempDir::new()?;
        let nested = dir.path().join("ft").join("ft911");
        fs::create_dir_all(&nested)?;
        fs::write(nested.join("ft911_2"), "<DOC><DOCNO>B</DOCNO></DOC>")?;
        fs::write(nested.join("ft911_1"), "<DOC><DOCNO>A</DOCNO></DOC>")?;
        fs::write(dir.path().join("ft").join("readmeft"), "<DOC><DOCNO>R</DOCNO></DOC>")?;
        fs::write(dir.path().join("dtds.Store"), "<DOC><DOCNO>S</DOCNO></DOC>")?;

        let files = corpus_files(dir.path())?;
        assert_eq!(files, vec![nested.join("ft911_1"), nested.join("ft911_2")]);

        let docs = read_corpus(&[dir.path()])?;
        let ids: Vec<&str> = docs.iter().map(|d| d.docno.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        Ok(())
    }

    #[test]
    fn test_invalid_utf8_is_replaced() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("latimes");
        fs::write(&path, b"<DOC><DOCNO>L1</DOCNO><TEXT>caf\xe9 au lait</TEXT></DOC>")?;

        let docs = read_corpus(&[&path])?;
        assert_eq!(docs.len(), 1);
        assert!(docs[0].text.starts_with("caf"));
        assert!(docs[0].text.ends_with("au lait"));
        Ok(())
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let result = corpus_files("/definitely/not/a/corpus");
        assert!(matches!(result, Err(PrfError::Corpus(_))));
    }
}
