//! A line-oriented tokenizer for imzML documents.
//!
//! imzML files are machine generated with one element per line, so rather than
//! building a full XML tree the parser walks the document a line at a time and
//! pulls tag names and attribute values out with plain substring matching. All
//! of the substring rules live here.
use std::io::{self, prelude::*};

/// How a line participates in element nesting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// An empty-element tag such as `<cvParam .../>`
    SelfClosing,
    /// Any line containing an end tag
    Closing,
    /// A start tag
    Opening,
    /// Anything without markup
    Text,
}

/// A single raw line of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    text: &'a str,
    number: usize,
}

impl<'a> Line<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, number: 0 }
    }

    pub fn numbered(text: &'a str, number: usize) -> Self {
        Self { text, number }
    }

    /// The 1-based line number in the document, or 0 for a free-standing line
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn as_str(&self) -> &'a str {
        self.text
    }

    /// Classify the line. An end tag anywhere on the line wins over an
    /// empty-element marker, which wins over a start tag.
    pub fn kind(&self) -> LineKind {
        if self.text.contains("</") {
            LineKind::Closing
        } else if self.text.contains("/>") {
            LineKind::SelfClosing
        } else if self.text.contains('<') {
            LineKind::Opening
        } else {
            LineKind::Text
        }
    }

    /// The name of the first tag on the line, from just after the first `<` up
    /// to the next space or `>`. For an end tag the leading `/` is kept, use
    /// [`Line::closing_tag_name`] to get the bare name.
    pub fn tag_name(&self) -> Option<&'a str> {
        let start = self.text.find('<')? + 1;
        let rest = &self.text[start..];
        // The first character is always part of the name
        let end = rest
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == ' ' || *c == '>')
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let name = rest[..end].trim_end_matches('/');
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    /// The name of the first end tag on the line, without the `</` prefix
    pub fn closing_tag_name(&self) -> Option<&'a str> {
        let start = self.text.find("</")? + 2;
        let rest = &self.text[start..];
        let end = rest
            .find(|c: char| c == '>' || c.is_whitespace())
            .unwrap_or(rest.len());
        if end == 0 {
            None
        } else {
            Some(&rest[..end])
        }
    }

    /// The quoted value of the first occurrence of `name` on the line.
    ///
    /// This is a substring match, not attribute parsing: the value is whatever
    /// lies between the next two `"` after the first place `name` appears.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        let pos = self.text.find(name)?;
        let rest = &self.text[pos + name.len()..];
        let open = rest.find('"')? + 1;
        let rest = &rest[open..];
        let close = rest.find('"')?;
        Some(&rest[..close])
    }

    /// Like [`Line::attribute`] but missing attributes read as empty
    pub fn attribute_or_empty(&self, name: &str) -> &'a str {
        self.attribute(name).unwrap_or_default()
    }

    /// The `accession` attribute, if it is present and not empty
    pub fn accession(&self) -> Option<&'a str> {
        self.attribute("accession").filter(|a| !a.is_empty())
    }
}

/**
Reads a document one line at a time, keeping track of the current line number.

The scanner is a single forward pass; scanning the document again means
opening the source again.
*/
#[derive(Debug)]
pub struct LineScanner<R: BufRead> {
    handle: R,
    buffer: Vec<u8>,
    /// Holds the decoded line only when it was not valid UTF-8
    lossy: String,
    line_number: usize,
}

impl<R: BufRead> LineScanner<R> {
    pub fn new(handle: R) -> Self {
        Self {
            handle,
            buffer: Vec::new(),
            lossy: String::new(),
            line_number: 0,
        }
    }

    /// The 1-based number of the line most recently read
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next line, returning `None` at the end of the stream.
    /// Invalid UTF-8 is replaced rather than treated as an error.
    pub fn next_line(&mut self) -> io::Result<Option<Line<'_>>> {
        self.buffer.clear();
        let b = self.handle.read_until(b'\n', &mut self.buffer)?;
        if b == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        let text = match std::str::from_utf8(&self.buffer) {
            Ok(s) => s,
            Err(_) => {
                self.lossy.clear();
                self.lossy.push_str(&String::from_utf8_lossy(&self.buffer));
                self.lossy.as_str()
            }
        };
        let text = text.trim_end_matches(['\n', '\r']);
        Ok(Some(Line::numbered(text, self.line_number)))
    }
}

/// A flat stack of the tag names that have been opened. Every end tag pops the
/// most recent entry, whichever tag it closes.
#[derive(Debug, Default, Clone)]
pub struct ContextStack {
    tags: Vec<String>,
}

impl ContextStack {
    pub fn push(&mut self, tag: &str) {
        self.tags.push(tag.to_string());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.tags.pop()
    }
}

/// Check if the buffer contains an imzML document by looking for the IMS
/// controlled vocabulary, either declared in the `cvList` or referenced by an
/// accession.
pub fn is_imzml(buffer: &[u8]) -> bool {
    let mut scanner = LineScanner::new(io::Cursor::new(buffer));
    log::debug!("Checking for imzML format...");
    while let Ok(Some(line)) = scanner.next_line() {
        match line.kind() {
            LineKind::Opening | LineKind::SelfClosing => {
                if line.tag_name() == Some("cv") && line.attribute("id") == Some("IMS") {
                    return true;
                }
                if line
                    .accession()
                    .is_some_and(|acc| acc.starts_with("IMS:"))
                {
                    return true;
                }
            }
            LineKind::Closing => {
                if line.closing_tag_name() == Some("run") {
                    return false;
                }
            }
            LineKind::Text => {}
        }
    }
    false
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(
            Line::new(r#"  <cvParam cvRef="IMS" accession="IMS:1000042" value="3"/>"#).kind(),
            LineKind::SelfClosing
        );
        assert_eq!(Line::new("  </scanSettings>").kind(), LineKind::Closing);
        assert_eq!(Line::new(r#"<binary></binary>"#).kind(), LineKind::Closing);
        assert_eq!(
            Line::new(r#"  <spectrum id="Scan=1" index="0">"#).kind(),
            LineKind::Opening
        );
        assert_eq!(Line::new("plain text").kind(), LineKind::Text);
    }

    #[test]
    fn test_tag_name() {
        assert_eq!(
            Line::new(r#"    <referenceableParamGroup id="mzArray">"#).tag_name(),
            Some("referenceableParamGroup")
        );
        assert_eq!(Line::new("<run>").tag_name(), Some("run"));
        assert_eq!(Line::new("<binary/>").tag_name(), Some("binary"));
        assert_eq!(Line::new("</spectrum>").tag_name(), Some("/spectrum"));
        assert_eq!(Line::new("</spectrum>").closing_tag_name(), Some("spectrum"));
        assert_eq!(
            Line::new("<binary></binary>").closing_tag_name(),
            Some("binary")
        );
        assert_eq!(Line::new("no markup").tag_name(), None);
    }

    #[test]
    fn test_attribute() {
        let line = Line::new(
            r#"<cvParam cvRef="IMS" accession="IMS:1000046" name="pixel size x" value="25.0"/>"#,
        );
        assert_eq!(line.attribute("accession"), Some("IMS:1000046"));
        assert_eq!(line.attribute("name"), Some("pixel size x"));
        assert_eq!(line.attribute("value"), Some("25.0"));
        assert_eq!(line.attribute("unitName"), None);
        assert_eq!(line.attribute_or_empty("unitName"), "");

        // Substring matching, the first occurrence wins
        let line = Line::new(r#"<userParam name="unitName" value="x"/>"#);
        assert_eq!(line.attribute("unitName"), Some(" value="));

        let line = Line::new(r#"<cvParam accession="" name="x"/>"#);
        assert_eq!(line.accession(), None);
    }

    #[test]
    fn test_scanner_lines() -> io::Result<()> {
        let doc = "<mzML>\r\n  <run>\n</mzML>";
        let mut scanner = LineScanner::new(io::Cursor::new(doc));
        let mut seen = Vec::new();
        let mut numbers = Vec::new();
        while let Some(line) = scanner.next_line()? {
            numbers.push(line.number());
            seen.push((scanner_line(&line), line.kind()));
        }
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(scanner.line_number(), 3);
        assert_eq!(
            seen,
            vec![
                ("<mzML>".to_string(), LineKind::Opening),
                ("  <run>".to_string(), LineKind::Opening),
                ("</mzML>".to_string(), LineKind::Closing),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_scanner_invalid_utf8() -> io::Result<()> {
        let doc: &[u8] = b"<userParam name=\"caf\xe9\"/>\n<run>\n";
        let mut scanner = LineScanner::new(io::Cursor::new(doc));
        let line = scanner.next_line()?.unwrap();
        assert_eq!(line.attribute("name"), Some("caf\u{fffd}"));
        let line = scanner.next_line()?.unwrap();
        assert_eq!(line.as_str(), "<run>");
        assert!(scanner.next_line()?.is_none());
        Ok(())
    }

    fn scanner_line(line: &Line<'_>) -> String {
        line.as_str().to_string()
    }

    #[test]
    fn test_context_stack() {
        let mut stack = ContextStack::default();
        stack.push("mzML");
        stack.push("scanSettingsList");
        assert_eq!(stack.pop().as_deref(), Some("scanSettingsList"));
        assert_eq!(stack.pop().as_deref(), Some("mzML"));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_is_imzml_detection() {
        let imaging_content =
            b"<cvList count=\"2\">\n<cv id=\"IMS\" fullName=\"Imaging MS Ontology\"/>\n</cvList>";
        assert!(is_imzml(imaging_content));

        let ims_content = b"<cvParam cvRef=\"IMS\" accession=\"IMS:1000080\" value=\"\"/>";
        assert!(is_imzml(ims_content));

        let mzml_content = b"<mzML xmlns=\"http://psi.hupo.org/ms/mzml\">\n<cv id=\"MS\"/>\n";
        assert!(!is_imzml(mzml_content));
    }
}
