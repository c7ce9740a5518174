/*!
Wikilink node and parsing helper for `[[...]]` constructs.

`[[Target]]`, `[[Target|display]]`, `[[:File:X.png|display]]` (a plain link to
a file page) and `[[File:X.png|thumb|caption]]` (an embed) all share this
shape; which one a link is depends on the leading colon and the namespace of
its target.
*/

use std::ops::Range;

use crate::wikitext::enums::Delimiter;
use crate::wikitext::errors::Result;
use crate::wikitext::namespaces::{Namespace, NamespaceTable, Title};
use crate::wikitext::scanner::{balanced_span, find_top_level};

/// A `[[...]]` construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Byte range in the source, brackets included.
    pub span: Range<usize>,
    /// Whether the target starts with `:`.
    pub colon: bool,
    /// Target as written, without the leading colon.
    pub target: String,
    /// Everything after the first top-level `|`, if there is one. For file
    /// embeds this holds all the image options.
    pub display: Option<String>,
}

impl Link {
    /// Split the target into namespace and title text.
    pub fn title(&self, table: &NamespaceTable) -> Title {
        table.split_title(&self.target)
    }

    /// A link without a leading colon into the File namespace embeds the file.
    pub fn is_file_embed(&self, table: &NamespaceTable) -> bool {
        !self.colon && self.title(table).namespace == Namespace::File
    }

    /// The text a reader sees: the display text if given, otherwise the
    /// target as written.
    pub fn to_plain(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.target)
    }

    /// Reconstruct the link as wikitext.
    pub fn to_wikitext(&self) -> String {
        let colon = if self.colon { ":" } else { "" };
        match &self.display {
            Some(d) => format!("[[{}{}|{}]]", colon, self.target, d),
            None => format!("[[{}{}]]", colon, self.target),
        }
    }
}

/// Parse the link opening at `start` in `input`.
///
/// Fails with `MalformedMarkup` if there is no `[[` at `start` or it is never
/// closed. Nested links and templates inside the display text are kept.
pub fn parse_link_at(input: &str, start: usize) -> Result<Link> {
    let span = balanced_span(input, Delimiter::Link, start)?;
    let inner = &input[span.start + 2..span.end - 2];
    let (target, display) = match find_top_level(inner, '|') {
        Some(pipe) => (&inner[..pipe], Some(inner[pipe + 1..].to_string())),
        None => (inner, None),
    };
    let (colon, target) = match target.strip_prefix(':') {
        Some(t) => (true, t),
        None => (false, target),
    };
    Ok(Link {
        span,
        colon,
        target: target.to_string(),
        display,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple() {
        let s = "[[Page|Label]]";
        let l = parse_link_at(s, 0).expect("should parse");
        assert_eq!(l.target, "Page");
        assert_eq!(l.display.as_deref(), Some("Label"));
        assert_eq!(l.span, 0..s.len());
        assert!(!l.colon);
    }

    #[test]
    fn no_display() {
        let l = parse_link_at("x [[Page Name]] y", 2).unwrap();
        assert_eq!(l.target, "Page Name");
        assert_eq!(l.display, None);
        assert_eq!(l.to_plain(), "Page Name");
        assert_eq!(l.span, 2..15);
    }

    #[test]
    fn embed_vs_display_link() {
        let table = NamespaceTable::default();
        let embed = parse_link_at("[[Image:Fee.svg|thumb|A [[b|c]]]]", 0).unwrap();
        assert!(embed.is_file_embed(&table));
        assert_eq!(embed.display.as_deref(), Some("thumb|A [[b|c]]"));
        let display = parse_link_at("[[:File:Fee.svg|she]]", 0).unwrap();
        assert!(display.colon);
        assert!(!display.is_file_embed(&table));
        assert_eq!(display.title(&table).namespace, Namespace::File);
        let plain = parse_link_at("[[Fee.svg|to]]", 0).unwrap();
        assert!(!plain.is_file_embed(&table));
    }

    #[test]
    fn to_wikitext_roundtrip() {
        for s in ["[[A|b]]", "[[:File:X.png]]", "[[File:X.png|thumb|{{t|a}}]]"] {
            assert_eq!(parse_link_at(s, 0).unwrap().to_wikitext(), s);
        }
    }

    #[test]
    fn unterminated() {
        assert!(parse_link_at("[[Page", 0).is_err());
        assert!(parse_link_at("Page]]", 0).is_err());
    }
}
