//! Template invocation parsing.
//!
//! Turns `{{Name|a|key = value|...}}` into a [`ParsedTemplate`]. Splitting
//! only happens on `|` and `=` at nesting depth 0, so parameter values keep
//! any nested templates, parameter defaults and links verbatim.
//!
//! Trimming follows MediaWiki: the name and named parameters (key and value)
//! are trimmed, unnamed parameters keep their whitespace.

use std::ops::Range;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::wikitext::enums::{Delimiter, ParamKey};
use crate::wikitext::errors::{Result, WtError};
use crate::wikitext::namespaces::ucfirst;
use crate::wikitext::scanner::{self, balanced_span, find_top_level, split_top_level};

/// A parsed template invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTemplate {
    /// Template name, trimmed.
    pub name: String,
    /// Parameters in order of first appearance.
    pub parameters: IndexMap<ParamKey, String>,
    /// Byte range of the whole invocation in the parsed text.
    pub span: Range<usize>,
    /// Raw text between the top-level `|` separators; the first entry holds
    /// the untrimmed name.
    pub segments: Vec<String>,
}

impl ParsedTemplate {
    /// Value of a parameter, by position (`1`) or name (`"nom"`).
    pub fn get<K: Into<ParamKey>>(&self, key: K) -> Option<&str> {
        self.parameters.get(&key.into()).map(String::as_str)
    }

    pub fn positional(&self, n: usize) -> Option<&str> {
        self.get(ParamKey::Positional(n))
    }

    pub fn named(&self, name: &str) -> Option<&str> {
        self.get(ParamKey::from_name(name))
    }

    /// Parser functions (`{{#if:...}}`) are calls, not templates.
    pub fn is_parser_function(&self) -> bool {
        self.name.starts_with('#')
    }

    /// Compare names the way MediaWiki does: first letter case-insensitive,
    /// `_` equal to space.
    pub fn name_matches(&self, name: &str) -> bool {
        let norm = |s: &str| ucfirst(s.trim()).replace('_', " ");
        norm(&self.name) == norm(name)
    }

    /// Reassemble the invocation exactly as it appeared in the source.
    pub fn to_wikitext(&self) -> String {
        format!("{{{{{}}}}}", self.segments.join("|"))
    }
}

/// Template parser with its knobs.
#[derive(Debug, Clone, Copy)]
pub struct TemplateParser {
    keep_empty_positional: bool,
}

impl Default for TemplateParser {
    fn default() -> Self {
        Self {
            keep_empty_positional: true,
        }
    }
}

impl TemplateParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether entirely empty unnamed segments (`{{t||x}}`) get a positional
    /// number with an empty value. On by default; when off such segments are
    /// dropped and do not consume a number.
    pub fn keep_empty_positional(mut self, keep: bool) -> Self {
        self.keep_empty_positional = keep;
        self
    }

    /// Parse the template at `start`, or the first genuine template in `text`
    /// when `start` is `None`.
    pub fn parse(&self, text: &str, start: Option<usize>) -> Result<ParsedTemplate> {
        let start = match start {
            Some(offset) => {
                if text.get(offset..).is_some_and(|rest| rest.starts_with("{{{"))
                    && balanced_span(text, Delimiter::Parameter, offset).is_ok()
                {
                    return Err(WtError::malformed_at(
                        "parameter default, not a template",
                        offset,
                    ));
                }
                offset
            }
            None => find_first_template(text, 0)
                .ok_or_else(|| WtError::malformed_at("no template found", 0))?,
        };
        let span = balanced_span(text, Delimiter::Template, start)?;
        let inner = &text[span.start + 2..span.end - 2];
        Ok(self.parse_inner(inner, span))
    }

    /// Every top-level template in `text`, in order. Parser functions,
    /// parameter defaults, comments and unterminated openers are skipped.
    pub fn parse_all(&self, text: &str) -> Vec<ParsedTemplate> {
        let mut out = Vec::new();
        let mut pos = 0;
        while let Some(start) = find_first_template(text, pos) {
            match balanced_span(text, Delimiter::Template, start) {
                Ok(span) => {
                    let inner = &text[span.start + 2..span.end - 2];
                    pos = span.end;
                    out.push(self.parse_inner(inner, span));
                }
                Err(e) => {
                    log::trace!("skipping unterminated template: {}", e);
                    pos = start + 2;
                }
            }
        }
        out
    }

    fn parse_inner(&self, inner: &str, span: Range<usize>) -> ParsedTemplate {
        let segments: Vec<String> = split_top_level(inner, '|')
            .into_iter()
            .map(|r| inner[r].to_string())
            .collect();

        let mut parameters = IndexMap::new();
        let mut unnamed = 0usize;
        for raw in segments.iter().skip(1) {
            if let Some(eq) = find_top_level(raw, '=') {
                let key = raw[..eq].trim();
                let value = raw[eq + 1..].trim();
                parameters.insert(ParamKey::from_name(key), value.to_string());
            } else if raw.is_empty() && !self.keep_empty_positional {
                continue;
            } else {
                unnamed += 1;
                parameters.insert(ParamKey::Positional(unnamed), raw.clone());
            }
        }

        ParsedTemplate {
            name: segments[0].trim().to_string(),
            parameters,
            span,
            segments,
        }
    }
}

/// Parse one template invocation with the default parser.
///
/// With `start` the template must open exactly at that byte offset; without
/// it the first genuine template is used (not a `{{{parameter}}}`, not a
/// parser function, not inside a comment).
pub fn parse_template(text: &str, start: Option<usize>) -> Result<ParsedTemplate> {
    TemplateParser::new().parse(text, start)
}

/// Every top-level template invocation in `text`.
pub fn parse_all_templates(text: &str) -> Vec<ParsedTemplate> {
    TemplateParser::new().parse_all(text)
}

/// Byte offset of the first genuine template opener at or after `from`.
fn find_first_template(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'<' if text[i..].starts_with("<!--") => match scanner::nested_end(text, i) {
                Some(end) => i = end,
                // unterminated comments hide the rest of the page
                None => return None,
            },
            b'{' if text[i..].starts_with("{{{") => {
                match balanced_span(text, Delimiter::Parameter, i) {
                    Ok(span) => i = span.end,
                    Err(_) => i += 1,
                }
            }
            b'{' if text[i..].starts_with("{{") => {
                if text[i + 2..].trim_start().starts_with('#') {
                    match balanced_span(text, Delimiter::Template, i) {
                        Ok(span) => i = span.end,
                        Err(_) => i += 2,
                    }
                } else {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}
