//! Balanced-expression scanner.
//!
//! Finds the close delimiter matching an opener while skipping over nested
//! `{{ }}`, `{{{ }}}`, `[[ ]]` and `<!-- -->` constructs. Everything here works
//! on UTF-8 byte offsets and only ever advances on character boundaries.
//!
//! A nested opener that never closes is treated as plain text, so only the
//! construct the caller asked about has to be balanced. `{{{` is matched as a
//! parameter first; if it has no `}}}` it is retried as a `{{` template.

use std::collections::HashMap;
use std::ops::Range;

use lazy_regex::regex;

use crate::wikitext::enums::Delimiter;
use crate::wikitext::errors::{Result, WtError};

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

/// Which delimiter opens at byte `i`, if any. `{{{` wins over `{{`.
pub fn opener_at(text: &str, i: usize) -> Option<Delimiter> {
    let rest = text.get(i..)?;
    if rest.starts_with("{{{") {
        Some(Delimiter::Parameter)
    } else if rest.starts_with("{{") {
        Some(Delimiter::Template)
    } else if rest.starts_with("[[") {
        Some(Delimiter::Link)
    } else {
        None
    }
}

/// Find the close delimiter for the opener located at `start`.
///
/// Returns the byte index of the first byte of the matching close delimiter.
/// Fails with `MalformedMarkup` if `start` does not hold `delim.open()` or if
/// the text ends before the construct is closed.
pub fn find_matching_delimiter(text: &str, delim: Delimiter, start: usize) -> Result<usize> {
    check_offset(text, start)?;
    if !text[start..].starts_with(delim.open()) {
        return Err(WtError::malformed_at(
            format!("expected '{}'", delim.open()),
            start,
        ));
    }
    find_matching_delimiter_after(text, delim, start + delim.open().len())
        .map_err(|_| WtError::malformed_at(format!("unterminated '{}'", delim.open()), start))
}

/// Same as [`find_matching_delimiter`] but `from` points just past an opener
/// the caller has already consumed.
pub fn find_matching_delimiter_after(text: &str, delim: Delimiter, from: usize) -> Result<usize> {
    check_offset(text, from)?;
    close_from(text, delim, from).ok_or_else(|| {
        WtError::malformed_at(
            format!("unterminated '{}'", delim.open()),
            from.saturating_sub(delim.open().len()),
        )
    })
}

/// Byte range of the whole balanced construct opening at `start`, both
/// delimiters included.
pub fn balanced_span(text: &str, delim: Delimiter, start: usize) -> Result<Range<usize>> {
    let close = find_matching_delimiter(text, delim, start)?;
    Ok(start..close + delim.close().len())
}

/// End (exclusive) of the nested construct starting at `i`, or `None` if
/// nothing balanced starts there.
pub(crate) fn nested_end(text: &str, i: usize) -> Option<usize> {
    Scan::new(text).nested_end(i)
}

fn close_from(text: &str, delim: Delimiter, from: usize) -> Option<usize> {
    Scan::new(text).close_from(delim, from)
}

/// What sits at a scan position.
enum Step {
    /// A construct already known to end here (exclusive).
    Jump(usize),
    /// An opener that has not been resolved yet.
    Open(Delimiter),
    /// Plain text, or an opener known never to close.
    Char,
}

/// One pending search for a close delimiter.
struct Frame {
    delim: Delimiter,
    at: usize,
    /// Position of the opener this frame resolves; `None` for the caller's
    /// own search.
    opener: Option<usize>,
}

/// Scanner state for one text.
///
/// Every nested opener is resolved once and remembered, and pending searches
/// live on an explicit stack, so stray openers cost one scan each and deep
/// nesting does not grow the call stack.
struct Scan<'a> {
    text: &'a str,
    ends: HashMap<usize, Option<usize>>,
}

impl<'a> Scan<'a> {
    fn new(text: &'a str) -> Self {
        Scan {
            text,
            ends: HashMap::new(),
        }
    }

    fn nested_end(&mut self, i: usize) -> Option<usize> {
        let d = match self.step(i) {
            Step::Jump(end) => return Some(end),
            Step::Char => return None,
            Step::Open(d) => d,
        };
        let end = match d {
            Delimiter::Parameter => self
                .close_from(Delimiter::Parameter, i + 3)
                .map(|c| c + 3)
                .or_else(|| self.close_from(Delimiter::Template, i + 2).map(|c| c + 2)),
            d => self
                .close_from(d, i + d.open().len())
                .map(|c| c + d.close().len()),
        };
        self.ends.insert(i, end);
        end
    }

    fn step(&self, i: usize) -> Step {
        if let Some(end) = self.ends.get(&i) {
            return end.map_or(Step::Char, Step::Jump);
        }
        let rest = &self.text[i..];
        if rest.starts_with(COMMENT_OPEN) {
            return rest[COMMENT_OPEN.len()..]
                .find(COMMENT_CLOSE)
                .map_or(Step::Char, |p| {
                    Step::Jump(i + COMMENT_OPEN.len() + p + COMMENT_CLOSE.len())
                });
        }
        opener_at(self.text, i).map_or(Step::Char, Step::Open)
    }

    fn close_from(&mut self, delim: Delimiter, from: usize) -> Option<usize> {
        let text = self.text;
        let mut stack = vec![Frame {
            delim,
            at: from,
            opener: None,
        }];
        loop {
            let frame = stack.last()?;
            let (i, delim) = (frame.at, frame.delim);

            let found = if i >= text.len() {
                Some(None)
            } else if text[i..].starts_with(delim.close()) {
                Some(Some(i))
            } else {
                None
            };
            let Some(found) = found else {
                let next = match self.step(i) {
                    Step::Jump(end) => end,
                    Step::Char => i + char_len_at(text, i),
                    Step::Open(d) => {
                        stack.push(Frame {
                            delim: d,
                            at: i + d.open().len(),
                            opener: Some(i),
                        });
                        continue;
                    }
                };
                if let Some(frame) = stack.last_mut() {
                    frame.at = next;
                }
                continue;
            };

            let done = stack.pop()?;
            let Some(pos) = done.opener else {
                return found;
            };
            if found.is_none() && done.delim == Delimiter::Parameter {
                // `{{{` without `}}}`: retry as a template after a `{`
                stack.push(Frame {
                    delim: Delimiter::Template,
                    at: pos + 2,
                    opener: Some(pos),
                });
                continue;
            }
            let end = found.map(|c| c + done.delim.close().len());
            self.ends.insert(pos, end);
            if let Some(parent) = stack.last_mut() {
                parent.at = end.unwrap_or(pos + char_len_at(text, pos));
            }
        }
    }
}

fn char_len_at(text: &str, i: usize) -> usize {
    text[i..].chars().next().map_or(1, char::len_utf8)
}

fn check_offset(text: &str, offset: usize) -> Result<()> {
    if offset > text.len() || !text.is_char_boundary(offset) {
        return Err(WtError::invalid_offset(offset, text.len()));
    }
    Ok(())
}

/// Iterator over the characters of a string that sit at nesting depth 0.
///
/// Balanced nested constructs (templates, parameters, links, comments) are
/// skipped whole; their content is never yielded.
pub struct TopLevel<'a> {
    text: &'a str,
    pos: usize,
    scan: Scan<'a>,
}

impl<'a> TopLevel<'a> {
    pub fn new(text: &'a str) -> Self {
        TopLevel {
            text,
            pos: 0,
            scan: Scan::new(text),
        }
    }
}

impl Iterator for TopLevel<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.text.len() {
            if let Some(end) = self.scan.nested_end(self.pos) {
                self.pos = end;
                continue;
            }
            let ch = self.text[self.pos..].chars().next()?;
            let item = (self.pos, ch);
            self.pos += ch.len_utf8();
            return Some(item);
        }
        None
    }
}

/// Byte index of the first top-level occurrence of `c`.
pub fn find_top_level(text: &str, c: char) -> Option<usize> {
    TopLevel::new(text).find(|&(_, ch)| ch == c).map(|(i, _)| i)
}

/// Split on top-level `sep`, returning the byte ranges of the pieces. Always
/// returns at least one (possibly empty) range.
pub fn split_top_level(text: &str, sep: char) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, ch) in TopLevel::new(text) {
        if ch == sep {
            out.push(start..i);
            start = i + ch.len_utf8();
        }
    }
    out.push(start..text.len());
    out
}

/// Ranges of every HTML comment in `text`. An unterminated comment runs to
/// the end of the text, as it does when MediaWiki renders the page.
pub fn comment_spans(text: &str) -> Vec<Range<usize>> {
    regex!(r"(?s)<!--.*?(?:-->|\z)")
        .find_iter(text)
        .map(|m| m.range())
        .collect()
}

/// Whether byte `i` lies inside one of `spans` (as produced by
/// [`comment_spans`], sorted and disjoint).
pub fn within(spans: &[Range<usize>], i: usize) -> bool {
    let idx = spans.partition_point(|s| s.end <= i);
    spans.get(idx).is_some_and(|s| s.contains(&i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_template() {
        let s = "x {{a|b}} y";
        assert_eq!(find_matching_delimiter(s, Delimiter::Template, 2).unwrap(), 7);
        assert_eq!(balanced_span(s, Delimiter::Template, 2).unwrap(), 2..9);
    }

    #[test]
    fn nested_same_kind() {
        let s = "{{outer|p={{inner|x=1}}}}";
        assert_eq!(
            find_matching_delimiter(s, Delimiter::Template, 0).unwrap(),
            s.len() - 2
        );
    }

    #[test]
    fn triple_brace_is_its_own_construct() {
        let s = "{{a|{{{b|{{c}}}}}}}";
        let close = find_matching_delimiter(s, Delimiter::Template, 0).unwrap();
        assert_eq!(close, s.len() - 2);
        let s = "{{{x|{{y}}}}} rest";
        assert_eq!(balanced_span(s, Delimiter::Parameter, 0).unwrap(), 0..13);
    }

    #[test]
    fn triple_brace_without_close_falls_back_to_template() {
        // `{{{b}}` has no `}}}` of its own, so it is a template after a `{`
        let s = "{{a|{{{b}}|c}}";
        let close = find_matching_delimiter(s, Delimiter::Template, 0).unwrap();
        assert_eq!(close, s.len() - 2);
    }

    #[test]
    fn links_and_mixed_nesting() {
        let s = "[[File:X.png|thumb|see [[Y|{{z}}]]]] after";
        let span = balanced_span(s, Delimiter::Link, 0).unwrap();
        assert_eq!(&s[span], "[[File:X.png|thumb|see [[Y|{{z}}]]]]");
    }

    #[test]
    fn start_just_after_opener() {
        let s = "{{a|{{b}}}}";
        assert_eq!(
            find_matching_delimiter_after(s, Delimiter::Template, 2).unwrap(),
            9
        );
    }

    #[test]
    fn unterminated_is_malformed() {
        let e = find_matching_delimiter("text {{a|b", Delimiter::Template, 5).unwrap_err();
        assert!(matches!(e, WtError::MalformedMarkup { offset: 5, .. }));
        let e = find_matching_delimiter("abc", Delimiter::Link, 0).unwrap_err();
        assert_eq!(e.kind(), "MalformedMarkup");
    }

    #[test]
    fn bad_offsets() {
        let e = find_matching_delimiter("{{a}}", Delimiter::Template, 10).unwrap_err();
        assert!(matches!(e, WtError::InvalidOffset { offset: 10, len: 5 }));
        let e = find_matching_delimiter("é{{a}}", Delimiter::Template, 1).unwrap_err();
        assert_eq!(e.kind(), "InvalidOffset");
    }

    #[test]
    fn unmatched_nested_opener_is_text() {
        let s = "{{a|[[b}}";
        assert_eq!(find_matching_delimiter(s, Delimiter::Template, 0).unwrap(), 7);
    }

    #[test]
    fn stray_openers_are_scanned_once() {
        let s = format!("{{{{a|{}}}}}", "[[x ".repeat(40));
        let started = std::time::Instant::now();
        let close = find_matching_delimiter(&s, Delimiter::Template, 0).unwrap();
        assert_eq!(close, s.len() - 2);
        let parts = split_top_level(&s, '|');
        assert_eq!(parts.len(), 1);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let s = format!("{}{}", "[[".repeat(8000), "]]".repeat(8000));
        assert_eq!(balanced_span(&s, Delimiter::Link, 0).unwrap(), 0..s.len());
        assert_eq!(find_top_level(&format!("{}|", s), '|'), Some(s.len()));
    }

    #[test]
    fn comments_hide_delimiters() {
        let s = "{{a|<!-- }} | -->b}}";
        assert_eq!(
            find_matching_delimiter(s, Delimiter::Template, 0).unwrap(),
            s.len() - 2
        );
        assert_eq!(split_top_level("a|<!-- | -->b", '|'), vec![0..1, 2..13]);
    }

    #[test]
    fn split_respects_nesting() {
        let s = "name|a=[[x|y]]|b={{t|u=v}}||{{{p|q}}}";
        let parts: Vec<&str> = split_top_level(s, '|').into_iter().map(|r| &s[r]).collect();
        assert_eq!(
            parts,
            vec!["name", "a=[[x|y]]", "b={{t|u=v}}", "", "{{{p|q}}}"]
        );
        assert_eq!(find_top_level("{{x=1}}=2", '='), Some(7));
        assert_eq!(find_top_level("{{x=1}}", '='), None);
    }

    #[test]
    fn comment_ranges() {
        let s = "a<!-- b -->c<!-- d";
        let spans = comment_spans(s);
        assert_eq!(spans, vec![1..11, 12..18]);
        assert!(within(&spans, 3));
        assert!(!within(&spans, 11));
        assert!(within(&spans, 17));
        assert!(!within(&spans, 0));
    }
}
