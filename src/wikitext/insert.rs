//! Insert a tag after the run of maintenance templates at the top of a page.
//!
//! Pages usually open with a block of templates (`{{short description}}`,
//! hatnotes, protection and deletion tags). A new tag belongs right after the
//! ones named by the caller, and before anything else: prose, images, other
//! templates, or comments unless the caller says comments may be skipped.

use derive_builder::Builder;
use regex::{Regex, RegexBuilder};

use crate::wikitext::enums::{CommentPolicy, Delimiter};
use crate::wikitext::errors::{Result, WtError};
use crate::wikitext::scanner::{balanced_span, find_top_level};
use crate::wikitext::types::links::parse_link_at;
use crate::wikitext::wiki_text::WikitextPage;

/// Options for [`WikitextPage::insert_after_templates`].
///
/// ```
/// use wikitext_surgeon::{CommentPolicy, InsertOptionsBuilder};
///
/// let options = InsertOptionsBuilder::default()
///     .comments(CommentPolicy::Skip(vec!["<!-- random -->".into()]))
///     .build()
///     .unwrap();
/// assert!(options.case_insensitive);
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct InsertOptions {
    /// Match template names (and the other patterns) ignoring case.
    pub case_insensitive: bool,
    /// Replaces the template name check: anything this regex matches at the
    /// cursor is skipped.
    #[builder(setter(into, strip_option))]
    pub skip_regex: Option<String>,
    pub comments: CommentPolicy,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            skip_regex: None,
            comments: CommentPolicy::Halt,
        }
    }
}

impl From<InsertOptionsBuilderError> for WtError {
    fn from(e: InsertOptionsBuilderError) -> Self {
        WtError::usage(e.to_string())
    }
}

impl InsertOptions {
    fn regex(&self, source: &str) -> Result<Regex> {
        Ok(RegexBuilder::new(source)
            .case_insensitive(self.case_insensitive)
            .build()?)
    }
}

impl WikitextPage {
    /// Insert `tag` after the leading templates whose names match
    /// `templates`, a regex alternation such as `short description|about`.
    /// Names may carry a numeric suffix (`about2`).
    ///
    /// Whitespace between the skipped templates is skipped too, and the tag
    /// is placed after the last newline that follows them. Nothing happens if
    /// the text at that point already starts with `tag`.
    ///
    /// Fails with `Usage` if `tag` or `templates` is empty and with `Pattern`
    /// if a pattern does not compile.
    pub fn insert_after_templates(
        &mut self,
        tag: &str,
        templates: &str,
        options: &InsertOptions,
    ) -> Result<&mut Self> {
        if tag.is_empty() {
            return Err(WtError::usage("no tag given"));
        }
        if templates.trim().is_empty() {
            return Err(WtError::usage("no template pattern given"));
        }

        let name_re = options.regex(&format!(r"^\s*(?:{})\d*\s*$", templates))?;
        let custom_re = match &options.skip_regex {
            Some(src) => Some(options.regex(&format!("^(?:{})", src))?),
            None => None,
        };
        let pre_re = match &options.comments {
            CommentPolicy::Skip(patterns) if !patterns.is_empty() => {
                let alternatives = patterns
                    .iter()
                    .map(|p| format!("(?:{})", p))
                    .collect::<Vec<_>>()
                    .join("|");
                Some(options.regex(&format!("^(?:{})", alternatives))?)
            }
            _ => None,
        };

        let text = self.text();
        let mut cursor = 0;
        let mut skipped = 0;
        loop {
            let at = cursor + leading_whitespace(&text[cursor..]);
            if at >= text.len() {
                break;
            }
            let rest = &text[at..];

            if let Some(re) = &pre_re
                && let Some(m) = re.find(rest)
                && !m.is_empty()
            {
                cursor = at + m.end();
                skipped += 1;
                continue;
            }

            let end = match &custom_re {
                Some(re) => re.find(rest).filter(|m| !m.is_empty()).map(|m| at + m.end()),
                None => allowed_construct_end(text, at, &name_re),
            };
            match end {
                Some(end) => {
                    cursor = end;
                    skipped += 1;
                }
                None => break,
            }
        }

        if skipped > 0 {
            let ws = &text[cursor..cursor + leading_whitespace(&text[cursor..])];
            if let Some(nl) = ws.rfind('\n') {
                cursor += nl + 1;
            }
        }

        if text[cursor..].starts_with(tag) {
            log::debug!("insert_after_templates: {:?} already at {}", tag, cursor);
            return Ok(self);
        }
        log::debug!(
            "insert_after_templates: inserting {:?} at {} after {} construct(s)",
            tag,
            cursor,
            skipped
        );
        let mut out = String::with_capacity(text.len() + tag.len());
        out.push_str(&text[..cursor]);
        out.push_str(tag);
        out.push_str(&text[cursor..]);
        self.replace_text(out);
        Ok(self)
    }
}

fn leading_whitespace(s: &str) -> usize {
    s.len() - s.trim_start().len()
}

/// End of the template or link at `at` if its name matches `name_re`.
fn allowed_construct_end(text: &str, at: usize, name_re: &Regex) -> Option<usize> {
    let rest = &text[at..];
    if rest.starts_with("{{") && !rest.starts_with("{{{") {
        let span = balanced_span(text, Delimiter::Template, at).ok()?;
        let inner = &text[span.start + 2..span.end - 2];
        let name = &inner[..find_top_level(inner, '|').unwrap_or(inner.len())];
        name_re.is_match(name).then_some(span.end)
    } else if rest.starts_with("[[") {
        let link = parse_link_at(text, at).ok()?;
        name_re.is_match(&link.target).then_some(link.span.end)
    } else {
        None
    }
}
