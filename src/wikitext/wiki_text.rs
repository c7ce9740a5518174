//! `WikitextPage`: an owned wikitext buffer with syntax-aware edits.
//!
//! Every edit follows the same pattern: a regex finds candidate openers
//! (`[[Name`, `{{Name`), the scanner extends each candidate to its balanced
//! close, and only those spans are rewritten. Text outside the rewritten
//! spans is copied byte for byte. Finding nothing is not an error; the
//! buffer is simply left alone, so every edit is safe to call speculatively.
//!
//! Edits take `&mut self` and return `&mut Self` so they can be chained:
//!
//! ```
//! use wikitext_surgeon::WikitextPage;
//!
//! let mut page = WikitextPage::new("O, [[Juliet|she]] doth {{plural|teach}}!");
//! page.remove_link("juliet").remove_template("plural");
//! assert_eq!(page.text(), "O, she doth !");
//! ```

use std::fmt;
use std::ops::Range;

use regex::Regex;

use crate::wikitext::enums::Delimiter;
use crate::wikitext::namespaces::{Namespace, NamespaceTable, title_regex};
use crate::wikitext::scanner::{balanced_span, within};
use crate::wikitext::types::links::parse_link_at;

/// Mutable owner of one wikitext buffer.
#[derive(Debug, Clone, Default)]
pub struct WikitextPage {
    text: String,
    namespaces: NamespaceTable,
}

impl WikitextPage {
    /// Wrap `text` using the default namespace table.
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self::with_namespaces(text, NamespaceTable::default())
    }

    /// Wrap `text` using a custom namespace table (extra aliases).
    pub fn with_namespaces<S: Into<String>>(text: S, namespaces: NamespaceTable) -> Self {
        Self {
            text: text.into(),
            namespaces,
        }
    }

    /// Current text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the page and hand back the text.
    pub fn into_text(self) -> String {
        self.text
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    pub(crate) fn replace_text(&mut self, text: String) {
        self.text = text;
    }

    /// Unlink every link to `link_target`.
    ///
    /// `[[Target|display]]` becomes `display`, `[[Target]]` becomes `Target`
    /// as written. The first letter of the target is matched in either case
    /// and namespace aliases are honoured. Links into the File and Category
    /// namespaces are only removed in their colon form (`[[:File:X|y]]`);
    /// without the colon they are embeds or category tags and stay.
    pub fn remove_link(&mut self, link_target: &str) -> &mut Self {
        let title = self.namespaces.split_title(link_target);
        if title.text.is_empty() {
            log::debug!("remove_link: empty target {:?}", link_target);
            return self;
        }

        let mut target_re = String::new();
        if title.namespace != Namespace::Main {
            target_re.push_str(&self.namespaces.namespace_regex(&[title.namespace]));
            target_re.push(':');
        }
        target_re.push_str(&title_regex(&title.text));
        let colon = if title.namespace.colon_required_for_link() {
            ":"
        } else {
            ":?"
        };
        let pattern = format!(r"\[\[{}(?:{})(?:\||\]\])", colon, target_re);
        let Some(re) = compile(&pattern, "remove_link") else {
            return self;
        };

        let (text, count) = unlink(&self.text, &re);
        log::debug!("remove_link({:?}): unlinked {} link(s)", link_target, count);
        if count > 0 {
            self.text = text;
        }
        self
    }

    /// Delete every invocation of `template_name`, parameters included.
    ///
    /// A `Template:` prefix (in any alias or case) is optional both in the
    /// argument and in the text. Other namespace prefixes are part of the
    /// name (`User:Someone/box`). Only whole names match: removing `plural`
    /// leaves `{{plurals}}` alone.
    pub fn remove_template(&mut self, template_name: &str) -> &mut Self {
        let title = self.namespaces.split_title(template_name);
        if title.text.is_empty() {
            log::debug!("remove_template: empty name {:?}", template_name);
            return self;
        }

        let name_re = match title.namespace {
            Namespace::Main | Namespace::Template => format!(
                r"(?:{}\s*:\s*)?{}",
                self.namespaces.namespace_regex(&[Namespace::Template]),
                title_regex(&title.text)
            ),
            ns => format!(
                r"{}\s*:\s*{}",
                self.namespaces.namespace_regex(&[ns]),
                title_regex(&title.text)
            ),
        };
        let pattern = format!(r"\{{\{{\s*{}\s*(?:\||\}}\}})", name_re);
        let Some(re) = compile(&pattern, "remove_template") else {
            return self;
        };

        let (text, count) =
            rewrite_constructs(&self.text, &re, Delimiter::Template, &[], |_, _| {
                Some(String::new())
            });
        log::debug!(
            "remove_template({:?}): removed {} invocation(s)",
            template_name,
            count
        );
        if count > 0 {
            self.text = text;
        }
        self
    }
}

impl fmt::Display for WikitextPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<String> for WikitextPage {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for WikitextPage {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Replace each link matched by `re` with its plain text. Links nested in a
/// removed link's display text are unlinked as well.
fn unlink(text: &str, re: &Regex) -> (String, usize) {
    let mut nested = 0;
    let (out, count) = rewrite_constructs(text, re, Delimiter::Link, &[], |_, span| {
        let link = parse_link_at(text, span.start).ok()?;
        match &link.display {
            Some(display) => {
                let (plain, n) = unlink(display, re);
                nested += n;
                Some(plain)
            }
            None => Some(link.target),
        }
    });
    (out, count + nested)
}

/// Compile an internally built pattern. These come from escaped names, so a
/// failure is logged and the edit skipped instead of surfacing an error.
pub(crate) fn compile(pattern: &str, op: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("{}: could not build pattern {:?}: {}", op, pattern, e);
            None
        }
    }
}

/// Walk the candidates `re` finds in `text`, extend each to its balanced
/// `delim` construct and let `rewrite` replace it.
///
/// Candidates inside `skip` ranges, candidates that never close and
/// `{{` openers that are really part of a `{{{` are passed over. When
/// `rewrite` returns `None` the construct is kept and scanning continues
/// inside it. Returns the new text and the number of rewritten constructs.
pub(crate) fn rewrite_constructs<F>(
    text: &str,
    re: &Regex,
    delim: Delimiter,
    skip: &[Range<usize>],
    mut rewrite: F,
) -> (String, usize)
where
    F: FnMut(&str, Range<usize>) -> Option<String>,
{
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut pos = 0;
    let mut count = 0;

    while pos < text.len() {
        let Some(m) = re.find_at(text, pos) else {
            break;
        };
        let start = m.start();
        pos = start + delim.open().len();

        if within(skip, start) {
            log::trace!("candidate at {} is inside a comment", start);
            continue;
        }
        if delim == Delimiter::Template && start > 0 && bytes[start - 1] == b'{' {
            continue;
        }
        let span = match balanced_span(text, delim, start) {
            Ok(span) => span,
            Err(e) => {
                log::trace!("skipping candidate: {}", e);
                continue;
            }
        };
        if let Some(replacement) = rewrite(&text[span.clone()], span.clone()) {
            out.push_str(&text[last..span.start]);
            out.push_str(&replacement);
            last = span.end;
            pos = span.end;
            count += 1;
        }
    }

    out.push_str(&text[last..]);
    (out, count)
}
