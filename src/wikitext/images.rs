//! File usage edits: commenting an image out of a page, and adding options
//! to its embeds.
//!
//! An image shows up on a page in three ways, all handled here:
//! embeds (`[[File:X.png|thumb|caption]]`), lines of a `<gallery>` block and
//! bare file names passed to a template (`| image = X.png`). Display links
//! (`[[:File:X.png]]`) are not usages and are never touched.

use std::ops::Range;

use lazy_regex::regex;
use regex::Regex;

use crate::wikitext::enums::Delimiter;
use crate::wikitext::namespaces::{Namespace, title_regex};
use crate::wikitext::scanner::{comment_spans, find_top_level, within};
use crate::wikitext::types::links::parse_link_at;
use crate::wikitext::types::templates::parse_all_templates;
use crate::wikitext::wiki_text::{WikitextPage, compile, rewrite_constructs};

impl WikitextPage {
    /// Comment out every usage of `image`, prefixing the comment with
    /// `reason: ` when a reason is given.
    ///
    /// `image` may be given with or without its `File:`/`Image:` prefix.
    /// Usages already inside a comment are left alone, so calling this twice
    /// changes nothing the second time.
    pub fn comment_out_image(&mut self, image: &str, reason: Option<&str>) -> &mut Self {
        let Some(name_re) = self.file_name_regex(image) else {
            log::debug!("comment_out_image: empty image name");
            return self;
        };
        let ns_re = self.namespaces().namespace_regex(&[Namespace::File]);
        let prefix = match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => format!("{}: ", r),
            None => String::new(),
        };
        let wrap = |s: &str| format!("<!-- {}{} -->", prefix, s);

        // embeds
        let Some(embed_re) = compile(&embed_pattern(&ns_re, &name_re), "comment_out_image") else {
            return self;
        };
        let skip = comment_spans(self.text());
        let (text, embeds) =
            rewrite_constructs(self.text(), &embed_re, Delimiter::Link, &skip, |s, _| {
                self.is_embed(s).then(|| wrap(s))
            });

        // gallery lines
        let line_pattern = format!(
            r"(?m)^[ \t]*(?:{}[ \t]*:[ \t]*)?{}[ \t]*(?:\|[^\n]*)?$",
            ns_re, name_re
        );
        let Some(line_re) = compile(&line_pattern, "comment_out_image") else {
            return self;
        };
        let skip = comment_spans(&text);
        let mut edits = Vec::new();
        for block in regex!(r"(?is)<gallery\b[^>]*>(.*?)</gallery>").captures_iter(&text) {
            let Some(body) = block.get(1) else { continue };
            for m in line_re.find_iter(body.as_str()) {
                let range = body.start() + m.start()..body.start() + m.end();
                if !within(&skip, range.start) {
                    edits.push((range, wrap(m.as_str())));
                }
            }
        }
        let gallery = edits.len();
        let text = splice(&text, edits);

        // free template parameters
        let value_pattern = format!(r"^(?:{}\s*:\s*)?{}$", ns_re, name_re);
        let Some(value_re) = compile(&value_pattern, "comment_out_image") else {
            return self;
        };
        let mut ranges = Vec::new();
        free_usages(&text, 0, &value_re, &mut ranges);
        let free = ranges.len();
        let edits = ranges
            .into_iter()
            .map(|r| {
                let replacement = wrap(&text[r.clone()]);
                (r, replacement)
            })
            .collect();
        let text = splice(&text, edits);

        log::debug!(
            "comment_out_image({:?}): {} embed(s), {} gallery line(s), {} parameter(s)",
            image,
            embeds,
            gallery,
            free
        );
        if embeds + gallery + free > 0 {
            self.replace_text(text);
        }
        self
    }

    /// Append `|data` to every embed of `image`.
    ///
    /// Embeds whose options already end with `|data` are skipped, as are
    /// embeds inside comments and display links.
    pub fn add_to_image_comment(&mut self, image: &str, data: &str) -> &mut Self {
        if data.is_empty() {
            log::debug!("add_to_image_comment: nothing to add");
            return self;
        }
        let Some(name_re) = self.file_name_regex(image) else {
            log::debug!("add_to_image_comment: empty image name");
            return self;
        };
        let ns_re = self.namespaces().namespace_regex(&[Namespace::File]);
        let Some(embed_re) = compile(&embed_pattern(&ns_re, &name_re), "add_to_image_comment")
        else {
            return self;
        };

        let suffix = format!("|{}", data);
        let skip = comment_spans(self.text());
        let (text, count) =
            rewrite_constructs(self.text(), &embed_re, Delimiter::Link, &skip, |s, _| {
                let inner = &s[2..s.len() - 2];
                if !self.is_embed(s) || inner.trim_end().ends_with(&suffix) {
                    None
                } else {
                    Some(format!("[[{}{}]]", inner, suffix))
                }
            });
        log::debug!("add_to_image_comment({:?}): extended {} embed(s)", image, count);
        if count > 0 {
            self.replace_text(text);
        }
        self
    }

    /// Whether the `[[...]]` construct `s` embeds a file rather than
    /// linking to its page.
    fn is_embed(&self, s: &str) -> bool {
        parse_link_at(s, 0).is_ok_and(|link| link.is_file_embed(self.namespaces()))
    }

    /// Regex source for the bare file name of `image`, or `None` if it is
    /// empty.
    fn file_name_regex(&self, image: &str) -> Option<String> {
        let title = self.namespaces().split_title(image);
        let name = match title.namespace {
            Namespace::File | Namespace::Main => title.text,
            _ => title.to_string(),
        };
        (!name.is_empty()).then(|| title_regex(&name))
    }
}

/// Candidate `[[` openers naming the file. Whether one is an embed is
/// decided by [`Link::is_file_embed`](crate::wikitext::types::links::Link::is_file_embed).
fn embed_pattern(ns_re: &str, name_re: &str) -> String {
    format!(r"\[\[\s*:?\s*{}\s*:\s*{}\s*(?:\||\]\])", ns_re, name_re)
}

/// Collect the ranges of template parameters (leading `|` included) whose
/// value is just the file name. Nested templates are searched too; `base` is
/// the offset of `text` in the page.
fn free_usages(text: &str, base: usize, value_re: &Regex, out: &mut Vec<Range<usize>>) {
    for template in parse_all_templates(text) {
        let mut seg_start = template.span.start + 2;
        for (k, seg) in template.segments.iter().enumerate() {
            let value = match find_top_level(seg, '=') {
                Some(eq) => &seg[eq + 1..],
                None => seg.as_str(),
            };
            if k > 0 && value_re.is_match(value.trim()) {
                let end = seg_start + seg.trim_end().len();
                out.push(base + seg_start - 1..base + end);
            } else {
                free_usages(seg, base + seg_start, value_re, out);
            }
            seg_start += seg.len() + 1;
        }
    }
}

/// Apply sorted, non-overlapping replacements.
fn splice(text: &str, edits: Vec<(Range<usize>, String)>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (range, replacement) in edits {
        out.push_str(&text[last..range.start]);
        out.push_str(&replacement);
        last = range.end;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use crate::wikitext::wiki_text::WikitextPage;

    const TEXT: &str = "{{short description}}{{about}}[[File:Fee.svg]]O, [[Juliet|she]] doth {{plural|teach}} the torches to burn bright!";
    const LINKS: &str = "O, [[:File:Fee.svg|she]] [[File:Fee.svg|doth]] {{plural|teach}} [[:File:Fee.svg|the]] [[File:Fee.svg|torches]] [[Fee.svg|to]] burn bright!";

    #[test]
    fn comment_out_embed() {
        let mut page = WikitextPage::new(TEXT);
        page.comment_out_image("Fee.svg", Some("too pretty"));
        assert_eq!(
            page.text(),
            "{{short description}}{{about}}<!-- too pretty: [[File:Fee.svg]] -->O, [[Juliet|she]] doth {{plural|teach}} the torches to burn bright!"
        );
    }

    #[test]
    fn comment_out_without_reason() {
        let mut page = WikitextPage::new("a [[image:fee.svg|thumb|A [[b|c]]]] b");
        page.comment_out_image("File:Fee.svg", None);
        assert_eq!(page.text(), "a <!-- [[image:fee.svg|thumb|A [[b|c]]]] --> b");
    }

    #[test]
    fn comment_out_skips_display_links() {
        let mut page = WikitextPage::new(LINKS);
        page.comment_out_image("Fee.svg", Some("reason"));
        assert_eq!(
            page.text(),
            "O, [[:File:Fee.svg|she]] <!-- reason: [[File:Fee.svg|doth]] --> {{plural|teach}} [[:File:Fee.svg|the]] <!-- reason: [[File:Fee.svg|torches]] --> [[Fee.svg|to]] burn bright!"
        );
    }

    #[test]
    fn comment_out_image_or_file() {
        let mut page = WikitextPage::new(
            "O, [[File:Fee.svg|she]] [[Image:Fee.svg|doth]] {{plural|teach}} [[:File:Fee.svg|the]] [[Image:Fee.svg|torches]] [[Fee.svg|to]] burn bright!",
        );
        page.comment_out_image("Fee.svg", None);
        assert_eq!(
            page.text(),
            "O, <!-- [[File:Fee.svg|she]] --> <!-- [[Image:Fee.svg|doth]] --> {{plural|teach}} [[:File:Fee.svg|the]] <!-- [[Image:Fee.svg|torches]] --> [[Fee.svg|to]] burn bright!"
        );
    }

    #[test]
    fn comment_out_with_stray_openers() {
        let text = format!(
            "{{{{Infobox|caption={}|image=Fee.svg}}}}",
            "a [[ b ".repeat(20)
        );
        let started = std::time::Instant::now();
        let mut page = WikitextPage::new(text.as_str());
        page.comment_out_image("Fee.svg", None);
        assert_eq!(
            page.text(),
            text.replace("|image=Fee.svg", "<!-- |image=Fee.svg -->")
        );
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn comment_out_is_idempotent() {
        let mut page = WikitextPage::new(TEXT);
        page.comment_out_image("Fee.svg", Some("too pretty"));
        let once = page.text().to_string();
        page.comment_out_image("Fee.svg", Some("too pretty"));
        assert_eq!(page.text(), once);
    }

    #[test]
    fn comment_out_gallery_lines() {
        let mut page = WikitextPage::new(
            "<gallery mode=packed>\nFile:Fee.svg|A caption\n Fee.svg\nFoo.png|Fee.svg\n</gallery>\nFee.svg",
        );
        page.comment_out_image("Fee.svg", Some("gone"));
        assert_eq!(
            page.text(),
            "<gallery mode=packed>\n<!-- gone: File:Fee.svg|A caption -->\n<!-- gone:  Fee.svg -->\nFoo.png|Fee.svg\n</gallery>\nFee.svg"
        );
    }

    #[test]
    fn comment_out_template_parameters() {
        let mut page = WikitextPage::new(
            "{{Infobox person\n| image = Fee.svg\n| name = Juliet\n}}{{x|{{y|File:Fee.svg}}|Fee.svg.png}}",
        );
        page.comment_out_image("Fee.svg", None);
        assert_eq!(
            page.text(),
            "{{Infobox person\n<!-- | image = Fee.svg -->\n| name = Juliet\n}}{{x|{{y<!-- |File:Fee.svg -->}}|Fee.svg.png}}"
        );
        let once = page.text().to_string();
        page.comment_out_image("Fee.svg", None);
        assert_eq!(page.text(), once);
    }

    #[test]
    fn comment_out_no_match() {
        let mut page = WikitextPage::new(LINKS);
        page.comment_out_image("Fie.svg", Some("x")).comment_out_image("", None);
        assert_eq!(page.text(), LINKS);
    }

    #[test]
    fn add_to_embed() {
        let mut page = WikitextPage::new(TEXT);
        page.add_to_image_comment("Fee.svg", "thumb|size=42");
        assert_eq!(
            page.text(),
            "{{short description}}{{about}}[[File:Fee.svg|thumb|size=42]]O, [[Juliet|she]] doth {{plural|teach}} the torches to burn bright!"
        );
    }

    #[test]
    fn add_to_multiple_embeds() {
        let mut page = WikitextPage::new(
            "O, [[File:Fee.svg|doth|teach]] [[:File:Fee.svg|the]] [[Image:Fee.svg]]",
        );
        page.add_to_image_comment("File:Fee.svg", "thumb|size=42|test");
        assert_eq!(
            page.text(),
            "O, [[File:Fee.svg|doth|teach|thumb|size=42|test]] [[:File:Fee.svg|the]] [[Image:Fee.svg|thumb|size=42|test]]"
        );
    }

    #[test]
    fn add_to_image_or_file() {
        let mut page = WikitextPage::new(
            "O, [[File:Fee.svg|she]] [[Image:Fee.svg|doth]] {{plural|teach}} [[:File:Fee.svg|the]] [[Image:Fee.svg|torches]] [[Fee.svg|to]] burn bright!",
        );
        page.add_to_image_comment("Fee.svg", "size=42");
        assert_eq!(
            page.text(),
            "O, [[File:Fee.svg|she|size=42]] [[Image:Fee.svg|doth|size=42]] {{plural|teach}} [[:File:Fee.svg|the]] [[Image:Fee.svg|torches|size=42]] [[Fee.svg|to]] burn bright!"
        );
    }

    #[test]
    fn add_to_is_idempotent() {
        let mut page = WikitextPage::new(TEXT);
        page.add_to_image_comment("Fee.svg", "size=42");
        let once = page.text().to_string();
        page.add_to_image_comment("Fee.svg", "size=42");
        assert_eq!(page.text(), once);
        page.add_to_image_comment("Fee.svg", "");
        assert_eq!(page.text(), once);
    }

    #[test]
    fn add_to_skips_commented_embeds() {
        let text = "<!-- [[File:Fee.svg]] -->";
        let mut page = WikitextPage::new(text);
        page.add_to_image_comment("Fee.svg", "thumb");
        assert_eq!(page.text(), text);
    }
}
