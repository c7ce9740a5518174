//! Wikitext parsing and surgical editing.
//!
//! The [`wikitext`] module holds the scanner, the template and link parsers
//! and [`WikitextPage`], a text buffer with edits that only ever touch the
//! constructs they target. [`provider`] connects pages to wherever their text
//! is stored.

pub mod provider;
pub mod wikitext;

pub use wikitext::{
    CommentPolicy, InsertOptions, InsertOptionsBuilder, NamespaceTable, ParsedTemplate, Result,
    TemplateParser, WikitextPage, WtError, page_name_regex, parse_all_templates, parse_template,
};
