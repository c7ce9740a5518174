//! Wikitext module root
//!
//! Declares the submodules and re-exports the items callers normally need,
//! so `use wikitext_surgeon::wikitext::...` reaches everything in one step.

pub mod enums;
pub mod errors;
mod images;
pub mod insert;
pub mod namespaces;
pub mod scanner;
pub mod types;
pub mod wiki_text;

pub use enums::{CommentPolicy, Delimiter, ParamKey};
pub use errors::{Result, WtError};
pub use insert::{InsertOptions, InsertOptionsBuilder};
pub use namespaces::{Namespace, NamespaceTable, Title, page_name_regex, title_regex};
pub use scanner::{balanced_span, find_matching_delimiter};
pub use types::links::{Link, parse_link_at};
pub use types::templates::{ParsedTemplate, TemplateParser, parse_all_templates, parse_template};
pub use wiki_text::WikitextPage;
