//! Namespace alias table and title-matching helpers.
//!
//! MediaWiki titles are case-insensitive in their first letter only, while
//! namespace prefixes are case-insensitive throughout and may be spelled with
//! any registered alias (`Image:` for `File:`). The helpers here turn names
//! into regex sources honouring both rules.

use std::fmt;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::wikitext::errors::Result;

/// A MediaWiki canonical namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Media,
    Special,
    Main,
    Talk,
    User,
    #[serde(rename = "User talk")]
    UserTalk,
    Project,
    #[serde(rename = "Project talk")]
    ProjectTalk,
    File,
    #[serde(rename = "File talk")]
    FileTalk,
    MediaWiki,
    #[serde(rename = "MediaWiki talk")]
    MediaWikiTalk,
    Template,
    #[serde(rename = "Template talk")]
    TemplateTalk,
    Help,
    #[serde(rename = "Help talk")]
    HelpTalk,
    Category,
    #[serde(rename = "Category talk")]
    CategoryTalk,
}

impl Namespace {
    pub const ALL: [Namespace; 18] = [
        Namespace::Media,
        Namespace::Special,
        Namespace::Main,
        Namespace::Talk,
        Namespace::User,
        Namespace::UserTalk,
        Namespace::Project,
        Namespace::ProjectTalk,
        Namespace::File,
        Namespace::FileTalk,
        Namespace::MediaWiki,
        Namespace::MediaWikiTalk,
        Namespace::Template,
        Namespace::TemplateTalk,
        Namespace::Help,
        Namespace::HelpTalk,
        Namespace::Category,
        Namespace::CategoryTalk,
    ];

    /// The numeric namespace id.
    pub const fn id(self) -> i32 {
        match self {
            Namespace::Media => -2,
            Namespace::Special => -1,
            Namespace::Main => 0,
            Namespace::Talk => 1,
            Namespace::User => 2,
            Namespace::UserTalk => 3,
            Namespace::Project => 4,
            Namespace::ProjectTalk => 5,
            Namespace::File => 6,
            Namespace::FileTalk => 7,
            Namespace::MediaWiki => 8,
            Namespace::MediaWikiTalk => 9,
            Namespace::Template => 10,
            Namespace::TemplateTalk => 11,
            Namespace::Help => 12,
            Namespace::HelpTalk => 13,
            Namespace::Category => 14,
            Namespace::CategoryTalk => 15,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.id() == id)
    }

    /// Canonical prefix, without the trailing colon. Empty for `Main`.
    pub const fn canonical(self) -> &'static str {
        match self {
            Namespace::Media => "Media",
            Namespace::Special => "Special",
            Namespace::Main => "",
            Namespace::Talk => "Talk",
            Namespace::User => "User",
            Namespace::UserTalk => "User talk",
            Namespace::Project => "Project",
            Namespace::ProjectTalk => "Project talk",
            Namespace::File => "File",
            Namespace::FileTalk => "File talk",
            Namespace::MediaWiki => "MediaWiki",
            Namespace::MediaWikiTalk => "MediaWiki talk",
            Namespace::Template => "Template",
            Namespace::TemplateTalk => "Template talk",
            Namespace::Help => "Help",
            Namespace::HelpTalk => "Help talk",
            Namespace::Category => "Category",
            Namespace::CategoryTalk => "Category talk",
        }
    }

    /// Links to these namespaces without a leading colon do something other
    /// than link: embed the file or put the page in the category.
    pub const fn colon_required_for_link(self) -> bool {
        matches!(self, Namespace::File | Namespace::Category)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Main => write!(f, "(Main)"),
            ns => write!(f, "{}", ns.canonical()),
        }
    }
}

/// A title split into namespace and main text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub namespace: Namespace,
    /// Title without the namespace prefix, first letter upper-cased.
    pub text: String,
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            Namespace::Main => write!(f, "{}", self.text),
            ns => write!(f, "{}:{}", ns.canonical(), self.text),
        }
    }
}

/// Lookup table from namespace to every accepted prefix spelling.
///
/// The canonical name is always the first spelling. Lookups ignore case and
/// treat `_` and space alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceTable {
    spellings: IndexMap<Namespace, Vec<String>>,
}

impl Default for NamespaceTable {
    fn default() -> Self {
        let mut table = NamespaceTable {
            spellings: Namespace::ALL
                .into_iter()
                .filter(|ns| *ns != Namespace::Main)
                .map(|ns| (ns, vec![ns.canonical().to_string()]))
                .collect(),
        };
        table
            .add_alias(Namespace::File, "Image")
            .add_alias(Namespace::FileTalk, "Image talk")
            .add_alias(Namespace::Project, "WP");
        table
    }
}

impl NamespaceTable {
    /// Load extra aliases from JSON on top of the defaults.
    ///
    /// The JSON is an object from canonical namespace name to a list of
    /// aliases, e.g. `{"Project": ["Wikipedia"], "User": ["U"]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let extra: IndexMap<Namespace, Vec<String>> = serde_json::from_str(json)?;
        let mut table = Self::default();
        for (ns, aliases) in extra {
            for alias in aliases {
                table.add_alias(ns, alias);
            }
        }
        log::debug!("loaded namespace table: {:?}", table.spellings);
        Ok(table)
    }

    /// Register another spelling for `ns`. Duplicates are ignored.
    pub fn add_alias<S: Into<String>>(&mut self, ns: Namespace, alias: S) -> &mut Self {
        let alias = alias.into();
        let entry = self.spellings.entry(ns).or_default();
        if !entry.iter().any(|s| fold(s) == fold(&alias)) {
            entry.push(alias);
        }
        self
    }

    /// Every accepted spelling of `ns`, canonical first.
    pub fn spellings(&self, ns: Namespace) -> &[String] {
        self.spellings.get(&ns).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve a prefix (without colon) to its namespace.
    pub fn lookup(&self, prefix: &str) -> Option<Namespace> {
        let key = fold(prefix);
        if key.is_empty() {
            return None;
        }
        self.spellings
            .iter()
            .find(|(_, names)| names.iter().any(|n| fold(n) == key))
            .map(|(ns, _)| *ns)
    }

    /// Split `title` into namespace and main text.
    ///
    /// A leading colon is dropped. Unknown prefixes stay part of the text in
    /// the main namespace.
    pub fn split_title(&self, title: &str) -> Title {
        let title = title.trim();
        let title = title.strip_prefix(':').unwrap_or(title).trim_start();
        if let Some((prefix, rest)) = title.split_once(':')
            && let Some(namespace) = self.lookup(prefix)
        {
            return Title {
                namespace,
                text: ucfirst(rest.trim()),
            };
        }
        Title {
            namespace: Namespace::Main,
            text: ucfirst(title),
        }
    }

    /// Regex source matching any spelling of `namespaces`, ignoring case.
    /// Does not include the colon.
    pub fn namespace_regex(&self, namespaces: &[Namespace]) -> String {
        let alternatives = namespaces
            .iter()
            .flat_map(|ns| self.spellings(*ns))
            .map(|s| {
                s.chars()
                    .map(|c| match c {
                        ' ' | '_' => "[ _]".to_string(),
                        c => regex::escape(c.encode_utf8(&mut [0; 4])),
                    })
                    .collect::<String>()
            })
            .unique()
            .join("|");
        if alternatives.is_empty() {
            String::new()
        } else {
            format!("(?i:{})", alternatives)
        }
    }
}

/// Regex source matching `name` with its first character in either case.
///
/// `"foo bar"` becomes `"[Ff]oo bar"`. Everything after the first character
/// is matched literally.
pub fn page_name_regex(name: &str) -> String {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let rest = regex::escape(chars.as_str());
    let upper: String = first.to_uppercase().collect();
    let lower: String = first.to_lowercase().collect();
    if upper == lower {
        return format!("{}{}", regex::escape(&upper), rest);
    }
    if upper.chars().count() == 1 && lower.chars().count() == 1 {
        format!("[{}{}]{}", upper, lower, rest)
    } else {
        format!(
            "(?:{}|{}){}",
            regex::escape(&upper),
            regex::escape(&lower),
            rest
        )
    }
}

/// Like [`page_name_regex`], but `_` and space match each other as they do
/// in titles: `"short description"` becomes `"[Ss]hort[ _]description"`.
pub fn title_regex(name: &str) -> String {
    page_name_regex(name).replace([' ', '_'], "[ _]")
}

/// Upper-case the first letter only.
pub fn ucfirst(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => {
            format!("{}{}", first.to_uppercase(), chars.as_str())
        }
        _ => s.to_string(),
    }
}

fn fold(s: &str) -> String {
    s.trim().replace('_', " ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_name_regex_first_letter() {
        assert_eq!(page_name_regex("Macbeth"), "[Mm]acbeth");
        assert_eq!(page_name_regex("foo bar"), "[Ff]oo bar");
        assert_eq!(page_name_regex("Fee.svg"), "[Ff]ee\\.svg");
        assert_eq!(page_name_regex("1984"), "1984");
        assert_eq!(page_name_regex("(x)"), "\\(x\\)");
        assert_eq!(page_name_regex(""), "");
    }

    #[test]
    fn title_regex_treats_underscore_as_space() {
        assert_eq!(title_regex("short description"), "[Ss]hort[ _]description");
        let re = regex::Regex::new(&format!("^{}$", title_regex("Short_description"))).unwrap();
        assert!(re.is_match("short description"));
        assert!(re.is_match("Short_description"));
        assert!(!re.is_match("Shortdescription"));
    }

    #[test]
    fn page_name_regex_matches_only_first_letter_loosely() {
        let re = regex::Regex::new(&format!("^{}$", page_name_regex("Juliet"))).unwrap();
        assert!(re.is_match("juliet"));
        assert!(re.is_match("Juliet"));
        assert!(!re.is_match("JULIET"));
    }

    #[test]
    fn default_aliases() {
        let t = NamespaceTable::default();
        assert_eq!(t.lookup("image"), Some(Namespace::File));
        assert_eq!(t.lookup("FILE"), Some(Namespace::File));
        assert_eq!(t.lookup("user_talk"), Some(Namespace::UserTalk));
        assert_eq!(t.lookup("Nope"), None);
        assert_eq!(t.spellings(Namespace::File), ["File", "Image"]);
    }

    #[test]
    fn split_titles() {
        let t = NamespaceTable::default();
        let title = t.split_title("File:Fee.svg");
        assert_eq!(title.namespace, Namespace::File);
        assert_eq!(title.text, "Fee.svg");
        let title = t.split_title(":image: fee.svg");
        assert_eq!(title.namespace, Namespace::File);
        assert_eq!(title.text, "Fee.svg");
        assert_eq!(title.to_string(), "File:Fee.svg");
        let title = t.split_title("juliet");
        assert_eq!(title.namespace, Namespace::Main);
        assert_eq!(title.text, "Juliet");
        let title = t.split_title("Romeo: A Study");
        assert_eq!(title.namespace, Namespace::Main);
        assert_eq!(title.text, "Romeo: A Study");
    }

    #[test]
    fn namespace_regex_accepts_aliases_any_case() {
        let t = NamespaceTable::default();
        let src = t.namespace_regex(&[Namespace::File]);
        assert_eq!(src, "(?i:File|Image)");
        let re = regex::Regex::new(&format!("^{}$", src)).unwrap();
        assert!(re.is_match("iMaGe"));
        assert!(!re.is_match("Media"));
        let talk = t.namespace_regex(&[Namespace::UserTalk]);
        let re = regex::Regex::new(&format!("^{}$", talk)).unwrap();
        assert!(re.is_match("user_talk"));
        assert!(re.is_match("User talk"));
        assert_eq!(t.namespace_regex(&[Namespace::Main]), "");
    }

    #[test]
    fn json_aliases_extend_defaults() {
        let t = NamespaceTable::from_json(r#"{"Project": ["Wikipedia"], "File": ["image"]}"#)
            .unwrap();
        assert_eq!(t.lookup("wikipedia"), Some(Namespace::Project));
        assert_eq!(t.lookup("wp"), Some(Namespace::Project));
        // "image" already present in another case
        assert_eq!(t.spellings(Namespace::File).len(), 2);
        assert!(NamespaceTable::from_json(r#"{"Nowhere": []}"#).is_err());
    }

    #[test]
    fn namespace_ids() {
        assert_eq!(Namespace::File.id(), 6);
        assert_eq!(Namespace::from_id(14), Some(Namespace::Category));
        assert_eq!(Namespace::from_id(99), None);
        assert!(Namespace::Category.colon_required_for_link());
        assert!(!Namespace::User.colon_required_for_link());
    }
}
