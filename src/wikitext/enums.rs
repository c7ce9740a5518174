//! Enums used by the wikitext module.
//!
//! - `Delimiter` - the three balanced constructs the scanner understands.
//! - `ParamKey` - key of a template parameter, positional or named.
//! - `CommentPolicy` - how `insert_after_templates` treats leading comments.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A balanced delimiter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    /// Template or parser function call: `{{ }}`
    Template,
    /// Parameter-default syntax: `{{{ }}}`
    Parameter,
    /// Wikilink or file embed: `[[ ]]`
    Link,
}

impl Delimiter {
    pub const fn open(self) -> &'static str {
        match self {
            Delimiter::Template => "{{",
            Delimiter::Parameter => "{{{",
            Delimiter::Link => "[[",
        }
    }

    pub const fn close(self) -> &'static str {
        match self {
            Delimiter::Template => "}}",
            Delimiter::Parameter => "}}}",
            Delimiter::Link => "]]",
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.open(), self.close())
    }
}

impl FromStr for Delimiter {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "{{" | "}}" | "{{}}" | "template" => Ok(Delimiter::Template),
            "{{{" | "}}}" | "{{{}}}" | "parameter" | "param" => Ok(Delimiter::Parameter),
            "[[" | "]]" | "[[]]" | "link" => Ok(Delimiter::Link),
            other => Err(format!("unknown Delimiter '{}'", other)),
        }
    }
}

/// Key of a template parameter.
///
/// Unnamed parameters are numbered from 1 in order of appearance. A named
/// parameter whose name is a canonical positive integer (`2=foo`) addresses
/// the same slot as the positional parameter with that number, so it is
/// stored as `Positional` too.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKey {
    Positional(usize),
    Named(String),
}

impl ParamKey {
    /// Build a key from an explicit `name=` prefix (already trimmed).
    pub fn from_name(name: &str) -> Self {
        match name.parse::<usize>() {
            Ok(n) if n > 0 && n.to_string() == name => ParamKey::Positional(n),
            _ => ParamKey::Named(name.to_string()),
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKey::Positional(n) => write!(f, "{}", n),
            ParamKey::Named(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for ParamKey {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ParamKey::from_name(s))
    }
}

impl From<usize> for ParamKey {
    fn from(n: usize) -> Self {
        ParamKey::Positional(n)
    }
}

impl From<&str> for ParamKey {
    fn from(s: &str) -> Self {
        ParamKey::from_name(s)
    }
}

// Keys travel as plain strings so they work as JSON object keys.
impl Serialize for ParamKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ParamKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ParamKey::from_name(&s))
    }
}

/// What `insert_after_templates` does with HTML comments (and other
/// non-template constructs) in the leading run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommentPolicy {
    /// A comment ends the run; the tag goes in front of it.
    #[default]
    Halt,
    /// Constructs matching any of these regexes (anchored at the cursor) are
    /// skipped like allowed templates.
    Skip(Vec<String>),
}

impl fmt::Display for CommentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentPolicy::Halt => write!(f, "Halt"),
            CommentPolicy::Skip(p) => write!(f, "Skip({})", p.join("|")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_fromstr_and_display() {
        assert_eq!(Delimiter::from_str("{{").unwrap(), Delimiter::Template);
        assert_eq!(Delimiter::from_str("}}}").unwrap(), Delimiter::Parameter);
        assert_eq!(Delimiter::from_str("LINK").unwrap(), Delimiter::Link);
        assert!(Delimiter::from_str("<<").is_err());
        assert_eq!(format!("{}", Delimiter::Parameter), "{{{}}}");
    }

    #[test]
    fn param_key_numeric_names_are_positional() {
        assert_eq!(ParamKey::from_name("2"), ParamKey::Positional(2));
        assert_eq!(ParamKey::from_name("02"), ParamKey::Named("02".into()));
        assert_eq!(ParamKey::from_name("0"), ParamKey::Named("0".into()));
        assert_eq!(ParamKey::from_name("size"), ParamKey::Named("size".into()));
        assert_eq!(format!("{}", ParamKey::Positional(3)), "3");
    }

    #[test]
    fn param_key_json_as_string() {
        let v = serde_json::to_string(&ParamKey::Positional(1)).unwrap();
        assert_eq!(v, "\"1\"");
        let k: ParamKey = serde_json::from_str("\"nom\"").unwrap();
        assert_eq!(k, ParamKey::Named("nom".into()));
    }

    #[test]
    fn comment_policy_default_halts() {
        assert_eq!(CommentPolicy::default(), CommentPolicy::Halt);
        let p = CommentPolicy::Skip(vec!["<!-- a -->".into(), "<!-- b -->".into()]);
        assert_eq!(format!("{}", p), "Skip(<!-- a -->|<!-- b -->)");
    }
}
