//! Where page text comes from and goes to.
//!
//! The edit operations never do any I/O themselves. A [`PageSource`] hands
//! out the current text of a title and a [`PageSink`] takes the edited text
//! back together with an edit summary. Two stores are provided: an in-memory
//! one for tests and batch jobs, and one that keeps each page as a file in a
//! directory.

use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::wikitext::errors::{Result, WtError};
use crate::wikitext::namespaces::NamespaceTable;
use crate::wikitext::wiki_text::WikitextPage;

/// Something page text can be read from.
pub trait PageSource {
    /// Current text of `title`.
    fn fetch(&self, title: &str) -> Result<String>;
}

/// Something edited page text can be written to.
pub trait PageSink {
    fn store(&mut self, title: &str, text: &str, summary: &str) -> Result<()>;
}

/// A saved revision as kept by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub title: String,
    pub summary: String,
}

/// Pages held in memory, keyed by normalised title, with a log of every
/// store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pages: IndexMap<String, String>,
    history: Vec<Revision>,
    namespaces: NamespaceTable,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a page without recording a revision.
    pub fn insert<T: Into<String>>(&mut self, title: &str, text: T) -> &mut Self {
        let key = self.key(title);
        self.pages.insert(key, text.into());
        self
    }

    pub fn history(&self) -> &[Revision] {
        &self.history
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    fn key(&self, title: &str) -> String {
        self.namespaces.split_title(title).to_string().replace('_', " ")
    }
}

impl PageSource for MemoryStore {
    fn fetch(&self, title: &str) -> Result<String> {
        self.pages
            .get(&self.key(title))
            .cloned()
            .ok_or_else(|| {
                WtError::provider(format!("no page named {:?}", title), None::<std::io::Error>)
            })
    }
}

impl PageSink for MemoryStore {
    fn store(&mut self, title: &str, text: &str, summary: &str) -> Result<()> {
        let key = self.key(title);
        log::debug!("storing {:?} ({} bytes): {}", key, text.len(), summary);
        self.pages.insert(key.clone(), text.to_string());
        self.history.push(Revision {
            title: key,
            summary: summary.to_string(),
        });
        Ok(())
    }
}

/// Pages kept as `<title>.wiki` files in one directory.
///
/// Spaces become `_` and `/` becomes `%2F` in file names. Summaries are
/// logged but not written anywhere.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    namespaces: NamespaceTable,
}

impl DirStore {
    /// Use `root` as the page directory, creating it if needed.
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            WtError::provider(format!("cannot create {}", root.display()), Some(e))
        })?;
        Ok(Self {
            root,
            namespaces: NamespaceTable::default(),
        })
    }

    fn path(&self, title: &str) -> PathBuf {
        let name = self
            .namespaces
            .split_title(title)
            .to_string()
            .replace(' ', "_")
            .replace('/', "%2F");
        self.root.join(format!("{}.wiki", name))
    }
}

impl PageSource for DirStore {
    fn fetch(&self, title: &str) -> Result<String> {
        let path = self.path(title);
        fs::read_to_string(&path)
            .map_err(|e| WtError::provider(format!("cannot read {}", path.display()), Some(e)))
    }
}

impl PageSink for DirStore {
    fn store(&mut self, title: &str, text: &str, summary: &str) -> Result<()> {
        let path = self.path(title);
        log::info!("writing {}: {}", path.display(), summary);
        fs::write(&path, text)
            .map_err(|e| WtError::provider(format!("cannot write {}", path.display()), Some(e)))
    }
}

impl WikitextPage {
    /// Fetch `title` from `source` into a new page.
    pub fn load<S: PageSource + ?Sized>(source: &S, title: &str) -> Result<Self> {
        let text = source.fetch(title)?;
        log::debug!("loaded {:?} ({} bytes)", title, text.len());
        Ok(Self::new(text))
    }

    /// Write the current text to `sink` under `title`.
    pub fn save<K: PageSink + ?Sized>(
        &self,
        sink: &mut K,
        title: &str,
        summary: &str,
    ) -> Result<()> {
        sink.store(title, self.text(), summary)
    }
}
