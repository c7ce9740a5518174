//! Error types for the wikitext module.
//!
//! All fallible operations return [`Result<T>`], an alias over [`WtError`].
//! Note that a mutator finding nothing to rewrite is *not* an error: those
//! calls leave the buffer untouched and return normally.

use std::error::Error;

/// The canonical result type used across the wikitext module.
pub type Result<T> = std::result::Result<T, WtError>;

type BoxedSource = Box<dyn Error + Send + Sync + 'static>;

/// Wikitext error.
///
/// - `MalformedMarkup` - an opening delimiter without a matching close before
///    the end of the text, or no template where one was required.
/// - `Usage` - a mandatory argument was missing or empty.
/// - `InvalidOffset` - an explicit offset is past the end of the text or
///    splits a UTF-8 character.
/// - `Pattern` - a caller supplied regular expression failed to compile.
/// - `Config` - a namespace table could not be loaded.
/// - `Provider` - an external text source or sink failed.
#[derive(Debug, thiserror::Error)]
pub enum WtError {
    #[error("Malformed markup at {offset}: {msg}")]
    MalformedMarkup {
        msg: String,
        /// Byte offset of the opener that could not be closed.
        offset: usize,
    },
    #[error("Usage error: {msg}")]
    Usage { msg: String },
    #[error("Invalid offset: {offset} (text length {len})")]
    InvalidOffset { offset: usize, len: usize },
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Config error: {msg}")]
    Config {
        msg: String,
        #[source]
        source: Option<BoxedSource>,
    },
    #[error("Provider error: {msg}")]
    Provider {
        msg: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl WtError {
    /// Construct a malformed-markup error for the opener at `offset`.
    pub fn malformed_at<S: Into<String>>(msg: S, offset: usize) -> Self {
        WtError::MalformedMarkup {
            msg: msg.into(),
            offset,
        }
    }

    /// Construct a usage error.
    pub fn usage<S: Into<String>>(msg: S) -> Self {
        WtError::Usage { msg: msg.into() }
    }

    pub fn invalid_offset(offset: usize, len: usize) -> Self {
        WtError::InvalidOffset { offset, len }
    }

    /// Wrap a lower level error as a configuration failure.
    pub fn config<E: Error + Send + Sync + 'static>(msg: impl Into<String>, e: E) -> Self {
        WtError::Config {
            msg: msg.into(),
            source: Some(Box::new(e)),
        }
    }

    /// Provider failure, optionally carrying the underlying cause.
    pub fn provider<E: Error + Send + Sync + 'static>(
        msg: impl Into<String>,
        source: Option<E>,
    ) -> Self {
        WtError::Provider {
            msg: msg.into(),
            source: source.map(|e| Box::new(e) as BoxedSource),
        }
    }

    /// Returns a short, user-friendly description of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            WtError::MalformedMarkup { .. } => "MalformedMarkup",
            WtError::Usage { .. } => "Usage",
            WtError::InvalidOffset { .. } => "InvalidOffset",
            WtError::Pattern(_) => "Pattern",
            WtError::Config { .. } => "Config",
            WtError::Provider { .. } => "Provider",
        }
    }

    /// Byte offset the error refers to, when there is one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            WtError::MalformedMarkup { offset, .. } | WtError::InvalidOffset { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for WtError {
    fn from(e: serde_json::Error) -> Self {
        WtError::config("invalid namespace table", e)
    }
}
