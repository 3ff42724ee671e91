//! Content sources - where the markdown documents come from
//!
//! A [`ContentSource`] can list the entries of a directory and read the raw
//! bytes of one entry. Which backend is used is decided once, from config,
//! when the source is built.

mod github;
mod local;
#[cfg(any(test, feature = "mock"))]
mod memory;

pub use github::GitHubSource;
pub use local::LocalSource;
#[cfg(any(test, feature = "mock"))]
pub use memory::MemorySource;

use async_trait::async_trait;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One item of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// File name without directory
    pub name: String,
    /// Path to pass back to [`ContentSource::read`]
    pub path: String,
    pub is_file: bool,
}

impl Entry {
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_file: true,
        }
    }

    pub fn dir(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_file: false,
        }
    }
}

/// Transport-level encoding of a read payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentEncoding {
    /// Bytes are the document itself
    #[default]
    Identity,
    /// Standard base64, possibly wrapped over several lines
    Base64,
}

/// Raw bytes as returned by a source, still in transport encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContent {
    pub bytes: Vec<u8>,
    pub encoding: ContentEncoding,
}

impl RawContent {
    pub fn identity(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            encoding: ContentEncoding::Identity,
        }
    }

    pub fn base64(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            encoding: ContentEncoding::Base64,
        }
    }

    /// Strip the transport encoding
    pub fn decode(self) -> Result<Vec<u8>, base64::DecodeError> {
        match self.encoding {
            ContentEncoding::Identity => Ok(self.bytes),
            ContentEncoding::Base64 => {
                let compact: Vec<u8> = self
                    .bytes
                    .into_iter()
                    .filter(|b| !b.is_ascii_whitespace())
                    .collect();
                BASE64_STANDARD.decode(compact)
            }
        }
    }
}

/// Errors raised by a content source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The backend could not be reached or answered with a failure
    #[error("source unavailable for '{path}': {source}")]
    Unavailable {
        path: String,
        #[source]
        source: BoxError,
    },

    /// The entry exists but its bytes could not be obtained
    #[error("cannot read '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: BoxError,
    },
}

impl SourceError {
    pub fn unavailable(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Unavailable {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn unreadable(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Unreadable {
            path: path.into(),
            source: source.into(),
        }
    }

    /// The path the failing call was made with
    pub fn path(&self) -> &str {
        match self {
            Self::Unavailable { path, .. } | Self::Unreadable { path, .. } => path,
        }
    }
}

/// Where documents are listed and read from.
///
/// Implementations are shared by all fetch workers and must be safe to call
/// concurrently without extra locking.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Directory holding the documents, in this source's path space
    fn documents_dir(&self) -> &str;

    /// List the entries directly inside `dir`
    async fn list(&self, dir: &str) -> Result<Vec<Entry>, SourceError>;

    /// Read one entry by its [`Entry::path`]
    async fn read(&self, path: &str) -> Result<RawContent, SourceError>;
}
