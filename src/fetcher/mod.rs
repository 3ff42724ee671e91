//! Fetch pipeline - list, read, decode and render every post concurrently
//!
//! The pipeline is all-or-nothing: the first error from any document aborts
//! the remaining work and is returned on its own. Cancellation and the
//! deadline carried by the [`FetchContext`] are checked before each document
//! and raced against the whole fetch.

mod aggregate;
mod context;
mod error;

pub use aggregate::assemble;
pub use context::{CancelCause, CancelHandle, FetchContext};
pub use error::{FetchError, FetchErrorKind};

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

use crate::content::{Blog, MarkdownRenderer, Post, RenderError};
use crate::source::{ContentSource, Entry};

/// Concurrent reads in flight against the source, by default
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Only entries with this suffix are treated as posts
pub const DOCUMENT_EXTENSION: &str = ".md";

/// Whether a listing entry is a post to fetch
pub fn is_document(entry: &Entry) -> bool {
    entry.is_file && entry.name.ends_with(DOCUMENT_EXTENSION)
}

/// Fetches and renders every post of a content source
pub struct Fetcher {
    source: Arc<dyn ContentSource>,
    renderer: MarkdownRenderer,
    max_workers: usize,
}

impl Fetcher {
    /// Create a fetcher processing at most `max_workers` documents at once
    /// (at least 1)
    pub fn new(
        source: Arc<dyn ContentSource>,
        renderer: MarkdownRenderer,
        max_workers: usize,
    ) -> Self {
        Self {
            source,
            renderer,
            max_workers: max_workers.max(1),
        }
    }

    pub fn source(&self) -> &dyn ContentSource {
        self.source.as_ref()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Fetch every post, newest first.
    ///
    /// A directory without posts yields an empty [`Blog`]. Concurrency is
    /// `min(max_workers, number of posts)`; completion order is arbitrary
    /// and the result is ordered by [`assemble`].
    pub async fn fetch_all(&self, cx: &FetchContext) -> Result<Blog, FetchError> {
        cx.check()?;

        let dir = self.source.documents_dir();
        let entries = tokio::select! {
            biased;
            cause = cx.done() => return Err(cause.into()),
            listed = self.source.list(dir) => listed.map_err(FetchError::listing)?,
        };

        let documents: Vec<Entry> = entries.into_iter().filter(is_document).collect();
        if documents.is_empty() {
            tracing::debug!(source = self.source.name(), dir, "No posts to fetch");
            return Ok(Blog::new());
        }

        let workers = self.max_workers.min(documents.len());
        tracing::debug!(
            source = self.source.name(),
            posts = documents.len(),
            workers,
            "Fetching posts"
        );

        // try_collect stops at the first error and drops the stream, which
        // drops every read still in flight along with the queued ones
        let work = stream::iter(documents)
            .map(|entry| self.fetch_post(cx, entry))
            .buffer_unordered(workers)
            .try_collect::<Vec<Post>>();

        let posts = tokio::select! {
            biased;
            cause = cx.done() => return Err(cause.into()),
            result = work => result?,
        };

        Ok(assemble(posts))
    }

    /// Read, decode and render a single post
    async fn fetch_post(&self, cx: &FetchContext, entry: Entry) -> Result<Post, FetchError> {
        cx.check()?;

        let raw = self
            .source
            .read(&entry.path)
            .await
            .map_err(|e| FetchError::reading(&entry.name, e))?;

        let bytes = raw.decode().map_err(|source| FetchError::DecodeFailure {
            filename: entry.name.clone(),
            source,
        })?;

        let rendered = match self.renderer.render(&bytes) {
            Ok(rendered) => rendered,
            Err(RenderError::Metadata { partial, source }) => {
                tracing::warn!(
                    filename = %entry.name,
                    error = %source,
                    "Failed to decode front matter, keeping content without metadata"
                );
                *partial
            }
            Err(source) => {
                return Err(FetchError::RenderFailure {
                    filename: entry.name,
                    source,
                })
            }
        };

        Ok(Post::new(entry.name, rendered))
    }
}
