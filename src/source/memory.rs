//! In-memory content source for tests (`mock` feature).
//!
//! Reads can be delayed or made to fail per file, and the number of reads in
//! flight is recorded.

use async_trait::async_trait;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{ContentSource, Entry, RawContent, SourceError};

#[derive(Debug, Clone, Copy)]
enum Failure {
    Unavailable,
    Unreadable,
}

/// Documents held in memory, listed in name order.
///
/// # Example
///
/// ```ignore
/// let source = MemorySource::new()
///     .with_file("2024-01-01-hello.md", "# Hello")
///     .with_failing_read("broken.md");
/// ```
#[derive(Debug, Default)]
pub struct MemorySource {
    files: BTreeMap<String, RawContent>,
    dirs: Vec<String>,
    read_delay: Option<Duration>,
    delays: HashMap<String, Duration>,
    read_failures: HashMap<String, Failure>,
    list_failure: bool,
    list_delay: Option<Duration>,
    reads_started: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight counter even if the read is dropped mid-way
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemorySource {
    /// Create a new empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plain file
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files
            .insert(name.into(), RawContent::identity(content.into()));
        self
    }

    /// Add a file served base64-encoded, as the GitHub API does
    #[must_use]
    pub fn with_base64_file(mut self, name: impl Into<String>, content: impl AsRef<[u8]>) -> Self {
        let encoded = BASE64_STANDARD.encode(content);
        self.files.insert(name.into(), RawContent::base64(encoded));
        self
    }

    /// Add a file with an exact raw payload
    #[must_use]
    pub fn with_raw(mut self, name: impl Into<String>, raw: RawContent) -> Self {
        self.files.insert(name.into(), raw);
        self
    }

    /// Add a subdirectory entry (never read)
    #[must_use]
    pub fn with_dir(mut self, name: impl Into<String>) -> Self {
        self.dirs.push(name.into());
        self
    }

    /// Delay every read
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Delay reads of one file, overriding the global delay
    #[must_use]
    pub fn with_slow_file(mut self, name: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(name.into(), delay);
        self
    }

    /// Make reads of `name` fail as unreadable; the file is listed either way
    #[must_use]
    pub fn with_failing_read(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.files
            .entry(name.clone())
            .or_insert_with(|| RawContent::identity(Vec::new()));
        self.read_failures.insert(name, Failure::Unreadable);
        self
    }

    /// Make reads of `name` fail as if the backend were down
    #[must_use]
    pub fn with_unavailable_read(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.files
            .entry(name.clone())
            .or_insert_with(|| RawContent::identity(Vec::new()));
        self.read_failures.insert(name, Failure::Unavailable);
        self
    }

    /// Delay the listing
    #[must_use]
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Make the listing fail
    #[must_use]
    pub fn with_failing_list(mut self) -> Self {
        self.list_failure = true;
        self
    }

    /// Number of reads that have been started so far
    pub fn reads_started(&self) -> usize {
        self.reads_started.load(Ordering::SeqCst)
    }

    /// Highest number of reads observed running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn documents_dir(&self) -> &str {
        ""
    }

    async fn list(&self, dir: &str) -> Result<Vec<Entry>, SourceError> {
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        if self.list_failure {
            return Err(SourceError::unavailable(dir, "listing failed"));
        }

        let mut entries: Vec<Entry> = self
            .files
            .keys()
            .map(|name| Entry::file(name.as_str(), name.as_str()))
            .chain(self.dirs.iter().map(|name| Entry::dir(name.as_str(), name.as_str())))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, path: &str) -> Result<RawContent, SourceError> {
        self.reads_started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(delay) = self.delays.get(path).copied().or(self.read_delay) {
            tokio::time::sleep(delay).await;
        }

        match self.read_failures.get(path) {
            Some(Failure::Unavailable) => Err(SourceError::unavailable(path, "backend down")),
            Some(Failure::Unreadable) => Err(SourceError::unreadable(path, "read failed")),
            None => self
                .files
                .get(path)
                .cloned()
                .ok_or_else(|| SourceError::unreadable(path, "no such file")),
        }
    }
}
