//! Filesystem content source

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{ContentSource, Entry, RawContent, SourceError};

/// Reads documents from a directory on disk
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    /// Create a source rooted at `root`; the documents live directly inside it
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Join a relative directory and a file name with `/`
fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

#[async_trait]
impl ContentSource for LocalSource {
    fn name(&self) -> &'static str {
        "local"
    }

    fn documents_dir(&self) -> &str {
        ""
    }

    async fn list(&self, dir: &str) -> Result<Vec<Entry>, SourceError> {
        let dir_path = self.root.join(dir.trim_matches('/'));
        let rel = dir.to_string();

        tokio::task::spawn_blocking(move || {
            let mut entries = Vec::new();
            for entry in WalkDir::new(&dir_path)
                .follow_links(true)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
            {
                let entry = entry.map_err(|e| SourceError::unreadable(&rel, e))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                let path = join(&rel, &name);
                entries.push(if entry.file_type().is_file() {
                    Entry::file(name, path)
                } else {
                    Entry::dir(name, path)
                });
            }
            Ok::<_, SourceError>(entries)
        })
        .await
        .map_err(|e| SourceError::unreadable(dir, e))?
    }

    async fn read(&self, path: &str) -> Result<RawContent, SourceError> {
        let bytes = tokio::fs::read(self.root.join(path))
            .await
            .map_err(|e| SourceError::unreadable(path, e))?;
        Ok(RawContent::identity(bytes))
    }
}
