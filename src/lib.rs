//! blog-api: Serves a collection of markdown blog posts as rendered JSON
//!
//! Posts are read from a content source (a local directory or a GitHub
//! repository), rendered to HTML with their front matter extracted, and
//! returned newest first.

pub mod commands;
pub mod config;
pub mod content;
pub mod fetcher;
pub mod server;
pub mod source;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use content::{Blog, MarkdownRenderer};
use fetcher::{FetchContext, FetchError, Fetcher};
use source::ContentSource;

/// The main blog-api application
#[derive(Clone)]
pub struct BlogApi {
    /// Blog configuration
    pub config: config::BlogConfig,
    /// Base directory
    pub base_dir: PathBuf,
    fetcher: Arc<Fetcher>,
}

impl BlogApi {
    /// Create a new instance from a directory, loading `_config.yml` if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::BlogConfig::load(&config_path)?
        } else {
            let mut config = config::BlogConfig::default();
            config.apply_env()?;
            config.validate()?;
            config
        };

        let source = config.build_source(&base_dir)?;
        Ok(Self::with_source(config, base_dir, source))
    }

    /// Create an instance over an already constructed content source
    pub fn with_source(
        config: config::BlogConfig,
        base_dir: PathBuf,
        source: Arc<dyn ContentSource>,
    ) -> Self {
        let renderer = MarkdownRenderer::with_options(config.render.options());
        let fetcher = Fetcher::new(source, renderer, config.fetch.max_workers);

        Self {
            config,
            base_dir,
            fetcher: Arc::new(fetcher),
        }
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Pipeline budget from `fetch.timeout_secs`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.fetch.timeout_secs)
    }

    /// Fetch every post, newest first.
    ///
    /// The fetch stops at the earlier of the caller's deadline and the
    /// configured timeout.
    pub async fn get_all_posts(&self, cx: &FetchContext) -> Result<Blog, FetchError> {
        let cx = cx.with_timeout(self.timeout());
        self.fetcher.fetch_all(&cx).await
    }
}
