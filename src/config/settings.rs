//! Blog configuration (_config.yml)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::content::RenderOptions;
use crate::source::{ContentSource, GitHubSource, LocalSource};

/// Environment variable holding the GitHub token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
/// Environment variable selecting the content source
pub const SOURCE_ENV: &str = "BLOG_SOURCE";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    pub source: SourceKind,
    pub github: GitHubConfig,
    pub local: LocalConfig,
    pub fetch: FetchConfig,
    pub render: RenderConfig,
    pub server: ServerConfig,
}

/// Which content source backs the blog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Local,
    Github,
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "github" => Ok(Self::Github),
            other => bail!("unknown content source '{}' (expected local or github)", other),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Github => f.write_str("github"),
        }
    }
}

/// GitHub repository holding the posts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    /// Directory of the posts inside the repository
    pub path: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            path: "posts".to_string(),
            token: None,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

/// Posts directory on the local filesystem
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Relative to the base directory unless absolute
    pub path: String,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            path: "posts".to_string(),
        }
    }
}

/// Fetch pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_workers: usize,
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_workers: crate::fetcher::DEFAULT_MAX_WORKERS,
            timeout_secs: 30,
        }
    }
}

/// Markdown rendering settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub heading_anchors: bool,
    pub external_links_new_tab: bool,
}

impl RenderConfig {
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            heading_anchors: self.heading_anchors,
            external_links_new_tab: self.external_links_new_tab,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl BlogConfig {
    /// Load configuration from a YAML file, then apply environment overrides
    /// and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.apply_env()?;
        config.validate()?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Parse YAML without overrides or validation. An empty document is the
    /// default config.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `GITHUB_TOKEN` and `BLOG_SOURCE` from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup. Empty values are
    /// ignored.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = var(TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.github.token = Some(token);
        }
        if let Some(source) = var(SOURCE_ENV).filter(|v| !v.trim().is_empty()) {
            self.source = source
                .parse()
                .with_context(|| format!("Invalid {}", SOURCE_ENV))?;
        }
        Ok(())
    }

    /// Check the settings the selected source and the pipeline depend on
    pub fn validate(&self) -> Result<()> {
        if self.source == SourceKind::Github {
            let github = &self.github;
            if github.owner.trim().is_empty() {
                bail!("github.owner is required for the github source");
            }
            if github.repo.trim().is_empty() {
                bail!("github.repo is required for the github source");
            }
            if github.path.trim_matches('/').is_empty() {
                bail!("github.path is required for the github source");
            }
        }
        if self.fetch.max_workers == 0 {
            bail!("fetch.max_workers must be at least 1");
        }
        if self.fetch.timeout_secs == 0 {
            bail!("fetch.timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Construct the configured content source
    pub fn build_source<P: AsRef<Path>>(&self, base_dir: P) -> Result<Arc<dyn ContentSource>> {
        match self.source {
            SourceKind::Local => {
                let root = base_dir.as_ref().join(&self.local.path);
                tracing::debug!("Using local source at {:?}", root);
                Ok(Arc::new(LocalSource::new(root)))
            }
            SourceKind::Github => {
                let github = &self.github;
                tracing::debug!(
                    "Using github source {}/{}:{}",
                    github.owner,
                    github.repo,
                    github.path
                );
                let source =
                    GitHubSource::new(github).context("Failed to build GitHub client")?;
                Ok(Arc::new(source))
            }
        }
    }
}
