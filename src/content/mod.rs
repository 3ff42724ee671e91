//! Content module - front matter, markdown rendering and post models

mod frontmatter;
mod markdown;
mod post;

pub use frontmatter::{FrontMatter, FrontMatterError};
pub use markdown::{MarkdownRenderer, RenderError, RenderOptions};
pub use post::{Blog, Post, Rendered};
