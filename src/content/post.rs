//! Post and Blog models

use serde::{Deserialize, Deserializer, Serialize};

/// Output of rendering one markdown document, before it is tied to a filename
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Rendered HTML body (front matter excluded)
    pub content: String,

    /// Title from front matter, empty if absent
    pub title: String,

    /// Date from front matter, kept verbatim
    pub date: String,

    /// URL-safe slug of the title, empty if the title is empty
    pub anchor: String,
}

/// A rendered blog post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Source filename, unique within one fetch
    pub filename: String,

    /// Rendered HTML content
    pub content: String,

    /// Publication date as written in the front matter
    pub date: String,

    /// Post title
    pub title: String,

    /// Anchor (slug) derived from the title
    pub anchor: String,
}

impl Post {
    /// Attach a filename to a rendered document
    pub fn new(filename: impl Into<String>, rendered: Rendered) -> Self {
        Self {
            filename: filename.into(),
            content: rendered.content,
            date: rendered.date,
            title: rendered.title,
            anchor: rendered.anchor,
        }
    }
}

/// Treat an explicit `null` the same as a missing field
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Post>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Post>>::deserialize(deserializer)?.unwrap_or_default())
}

/// An ordered collection of posts, newest first
///
/// `posts` is a plain `Vec`, so it always serializes as an array and an
/// empty blog is `{"posts":[]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blog {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub posts: Vec<Post>,
}

impl Blog {
    /// Create an empty blog
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
