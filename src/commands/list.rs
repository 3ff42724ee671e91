//! List posts

use anyhow::Result;
use std::io::Write;

use crate::content::Blog;
use crate::fetcher::FetchContext;
use crate::BlogApi;

/// Fetch every post and print one line per post
pub async fn run(api: &BlogApi) -> Result<()> {
    let blog = api.get_all_posts(&FetchContext::background()).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_listing(&mut out, &blog)?;
    Ok(())
}

pub fn write_listing<W: Write>(out: &mut W, blog: &Blog) -> Result<()> {
    writeln!(out, "Posts ({}):", blog.len())?;
    for post in &blog.posts {
        let title = if post.title.is_empty() {
            "(untitled)"
        } else {
            post.title.as_str()
        };
        if post.date.is_empty() {
            writeln!(out, "  {} - {}", post.filename, title)?;
        } else {
            writeln!(out, "  {} - {} [{}]", post.filename, title, post.date)?;
        }
    }
    Ok(())
}
