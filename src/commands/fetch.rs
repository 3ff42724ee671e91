//! Fetch every post once and print the collection as JSON

use anyhow::Result;
use std::io::Write;

use crate::content::Blog;
use crate::fetcher::FetchContext;
use crate::BlogApi;

/// Run a fetch and write the JSON collection to stdout
pub async fn run(api: &BlogApi, pretty: bool) -> Result<()> {
    let blog = api.get_all_posts(&FetchContext::background()).await?;
    tracing::info!("Fetched {} posts", blog.len());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_json(&mut out, &blog, pretty)?;
    Ok(())
}

/// Serialize the collection, followed by a newline
pub fn write_json<W: Write>(out: &mut W, blog: &Blog, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, blog)?;
    } else {
        serde_json::to_writer(&mut *out, blog)?;
    }
    writeln!(out)?;
    Ok(())
}
