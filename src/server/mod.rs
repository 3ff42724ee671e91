//! HTTP server exposing the post collection

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::fetcher::FetchContext;
use crate::BlogApi;

/// Build the router: `GET /posts`, everything else 404
pub fn router(api: Arc<BlogApi>) -> Router {
    Router::new()
        .route("/posts", get(posts_handler))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(api)
}

/// Start the server and run until Ctrl-C
pub async fn start(api: BlogApi, ip: &str, port: u16) -> Result<()> {
    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let listener = TcpListener::bind(addr).await?;
    println!("Server running at http://{}:{}/posts", ip, port);
    println!("Press Ctrl+C to stop.");

    serve(listener, Arc::new(api), shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, api: Arc<BlogApi>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(address = ?listener.local_addr()?, "Starting server");
    axum::serve(listener, router(api))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn posts_handler(State(api): State<Arc<BlogApi>>) -> Response {
    // A dropped connection drops this future, which aborts the fetch
    match api.get_all_posts(&FetchContext::background()).await {
        Ok(blog) => {
            tracing::debug!(posts = blog.len(), "Served posts");
            Json(blog).into_response()
        }
        Err(e) => {
            let kind = e.kind();
            let filename = e.filename().unwrap_or("-").to_string();
            tracing::error!(
                kind = ?kind,
                filename = %filename,
                "Failed to fetch posts: {:#}",
                anyhow::Error::from(e)
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Wait for shutdown signal (Ctrl-C)
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlogConfig;
    use crate::content::Blog;
    use crate::source::MemorySource;
    use std::path::PathBuf;
    use tokio::sync::oneshot;

    async fn spawn(source: MemorySource) -> (String, oneshot::Sender<()>) {
        let api = BlogApi::with_source(BlogConfig::default(), PathBuf::from("."), Arc::new(source));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, Arc::new(api), async move {
            let _ = rx.await;
        }));
        (url, tx)
    }

    #[tokio::test]
    async fn test_get_posts() {
        let source = MemorySource::new()
            .with_file("a.md", "---\ntitle: Alpha\ndate: 01.01.2024\n---\nFirst")
            .with_file("b.md", "Second");
        let (url, _stop) = spawn(source).await;

        let response = reqwest::get(format!("{}/posts", url)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json")));

        let blog: Blog = response.json().await.unwrap();
        assert_eq!(blog.posts.len(), 2);
        assert_eq!(blog.posts[0].filename, "b.md");
        assert_eq!(blog.posts[1].title, "Alpha");
        assert_eq!(blog.posts[1].anchor, "alpha");
        assert_eq!(blog.posts[1].date, "01.01.2024");
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let (url, _stop) = spawn(MemorySource::new()).await;

        let body = reqwest::get(format!("{}/posts", url))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, r#"{"posts":[]}"#);
    }

    #[tokio::test]
    async fn test_failure_hides_details() {
        let source = MemorySource::new()
            .with_file("a.md", "A")
            .with_failing_read("secret-draft.md");
        let (url, _stop) = spawn(source).await;

        let response = reqwest::get(format!("{}/posts", url)).await.unwrap();
        assert_eq!(response.status(), 500);
        let body = response.text().await.unwrap();
        assert_eq!(body, "Internal Server Error");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (url, _stop) = spawn(MemorySource::new()).await;

        let response = reqwest::get(format!("{}/nope", url)).await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_graceful_shutdown() {
        let api = BlogApi::with_source(
            BlogConfig::default(),
            PathBuf::from("."),
            Arc::new(MemorySource::new()),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, Arc::new(api), async move {
            let _ = rx.await;
        }));

        tx.send(()).unwrap();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
