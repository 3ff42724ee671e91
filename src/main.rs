//! CLI entry point for blog-api

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "blog-api")]
#[command(author = "Yukang Chen")]
#[command(version)]
#[command(about = "Serves markdown blog posts as rendered JSON", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    #[command(alias = "s")]
    Server {
        /// Port to listen on (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to (defaults to server.ip)
        #[arg(short, long)]
        ip: Option<String>,
    },

    /// Fetch all posts once and print them as JSON
    Fetch {
        /// Pretty-print the JSON
        #[arg(short, long)]
        pretty: bool,
    },

    /// List posts
    List,

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "blog_api=debug,info"
    } else {
        "blog_api=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Server { port, ip } => {
            let api = blog_api::BlogApi::new(&base_dir)?;
            let ip = ip.unwrap_or_else(|| api.config.server.ip.clone());
            let port = port.unwrap_or(api.config.server.port);

            tracing::info!(
                "Serving posts from the {} source at http://{}:{}",
                api.config.source,
                ip,
                port
            );
            blog_api::server::start(api, &ip, port).await?;
        }

        Commands::Fetch { pretty } => {
            let api = blog_api::BlogApi::new(&base_dir)?;
            blog_api::commands::fetch::run(&api, pretty).await?;
        }

        Commands::List => {
            let api = blog_api::BlogApi::new(&base_dir)?;
            blog_api::commands::list::run(&api).await?;
        }

        Commands::Version => {
            println!("blog-api version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
