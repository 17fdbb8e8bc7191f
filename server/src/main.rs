use anyhow::Result;
use axum::Router;
use clap::Parser;
use lyricsir_core::config::DEFAULT_LATENT_DIMENSIONS;
use lyricsir_core::EngineConfig;
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Corpus root: one directory per artist holding <title>.txt files
    #[arg(long, env = "LYRICSIR_CORPUS", default_value = "./Lyrics")]
    corpus: PathBuf,
    /// Latent dimensions
    #[arg(long, env = "LYRICSIR_DIMENSIONS", default_value_t = DEFAULT_LATENT_DIMENSIONS)]
    dimensions: usize,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = EngineConfig { latent_dimensions: args.dimensions, ..EngineConfig::default() };
    let app: Router = build_app(&args.corpus, config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
