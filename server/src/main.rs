use anyhow::Result;
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use server::{build_app, ServerConfig};
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Base URL of the listings API
    #[arg(long, env = "API_BASE_URL", default_value = "http://localhost:5000")]
    api_base: String,
    /// Public origin used for share links
    #[arg(long, env = "SITE_URL", default_value = "http://localhost:8080")]
    site_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let api_timeout = std::env::var("API_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(12));
    let config = ServerConfig { api_base: args.api_base, api_timeout, site_url: args.site_url };
    let app: Router = build_app(config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
