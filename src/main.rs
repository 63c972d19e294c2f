use std::sync::Arc;

use anyhow::{Context, Result};
use capture_bridge::{create_router, AppState, CaptureBridge, Config, SyntheticPlatform};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "capture-bridge", about = "Camera/microphone recording bridge with an HTTP control API")]
struct Args {
    /// Config file path (extension optional)
    #[arg(long, default_value = "config/capture-bridge")]
    config: String,

    /// Override the HTTP port from the config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("capture_bridge=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let mut cfg = Config::load_or_default(&args.config)?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Preview surfaces: {:?}", cfg.capture.preview_surfaces);

    let platform = Arc::new(SyntheticPlatform::new(cfg.capture.clone()));
    let bridge = Arc::new(CaptureBridge::new(platform, &cfg));
    let app = create_router(AppState::new(Arc::clone(&bridge)));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    // shutting the bridge down first ends open event streams
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
            bridge.shutdown().await;
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
