use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, serve, Router};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clause_hub::api;
use clause_hub_core::cache::RenderCache;
use clause_hub_core::events::EventBus;
use clause_hub_core::render::ParagraphFilter;
use clause_hub_core::storage::ClauseStore;

#[derive(Parser)]
#[command(name = "clause-hub")]
#[command(about = "Hierarchical bylaw clause management server")]
struct Cli {
    /// Directory holding clause records and settings
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Listen address
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// Rendered pages kept in memory
    #[arg(long, default_value_t = 64)]
    cache_capacity: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = Arc::new(RwLock::new(ClauseStore::new(&cli.data_dir)?));
    let cache = Arc::new(RenderCache::new(cli.cache_capacity));
    let events = EventBus::new();

    // audit trail: every mutation lands in the log
    let mut audit = events.subscribe();
    tokio::spawn(async move {
        loop {
            match audit.recv().await {
                Ok(event) => info!(?event, "clause event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "audit log fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let router = api::router(store, cache, events, Arc::new(ParagraphFilter));
    let app = Router::new()
        .merge(router)
        .route("/health", get(|| async { "OK" }))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        );

    let listener = TcpListener::bind(cli.addr).await?;
    info!(addr = %cli.addr, "listening");
    serve(listener, app.into_make_service()).await?;
    Ok(())
}
