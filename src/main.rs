use clap::Parser;
use repeticio::api;
use repeticio::clock::SystemClock;
use repeticio::config::AppConfig;
use repeticio::context::AppContext;
use repeticio::coordinator::ReplicaId;
use repeticio::generator::{ContentGenerator, DisabledContentGenerator, HttpContentGenerator};
use repeticio::storage::Store;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "repeticio-node", about = "Vocabulary trainer replica")]
struct Args {
    /// TOML configuration file (falls back to $REPETICIO_CONFIG, then defaults).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `server.bind`.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Stable id for this replica; a random one is used when absent.
    #[arg(long)]
    replica_id: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    // 1. Configuration:
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    let bind_addr = config.server.bind;

    let replica_id = args
        .replica_id
        .as_deref()
        .map(ReplicaId::from)
        .unwrap_or_default();
    tracing::info!("Starting replica {} on {}", replica_id, bind_addr);

    // 2. Content generator:
    let generator: Arc<dyn ContentGenerator> = match &config.generator.base_url {
        Some(base_url) => {
            tracing::info!("Using content generator at {}", base_url);
            Arc::new(HttpContentGenerator::new(base_url, &config.generator))
        }
        None => {
            tracing::warn!("No generator.base_url configured, new content is disabled");
            Arc::new(DisabledContentGenerator)
        }
    };

    // 3. Services and background loops:
    let ctx = AppContext::new(
        config,
        Store::new(),
        generator,
        Arc::new(SystemClock),
        replica_id,
    );
    let handles = ctx.start();

    // 4. HTTP server:
    let app = api::router(ctx.clone());
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("HTTP server listening on {}", bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 5. Stop workers and hand over leadership:
    ctx.shutdown(handles).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
