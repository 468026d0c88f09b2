//! rostra-ir (Ingest & Review) - Provider-enrollment discrepancy service
//!
//! Accepts analyst-reported discrepancies one at a time or as CSV-driven
//! bulk tagging batches, runs everything through the shared approval state
//! machine, and keeps the append-only review audit log.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use rostra_common::events::EventBus;
use rostra_ir::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "rostra-ir", about = "Rostra ingest & review service")]
struct Args {
    /// Data directory holding rostra.db (falls back to ROSTRA_ROOT, the
    /// config file, then the platform default)
    #[arg(long)]
    root_folder: Option<String>,

    /// Port to listen on
    #[arg(long, env = "ROSTRA_PORT", default_value_t = 5731)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Rostra Ingest & Review (rostra-ir) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder =
        rostra_common::config::resolve_root_folder(args.root_folder.as_deref(), "ROSTRA_ROOT");
    let db_path = rostra_common::config::ensure_root_folder(&root_folder)?;
    info!("Database path: {}", db_path.display());

    let pool = rostra_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    // Event bus for SSE broadcasting
    let event_bus = EventBus::new(100);

    let state = AppState::new(pool, event_bus);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("rostra-ir listening on http://127.0.0.1:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
