//! Solace realtime server.
//!
//! Hosts the companion gateway over a single WebSocket endpoint:
//!
//! - `GET /ws` — WebSocket upgrade; the first event should be a `join`
//!   (elder) or `family_join` (observer)
//! - `GET /health` — server status
//!
//! Run: `cargo run --bin solace-server -- --config solace.json5`

mod connection;

use anyhow::Context;
use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use chrono::{Duration, Utc};
use clap::Parser;
use connection::handle_socket;
use log::info;
use solace_core::{
    DEMO_ELDER_ID, Gateway, HttpCompletionBackend, InMemoryProfileStore, StaticRoutineProvider,
    demo_profile,
};
use solace_protocol::{Routine, RoutineKind};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the Solace server.
#[derive(Parser)]
#[command(name = "solace-server", version)]
struct Cli {
    /// Optional path to a solace.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,
    /// Override the completion model name
    #[arg(long)]
    model: Option<String>,
}

/// Entry point for the Solace realtime server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    let mut config = solace_config::load_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(model) = cli.model {
        config.completion.model = model;
    }

    let backend = HttpCompletionBackend::from_config(&config.completion)
        .map(|backend| Arc::new(backend) as Arc<dyn solace_core::CompletionBackend>);
    if backend.is_none() {
        info!("no completion api_base configured, running with local fallbacks only");
    }

    let profiles = Arc::new(InMemoryProfileStore::new());
    profiles.insert(demo_profile(DEMO_ELDER_ID));
    let routines = Arc::new(StaticRoutineProvider::new(demo_routines()));

    let bind = config.server.bind.clone();
    let gateway = Gateway::new(config, backend, routines, profiles);

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(gateway);

    info!("solace server listening on {bind}");
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn ws_handler(
    State(gateway): State<Arc<Gateway>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, gateway))
}

async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

/// Demo routines so a stand-alone server has something to remind about.
fn demo_routines() -> Vec<Routine> {
    vec![
        Routine {
            id: "demo-meds-am".to_string(),
            elder_id: DEMO_ELDER_ID.to_string(),
            name: "morning medication".to_string(),
            kind: RoutineKind::Medication,
            scheduled_at: Utc::now() + Duration::minutes(15),
            active: true,
        },
        Routine {
            id: "demo-lunch".to_string(),
            elder_id: DEMO_ELDER_ID.to_string(),
            name: "lunch".to_string(),
            kind: RoutineKind::Meal,
            scheduled_at: Utc::now() + Duration::hours(3),
            active: true,
        },
    ]
}
