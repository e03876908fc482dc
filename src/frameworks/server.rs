// Framework bootstrap for the ticket server runtime.

use crate::frameworks::config;
use crate::interface_adapters::console::console_task;
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::protocol::encode_ticket_list;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{EngineOp, engine_task};

use axum::{Router, routing::get};
use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Builds the shared state and spawns the engine and console tasks.
///
/// Public so integration tests can reach `ops_tx` and drive the engine the
/// same way the console adapter does.
pub fn build_state() -> Arc<AppState> {
    // One queue, one consumer: every command and registry event goes
    // through here, which is what serializes all mutations.
    let (ops_tx, ops_rx) = mpsc::channel::<EngineOp>(config::OPS_CHANNEL_CAPACITY);

    // Spawn the engine. It owns the ticket store and the connection
    // registry until the process exits.
    tokio::spawn(engine_task(ops_rx, encode_ticket_list));

    // Console input ("n" creates a ticket) runs as its own task and only
    // talks to the engine through the queue.
    tokio::spawn(console_task(ops_tx.clone()));

    Arc::new(AppState { ops_tx })
}

pub async fn run(listener: tokio::net::TcpListener, state: Arc<AppState>) -> Result<()> {
    let address = listener.local_addr()?;

    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener, build_state()).await
}
