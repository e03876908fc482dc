// Shared bootstrap for integration tests: each test gets its own server on
// an ephemeral port plus a handle into the engine's operation queue.

use std::sync::Arc;
use ticket_server::interface_adapters::state::AppState;
use ticket_server::use_cases::EngineOp;
use tokio::sync::mpsc;

/// Starts a fresh server and returns its WebSocket URL together with the
/// engine's operation sender (the same handle the console adapter uses).
///
/// Every test spawns its own server: ticket state is a process-wide
/// singleton per engine, so sharing one across tests would make them
/// order-dependent.
pub async fn start_server() -> (String, mpsc::Sender<EngineOp>) {
    // Ephemeral port avoids collisions with local services and other tests.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");

    let state: Arc<AppState> = ticket_server::build_state();
    let ops_tx = state.ops_tx.clone();

    // The listener is already bound, so clients can connect immediately;
    // their handshakes complete once the server task starts accepting.
    tokio::spawn(async move {
        let _ = ticket_server::run(listener, state).await;
    });

    (format!("ws://{addr}/ws"), ops_tx)
}
