// WebSocket adapter: terminates the wire protocol and translates between
// wire messages and the engine's operation vocabulary.

use crate::interface_adapters::protocol::ClientMessage;
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ConnectionId, EngineOp};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::SinkExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    OpsClosed,
    OutboundClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Returns a process-unique identifier for a new connection.
fn next_conn_id() -> ConnectionId {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let conn_id = next_conn_id();
    let span = info_span!("conn", conn_id);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&state, conn_id).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = ?e, "failed to register connection");
            let _ = socket.close().await;
            return;
        }
    };

    info!("client connected");

    // Main client loop.
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

struct ConnCtx {
    pub conn_id: ConnectionId,
    pub ops_tx: mpsc::Sender<EngineOp>,
    pub outbound_rx: mpsc::UnboundedReceiver<Utf8Bytes>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub invalid_json: u32,

    pub last_invalid_msg_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(state: &AppState, conn_id: ConnectionId) -> Result<ConnCtx, NetError> {
    // The engine owns the registry; hand it our outbound queue and let it
    // unicast the catch-up snapshot before any broadcast reaches us.
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Utf8Bytes>();

    state
        .ops_tx
        .send(EngineOp::Register {
            conn_id,
            handle: outbound_tx,
        })
        .await
        .map_err(|_| NetError::OpsClosed)?;

    Ok(ConnCtx {
        conn_id,
        ops_tx: state.ops_tx.clone(),
        outbound_rx,
        msgs_in: 0,
        msgs_out: 0,
        invalid_json: 0,
        last_invalid_msg_log: Instant::now() - LOG_THROTTLE,
        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let conn_id = ctx.conn_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        ops_tx,
        outbound_rx,
        msgs_in,
        msgs_out,
        invalid_json,
        last_invalid_msg_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming message from the client.
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    conn_id,
                    ops_tx,
                    msgs_in,
                    invalid_json,
                    last_invalid_msg_log,
                    close_frame,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing snapshot from the engine's fan-out.
            outgoing = outbound_rx.recv() => {
                match outgoing {
                    Some(bytes) => match forward_snapshot(bytes, socket, msgs_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    None => {
                        // The engine dropped our handle; nothing more will
                        // ever be delivered on this queue.
                        fatal = Some(NetError::OutboundClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(conn_id, ops_tx, *msgs_in, *msgs_out, *invalid_json).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal { Err(err) } else { Ok(()) }
}

async fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    conn_id: ConnectionId,
    ops_tx: &mpsc::Sender<EngineOp>,
    msgs_in: &mut u64,
    invalid_json: &mut u32,
    last_invalid_msg_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(msg) => {
                        let Some(command) = msg.into_command() else {
                            // `init` is a handshake no-op.
                            debug!(conn_id, "init message acknowledged");
                            return Ok(LoopControl::Continue);
                        };

                        // Awaited send keeps FIFO order per connection and
                        // guarantees accepted commands reach the engine.
                        ops_tx
                            .send(EngineOp::Command(command))
                            .await
                            .map_err(|_| NetError::OpsClosed)?;
                        Ok(LoopControl::Continue)
                    }
                    Err(parse_err) => {
                        // Malformed payloads and unknown message_type values
                        // are dropped here; they never reach the engine and
                        // get no error response.
                        *invalid_json += 1;
                        if should_log(last_invalid_msg_log) {
                            warn!(
                                conn_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message; dropping"
                            );
                        }
                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                warn!(conn_id, "binary messages not supported; disconnecting");
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(conn_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(conn_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_snapshot(
    bytes: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
) -> LoopControl {
    match socket.send(Message::Text(bytes)).await.map_err(NetError::Ws) {
        Ok(()) => {
            *msgs_out += 1;
            LoopControl::Continue
        }
        Err(err) => {
            // The mutation already happened; only this client misses out.
            warn!(error = ?err, "failed to send snapshot");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(
    conn_id: ConnectionId,
    ops_tx: &mpsc::Sender<EngineOp>,
    msgs_in: u64,
    msgs_out: u64,
    invalid_json: u32,
) -> Result<(), NetError> {
    ops_tx
        .send(EngineOp::Unregister { conn_id })
        .await
        .map_err(|_| NetError::OpsClosed)?;

    debug!(conn_id, msgs_in, msgs_out, invalid_json, "connection stats");
    info!(conn_id, "client disconnected");
    Ok(())
}
