// The single-writer engine: owns the ticket store and the connection
// registry, applies one operation at a time, and fans out full snapshots.

use crate::domain::{AbandonOutcome, TicketStore};
use crate::use_cases::registry::ConnectionRegistry;
use crate::use_cases::types::{Command, EngineOp, SnapshotEncoder, TicketUpdate};
use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Runs the engine until the ops channel closes.
///
/// Every mutation and registry event arrives through `ops_rx` and is applied
/// fully before the next one is pulled. Nothing else may touch the store or
/// the registry; that single-writer discipline is what makes updates
/// linearizable without locks.
pub async fn engine_task(mut ops_rx: mpsc::Receiver<EngineOp>, encode: SnapshotEncoder) {
    let mut store = TicketStore::new();
    let mut registry = ConnectionRegistry::new();

    while let Some(op) = ops_rx.recv().await {
        apply_op(op, &mut store, &mut registry, encode);
    }

    info!("ops channel closed; engine exiting");
}

/// Applies one operation to completion, broadcasting when state changed.
///
/// Synchronous on purpose: the engine never suspends mid-operation, and
/// tests can drive it directly without spawning the task.
pub fn apply_op(
    op: EngineOp,
    store: &mut TicketStore,
    registry: &mut ConnectionRegistry,
    encode: SnapshotEncoder,
) {
    match op {
        EngineOp::Command(command) => {
            if apply_command(command, store) {
                broadcast_snapshot(store, registry, encode);
            }
        }
        EngineOp::Register { conn_id, handle } => {
            registry.add(conn_id, handle);
            info!(conn_id, connections = registry.len(), "connection registered");

            // Catch-up unicast: only the new connection sees this, so it
            // reflects state at the moment of registration.
            if let Some(bytes) = encode_snapshot(store, encode) {
                if !registry.send_to(conn_id, bytes) {
                    warn!(conn_id, "catch-up snapshot was not accepted");
                }
            }
        }
        EngineOp::Unregister { conn_id } => {
            registry.remove(conn_id);
            info!(conn_id, connections = registry.len(), "connection unregistered");
        }
    }
}

/// Applies a command to the store. Returns true when state changed and a
/// broadcast is due. Commands addressing unknown tickets are silent no-ops,
/// never failures, so retries stay harmless.
fn apply_command(command: Command, store: &mut TicketStore) -> bool {
    match command {
        Command::CreateTicket => {
            let ticket_id = store.create();
            info!(ticket_id, "ticket created");
            true
        }
        Command::AssignTicket {
            ticket_id,
            client_id,
        } => {
            // Last writer wins: no check that the ticket was unassigned.
            if store.assign(ticket_id, &client_id) {
                info!(ticket_id, %client_id, "ticket assigned");
                true
            } else {
                debug!(ticket_id, "assign for unknown ticket; ignoring");
                false
            }
        }
        Command::AbandonTicket {
            ticket_id,
            client_id,
        } => match store.abandon(ticket_id, &client_id) {
            AbandonOutcome::Released => {
                info!(ticket_id, %client_id, "ticket released");
                true
            }
            AbandonOutcome::WrongOwner => {
                warn!(ticket_id, %client_id, "abandon from non-owner; ignoring");
                false
            }
            AbandonOutcome::NotFound => {
                debug!(ticket_id, "abandon for unknown ticket; ignoring");
                false
            }
        },
        Command::DeleteTicket { ticket_id } => {
            if store.delete(ticket_id) {
                info!(ticket_id, "ticket deleted");
                true
            } else {
                debug!(ticket_id, "delete for unknown ticket; ignoring");
                false
            }
        }
    }
}

fn encode_snapshot(store: &TicketStore, encode: SnapshotEncoder) -> Option<Utf8Bytes> {
    let update = TicketUpdate {
        tickets: store.snapshot(),
    };
    match encode(&update) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            // The mutation stands; only this delivery is lost.
            error!(error = %e, "failed to serialize ticket snapshot");
            None
        }
    }
}

/// Serializes the snapshot once and fans the shared bytes out to every
/// registered connection.
fn broadcast_snapshot(store: &TicketStore, registry: &ConnectionRegistry, encode: SnapshotEncoder) {
    if let Some(bytes) = encode_snapshot(store, encode) {
        let delivered = registry.broadcast(&bytes);
        debug!(delivered, connections = registry.len(), "snapshot broadcast");
    }
}
