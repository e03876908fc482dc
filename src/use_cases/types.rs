// Use-case level inputs/outputs for the ticket engine.

use crate::domain::{Ticket, TicketId};
use crate::use_cases::registry::{ConnectionId, ConnectionSender};
use axum::extract::ws::Utf8Bytes;

/// A mutation request consumed by the engine. Commands are immutable once
/// constructed and carry no implicit context; they are the only way state
/// may change.
#[derive(Debug, Clone)]
pub enum Command {
    CreateTicket,
    AssignTicket {
        ticket_id: TicketId,
        client_id: String,
    },
    AbandonTicket {
        ticket_id: TicketId,
        client_id: String,
    },
    DeleteTicket {
        ticket_id: TicketId,
    },
}

/// Everything that flows through the engine's single queue.
///
/// Commands and registry events interleave in arrival order, so the engine
/// never observes state mid-mutation from a registry event or vice versa.
#[derive(Debug)]
pub enum EngineOp {
    Command(Command),
    Register {
        conn_id: ConnectionId,
        handle: ConnectionSender,
    },
    Unregister {
        conn_id: ConnectionId,
    },
}

/// Full snapshot of the ticket sequence, sent wholesale rather than as a
/// diff after every mutation.
#[derive(Debug, Clone)]
pub struct TicketUpdate {
    pub tickets: Vec<Ticket>,
}

/// Serializes a snapshot to the wire bytes the registry fans out. Supplied
/// by the adapter layer so the engine stays independent of the wire format.
pub type SnapshotEncoder = fn(&TicketUpdate) -> Result<Utf8Bytes, serde_json::Error>;
