// Wire protocol DTOs and conversions for the ticket service.

use crate::domain::{Ticket, TicketId};
use crate::use_cases::{Command, TicketUpdate};
use axum::extract::ws::Utf8Bytes;
use serde::{Deserialize, Serialize};

/// Messages clients send to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ClientMessage {
    // Handshake no-op; accepted and ignored.
    Init,
    // Hand the ticket to this client (last writer wins).
    AssignTicket {
        ticket_id: TicketId,
        client_id: String,
    },
    // Release the ticket, honored only when this client holds it.
    AbandonTicket {
        ticket_id: TicketId,
        client_id: String,
    },
    // Remove the ticket entirely.
    DeleteTicket {
        ticket_id: TicketId,
    },
}

impl ClientMessage {
    /// Translates a wire message into an engine command. `Init` carries no
    /// command and maps to `None`.
    pub fn into_command(self) -> Option<Command> {
        match self {
            ClientMessage::Init => None,
            ClientMessage::AssignTicket {
                ticket_id,
                client_id,
            } => Some(Command::AssignTicket {
                ticket_id,
                client_id,
            }),
            ClientMessage::AbandonTicket {
                ticket_id,
                client_id,
            } => Some(Command::AbandonTicket {
                ticket_id,
                client_id,
            }),
            ClientMessage::DeleteTicket { ticket_id } => {
                Some(Command::DeleteTicket { ticket_id })
            }
        }
    }
}

/// Messages the server sends to clients; always a full snapshot, never a
/// diff, for both broadcasts and register-time catch-up.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ServerMessage {
    TicketList { tickets: Vec<TicketDto> },
}

/// Flattened ticket state for wire transmission.
#[derive(Debug, Clone, Serialize)]
pub struct TicketDto {
    pub id: TicketId,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub assigned_to: String,
}

impl From<&Ticket> for TicketDto {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id,
            assigned_to: ticket.assigned_to.clone(),
        }
    }
}

/// Serializes a snapshot into the shared bytes the registry fans out.
/// This is the `SnapshotEncoder` the engine is wired with.
pub fn encode_ticket_list(update: &TicketUpdate) -> Result<Utf8Bytes, serde_json::Error> {
    let msg = ServerMessage::TicketList {
        tickets: update.tickets.iter().map(TicketDto::from).collect(),
    };
    serde_json::to_string(&msg).map(Utf8Bytes::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn parses_assign_ticket() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"message_type": "assign_ticket", "ticket_id": 3, "client_id": "alice"}"#,
        )
        .expect("valid assign message");

        match msg.into_command() {
            Some(Command::AssignTicket {
                ticket_id,
                client_id,
            }) => {
                assert_eq!(ticket_id, 3);
                assert_eq!(client_id, "alice");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_delete_ticket_without_client_id() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"message_type": "delete_ticket", "ticket_id": 7}"#)
                .expect("valid delete message");

        assert!(matches!(
            msg.into_command(),
            Some(Command::DeleteTicket { ticket_id: 7 })
        ));
    }

    #[test]
    fn init_is_accepted_and_carries_no_command() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"message_type": "init", "client_id": "alice"}"#)
                .expect("init should parse even with extra fields");

        assert!(msg.into_command().is_none());
    }

    #[test]
    fn rejects_unknown_message_type() {
        let result = serde_json::from_str::<ClientMessage>(
            r#"{"message_type": "explode_ticket", "ticket_id": 1}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_assign_without_client_id() {
        let result = serde_json::from_str::<ClientMessage>(
            r#"{"message_type": "assign_ticket", "ticket_id": 1}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn ticket_list_omits_empty_assignee() {
        let update = TicketUpdate {
            tickets: vec![
                Ticket {
                    id: 1,
                    assigned_to: String::new(),
                },
                Ticket {
                    id: 2,
                    assigned_to: "alice".to_string(),
                },
            ],
        };

        let bytes = encode_ticket_list(&update).expect("snapshot should serialize");
        let value: Value = serde_json::from_str(bytes.as_str()).expect("valid JSON");

        assert_eq!(
            value,
            json!({
                "message_type": "ticket_list",
                "tickets": [{"id": 1}, {"id": 2, "assigned_to": "alice"}]
            })
        );
    }

    #[test]
    fn empty_snapshot_keeps_tickets_field() {
        let bytes = encode_ticket_list(&TicketUpdate { tickets: vec![] })
            .expect("snapshot should serialize");
        assert_eq!(
            bytes.as_str(),
            r#"{"message_type":"ticket_list","tickets":[]}"#
        );
    }
}
