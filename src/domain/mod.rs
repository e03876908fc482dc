// Domain layer: ticket state and mutation rules.

pub mod store;

pub use store::{AbandonOutcome, Ticket, TicketId, TicketStore};
