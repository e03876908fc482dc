// Use cases layer: the single-writer ticket engine and its operation
// vocabulary.

pub mod engine;
pub mod registry;
pub mod types;

pub use engine::engine_task;
pub use registry::{ConnectionId, ConnectionRegistry, ConnectionSender};
pub use types::{Command, EngineOp, SnapshotEncoder, TicketUpdate};
