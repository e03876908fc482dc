use std::env;

// Runtime/server constants.

pub fn http_port() -> u16 {
    env::var("TICKET_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
}

// Capacity of the engine's single operation queue. Senders await when it is
// full, so operations are delayed under load rather than dropped.
pub const OPS_CHANNEL_CAPACITY: usize = 1024;
