// Interface adapters: wire protocol, network handling, and console input.

pub mod console;
pub mod net;
pub mod protocol;
pub mod state;
