use crate::use_cases::EngineOp;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct AppState {
    // Operations flowing from the adapters into the engine task. This is
    // the only path to the ticket store and the connection registry.
    pub ops_tx: mpsc::Sender<EngineOp>,
}
