// Console adapter: lets the operator create tickets from stdin.

use crate::use_cases::{Command, EngineOp};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Reads stdin lines and enqueues a `CreateTicket` for each `n`.
///
/// Clients mutate tickets over the wire but never create them; this is the
/// only create path. The task never touches state directly, it only sends
/// operations into the engine's queue. Exits on stdin EOF or when the
/// engine is gone.
pub async fn console_task(ops_tx: mpsc::Sender<EngineOp>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match line.trim() {
                "n" => {
                    if ops_tx
                        .send(EngineOp::Command(Command::CreateTicket))
                        .await
                        .is_err()
                    {
                        warn!("ops channel closed; console exiting");
                        break;
                    }
                }
                "" => {}
                other => debug!(input = other, "unrecognized console input"),
            },
            Ok(None) => {
                info!("stdin closed; console exiting");
                break;
            }
            Err(e) => {
                warn!(error = %e, "failed to read console input");
                break;
            }
        }
    }
}
