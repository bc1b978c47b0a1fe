//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

/// Queues `cmd` for the backend worker. Returns a notice for the user when
/// the queue cannot take it.
pub fn dispatch_backend_command(cmd_tx: &Sender<BackendCommand>, cmd: BackendCommand) -> Option<String> {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            None
        }
        Err(TrySendError::Full(_)) => Some("UI command queue is full; please retry".to_string()),
        Err(TrySendError::Disconnected(_)) => Some(
            "Backend worker stopped (possible startup failure); restart the app".to_string(),
        ),
    }
}
