//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread};

use client_core::{ClientSettings, LocalFile, Workflow};
use crossbeam_channel::{Receiver, Sender};

use crate::backend_bridge::{commands::BackendCommand, preview::decode_preview};
use crate::controller::events::UiEvent;

pub fn launch(settings: ClientSettings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::StartupFailed(format!(
                    "backend worker startup failure: failed to build runtime: {err}"
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };
        runtime.block_on(run_backend(settings, cmd_rx, ui_tx));
    });
}

async fn run_backend(
    settings: ClientSettings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    let workflow = match Workflow::connect(&settings) {
        Ok(workflow) => Arc::new(workflow),
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "backend worker startup failure");
            let _ = ui_tx.try_send(UiEvent::StartupFailed(format!("{err:#}")));
            return;
        }
    };
    let _ = ui_tx.try_send(UiEvent::Ready {
        server_url: settings.server_url.clone(),
    });
    let _ = ui_tx.try_send(UiEvent::Snapshot(workflow.snapshot()));

    let forward = tokio::spawn(forward_viewer_updates(
        Arc::clone(&workflow),
        ui_tx.clone(),
    ));

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            BackendCommand::SelectFile { path } => match LocalFile::from_path(&path) {
                Ok(file) => {
                    let name = file.name.clone();
                    let uri = workflow.select_file(file);
                    let preview = workflow
                        .selected_file()
                        .and_then(|file| decode_preview(&uri, &file.bytes));
                    let _ = ui_tx.try_send(UiEvent::FileSelected { name, preview });
                    let _ = ui_tx.try_send(UiEvent::Snapshot(workflow.snapshot()));
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "file selection failed");
                    let _ = ui_tx.try_send(UiEvent::FileRejected(format!("{err:#}")));
                }
            },
            BackendCommand::Upload => {
                let workflow = Arc::clone(&workflow);
                let ui_tx = ui_tx.clone();
                tokio::spawn(async move {
                    let result = workflow.upload().await;
                    let _ = ui_tx.try_send(UiEvent::UploadFinished(result.err()));
                    let _ = ui_tx.try_send(UiEvent::Snapshot(workflow.snapshot()));
                });
            }
        }
    }

    tracing::info!("ui command queue closed; backend worker stopping");
    forward.abort();
}

/// Pushes a fresh snapshot whenever the prediction viewer's state changes.
async fn forward_viewer_updates(workflow: Arc<Workflow>, ui_tx: Sender<UiEvent>) {
    let mut updates = workflow.subscribe_viewer();
    while updates.changed().await.is_ok() {
        let _ = ui_tx.try_send(UiEvent::Snapshot(workflow.snapshot()));
    }
}
