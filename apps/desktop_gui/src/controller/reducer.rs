//! Folds backend events into the state the window renders.

use client_core::{WorkflowSnapshot, PREDICTION_PREFIX};

use crate::controller::events::{describe_upload_error, PreviewImage, UiEvent};

#[derive(Debug, Default)]
pub struct ViewModel {
    pub server_url: Option<String>,
    pub startup_error: Option<String>,
    pub snapshot: Option<WorkflowSnapshot>,
    pub selected_name: Option<String>,
    pub preview: Option<PreviewImage>,
    pub notice: Option<String>,
    /// Set when the upload button is clicked, cleared when the backend
    /// reports the upload finished.
    pub upload_requested: bool,
}

impl ViewModel {
    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Ready { server_url } => {
                self.server_url = Some(server_url);
                self.startup_error = None;
            }
            UiEvent::StartupFailed(message) => {
                self.startup_error = Some(message);
            }
            UiEvent::FileSelected { name, preview } => {
                self.selected_name = Some(name);
                self.preview = preview;
                self.notice = None;
            }
            UiEvent::FileRejected(message) => {
                self.notice = Some(message);
            }
            UiEvent::UploadFinished(error) => {
                self.upload_requested = false;
                self.notice = error.as_ref().map(describe_upload_error);
            }
            UiEvent::Snapshot(snapshot) => {
                self.snapshot = Some(snapshot);
            }
        }
    }

    pub fn backend_ready(&self) -> bool {
        self.server_url.is_some() && self.startup_error.is_none()
    }

    pub fn can_upload(&self) -> bool {
        self.backend_ready()
            && !self.upload_requested
            && self.selected_name.is_some()
            && self
                .snapshot
                .as_ref()
                .is_none_or(|snapshot| !snapshot.uploading)
    }

    pub fn status_line(&self) -> Option<&'static str> {
        self.snapshot.as_ref().and_then(WorkflowSnapshot::status_line)
    }

    pub fn prediction_line(&self) -> String {
        self.snapshot
            .as_ref()
            .map(WorkflowSnapshot::prediction_line)
            .unwrap_or_else(|| PREDICTION_PREFIX.to_string())
    }
}
