//! UI/backend events and user-facing error wording.

use client_core::{StorageWriteError, WorkflowError, WorkflowSnapshot};

/// Preview pixels decoded off the UI thread, keyed by the workflow's preview
/// uri so a replaced selection swaps the texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub uri: String,
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    Ready { server_url: String },
    StartupFailed(String),
    FileSelected {
        name: String,
        preview: Option<PreviewImage>,
    },
    FileRejected(String),
    UploadFinished(Option<WorkflowError>),
    Snapshot(WorkflowSnapshot),
}

pub fn describe_upload_error(err: &WorkflowError) -> String {
    match err {
        WorkflowError::NoFileSelected => "Choose a file before uploading.".to_string(),
        WorkflowError::UploadInFlight => "An upload is already running.".to_string(),
        WorkflowError::StorageWrite(StorageWriteError::TimedOut) => {
            "Upload timed out; check the server and retry.".to_string()
        }
        WorkflowError::StorageWrite(StorageWriteError::Transport(detail)) => {
            format!("Server unreachable; check the URL and retry ({detail}).")
        }
        WorkflowError::StorageWrite(StorageWriteError::Rejected { status, message }) => {
            format!("Server rejected the upload (HTTP {status}): {message}")
        }
        WorkflowError::StorageWrite(StorageWriteError::InvalidResponse(detail)) => {
            format!("Upload stored but the server reply was unreadable: {detail}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_uploads_surface_status_and_message() {
        let text = describe_upload_error(&WorkflowError::StorageWrite(
            StorageWriteError::Rejected {
                status: 413,
                message: "object exceeds 8 bytes".into(),
            },
        ));
        assert_eq!(
            text,
            "Server rejected the upload (HTTP 413): object exceeds 8 bytes"
        );
    }

    #[test]
    fn guard_errors_have_short_hints() {
        assert_eq!(
            describe_upload_error(&WorkflowError::NoFileSelected),
            "Choose a file before uploading."
        );
        assert!(describe_upload_error(&WorkflowError::UploadInFlight).contains("already"));
    }
}
