use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{Context, Result};
use shared::{
    domain::{BucketName, ObjectKey},
    protocol::StoredObjectSummary,
};
use tracing::{error, info, warn};

use crate::{
    error::WorkflowError,
    preview::{PreviewHandle, PreviewRegistry},
    transport::{ObjectStore, PutObjectRequest},
};

/// A user-chosen file held in memory until it is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reads `path` and guesses its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("'{}' has no usable file name", path.display()))?
            .to_string();
        let bytes =
            fs::read(path).with_context(|| format!("failed to read '{}'", path.display()))?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(name, content_type, bytes))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadOutcome {
    #[default]
    Idle,
    Success,
    Failure,
}

impl UploadOutcome {
    pub fn status_line(self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::Success => Some("Upload successful"),
            Self::Failure => Some("Upload failed"),
        }
    }
}

struct Selection {
    file: Arc<LocalFile>,
    preview: PreviewHandle,
}

#[derive(Default)]
struct UploaderState {
    selection: Option<Selection>,
    outcome: UploadOutcome,
    in_flight: bool,
}

pub struct Uploader {
    store: Arc<dyn ObjectStore>,
    bucket: BucketName,
    previews: PreviewRegistry,
    state: Mutex<UploaderState>,
}

impl Uploader {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: BucketName, previews: PreviewRegistry) -> Self {
        Self {
            store,
            bucket,
            previews,
            state: Mutex::new(UploaderState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, UploaderState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the current selection. The previous preview is released here;
    /// an upload already running keeps the file it started with.
    pub fn select(&self, file: LocalFile) -> String {
        let preview = self.previews.acquire(&file.name);
        let uri = preview.uri().to_string();
        info!(name = %file.name, content_type = %file.content_type, size = file.bytes.len(), "upload: file selected");
        let previous = self.state().selection.replace(Selection {
            file: Arc::new(file),
            preview,
        });
        drop(previous);
        uri
    }

    pub fn clear_selection(&self) {
        let previous = self.state().selection.take();
        drop(previous);
    }

    pub fn selected_file(&self) -> Option<Arc<LocalFile>> {
        self.state()
            .selection
            .as_ref()
            .map(|selection| Arc::clone(&selection.file))
    }

    pub fn preview_uri(&self) -> Option<String> {
        self.state()
            .selection
            .as_ref()
            .map(|selection| selection.preview.uri().to_string())
    }

    pub fn outcome(&self) -> UploadOutcome {
        self.state().outcome
    }

    pub fn is_uploading(&self) -> bool {
        self.state().in_flight
    }

    pub fn bucket(&self) -> &BucketName {
        &self.bucket
    }

    /// Puts the selected file into the configured bucket under its own name.
    ///
    /// `on_success` runs exactly once, after the put resolves successfully.
    /// Nothing is retried.
    pub async fn upload(
        &self,
        on_success: impl FnOnce() + Send,
    ) -> Result<StoredObjectSummary, WorkflowError> {
        let file = {
            let mut state = self.state();
            let Some(selection) = state.selection.as_ref() else {
                warn!("upload: no file selected");
                return Err(WorkflowError::NoFileSelected);
            };
            let file = Arc::clone(&selection.file);
            if state.in_flight {
                warn!(name = %file.name, "upload: already in flight");
                return Err(WorkflowError::UploadInFlight);
            }
            state.in_flight = true;
            file
        };
        let _in_flight = InFlight { uploader: self };

        let request = PutObjectRequest {
            bucket: self.bucket.clone(),
            key: ObjectKey::new(file.name.clone()),
            bytes: file.bytes.clone(),
            content_type: file.content_type.clone(),
        };

        match self.store.put_object(request).await {
            Ok(summary) => {
                self.state().outcome = UploadOutcome::Success;
                info!(
                    bucket = %summary.bucket,
                    key = %summary.key,
                    revision = summary.revision,
                    "upload: stored object"
                );
                on_success();
                Ok(summary)
            }
            Err(err) => {
                self.state().outcome = UploadOutcome::Failure;
                error!(bucket = %self.bucket, name = %file.name, error = %err, "upload: failed");
                Err(err.into())
            }
        }
    }
}

/// Clears the in-flight flag when the upload finishes or its future is
/// dropped.
struct InFlight<'a> {
    uploader: &'a Uploader,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.uploader.state().in_flight = false;
    }
}
