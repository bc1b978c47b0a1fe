use std::sync::Arc;

use anyhow::{Context, Result};
use shared::{
    domain::{BucketName, UploadGeneration},
    protocol::StoredObjectSummary,
};
use tokio::{sync::watch, task::JoinHandle};
use url::Url;

use crate::{
    config::ClientSettings,
    coordinator::Coordinator,
    error::WorkflowError,
    preview::PreviewRegistry,
    transport::{http_client, HttpObjectStore, HttpPredictionSource, ObjectStore, PredictionSource},
    uploader::{LocalFile, UploadOutcome, Uploader},
    viewer::{PredictionViewer, RetryPolicy, ViewerState},
};

/// Everything a front end needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    pub generation: UploadGeneration,
    pub outcome: UploadOutcome,
    pub uploading: bool,
    pub selected_file: Option<String>,
    pub preview_uri: Option<String>,
    pub viewer: ViewerState,
}

impl WorkflowSnapshot {
    pub fn status_line(&self) -> Option<&'static str> {
        self.outcome.status_line()
    }

    pub fn prediction_line(&self) -> String {
        self.viewer.prediction_line()
    }

    pub fn can_upload(&self) -> bool {
        self.selected_file.is_some() && !self.uploading
    }
}

/// Page-level container wiring the uploader and the prediction viewer
/// through the coordinator's generation counter.
///
/// Must be created inside a tokio runtime; the viewer loop is spawned on it
/// and aborted when the workflow is dropped.
pub struct Workflow {
    coordinator: Coordinator,
    uploader: Uploader,
    viewer: Arc<PredictionViewer>,
    previews: PreviewRegistry,
    viewer_task: JoinHandle<()>,
}

impl Workflow {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        source: Arc<dyn PredictionSource>,
        bucket: BucketName,
        retry: RetryPolicy,
    ) -> Self {
        let coordinator = Coordinator::new();
        let previews = PreviewRegistry::new();
        let uploader = Uploader::new(store, bucket, previews.clone());
        let viewer = Arc::new(PredictionViewer::new(source, retry));
        let viewer_task = tokio::spawn(Arc::clone(&viewer).run(coordinator.subscribe()));
        Self {
            coordinator,
            uploader,
            viewer,
            previews,
            viewer_task,
        }
    }

    /// Builds the HTTP collaborators from `settings` and starts the workflow.
    pub fn connect(settings: &ClientSettings) -> Result<Self> {
        let server_url = Url::parse(settings.server_url.trim())
            .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
        let http = http_client(settings).context("failed to build HTTP client")?;
        let store = HttpObjectStore::new(http.clone(), server_url.clone());
        let source = HttpPredictionSource::new(http, &server_url)
            .context("failed to build prediction endpoint")?;
        let retry = RetryPolicy {
            attempts: settings.fetch_attempts.max(1),
            backoff: settings.fetch_backoff(),
        };
        Ok(Self::new(
            Arc::new(store),
            Arc::new(source),
            settings.bucket_name(),
            retry,
        ))
    }

    pub fn select_file(&self, file: LocalFile) -> String {
        self.uploader.select(file)
    }

    pub fn selected_file(&self) -> Option<Arc<LocalFile>> {
        self.uploader.selected_file()
    }

    /// Uploads the selected file; on success the generation advances and the
    /// viewer fetches a fresh prediction.
    pub async fn upload(&self) -> Result<StoredObjectSummary, WorkflowError> {
        self.uploader
            .upload(self.coordinator.success_callback())
            .await
    }

    pub fn generation(&self) -> UploadGeneration {
        self.coordinator.current()
    }

    pub fn status_line(&self) -> Option<&'static str> {
        self.uploader.outcome().status_line()
    }

    pub fn prediction_line(&self) -> String {
        self.viewer.prediction_line()
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn subscribe_viewer(&self) -> watch::Receiver<ViewerState> {
        self.viewer.subscribe()
    }

    /// Waits until the fetch triggered by `generation` (or a newer one) has
    /// finished and returns what the viewer shows afterwards.
    pub async fn settled(&self, generation: UploadGeneration) -> ViewerState {
        self.viewer.settled(generation).await
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            generation: self.coordinator.current(),
            outcome: self.uploader.outcome(),
            uploading: self.uploader.is_uploading(),
            selected_file: self.uploader.selected_file().map(|file| file.name.clone()),
            preview_uri: self.uploader.preview_uri(),
            viewer: self.viewer.state(),
        }
    }
}

impl Drop for Workflow {
    fn drop(&mut self) {
        self.viewer_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use tokio::sync::oneshot;

    use crate::test_support::{RecordingStore, ScriptedSource, Step};

    fn workflow(store: Arc<RecordingStore>, source: Arc<ScriptedSource>) -> Workflow {
        Workflow::new(store, source, BucketName::from("frubucket"), RetryPolicy::none())
    }

    #[tokio::test]
    async fn successful_upload_advances_generation_and_refreshes_prediction() {
        let store = Arc::new(RecordingStore::default());
        let source = Arc::new(ScriptedSource::new(vec![Step::ok(""), Step::ok("apple")]));
        let workflow = workflow(store.clone(), source.clone());
        workflow.settled(UploadGeneration(0)).await;

        workflow.select_file(LocalFile::new("apple.jpg", "image/jpeg", vec![0; 10]));
        assert!(workflow.snapshot().can_upload());
        workflow.upload().await.expect("upload");

        assert_eq!(workflow.generation(), UploadGeneration(1));
        assert_eq!(workflow.status_line(), Some("Upload successful"));
        let state = workflow.settled(UploadGeneration(1)).await;
        assert_eq!(state.prediction_line(), "Prediction from backend: apple");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn failed_upload_leaves_generation_alone() {
        let store = Arc::new(RecordingStore::failing(
            crate::error::StorageWriteError::TimedOut,
        ));
        let source = Arc::new(ScriptedSource::new(vec![Step::ok("")]));
        let workflow = workflow(store, source.clone());
        workflow.settled(UploadGeneration(0)).await;

        workflow.select_file(LocalFile::new("apple.jpg", "image/jpeg", vec![1]));
        let err = workflow.upload().await.expect_err("timed out");
        assert!(matches!(err, WorkflowError::StorageWrite(_)));

        assert_eq!(workflow.generation(), UploadGeneration(0));
        assert_eq!(workflow.status_line(), Some("Upload failed"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn snapshot_reflects_selection_and_previews_are_released_on_drop() {
        let store = Arc::new(RecordingStore::default());
        let source = Arc::new(ScriptedSource::default());
        let workflow = workflow(store, source);
        let snapshot = workflow.snapshot();
        assert!(!snapshot.can_upload());
        assert_eq!(snapshot.status_line(), None);

        let uri = workflow.select_file(LocalFile::new("kale.png", "image/png", vec![1]));
        let snapshot = workflow.snapshot();
        assert_eq!(snapshot.selected_file.as_deref(), Some("kale.png"));
        assert_eq!(snapshot.preview_uri, Some(uri));

        let previews = workflow.previews().clone();
        assert_eq!(previews.live_count(), 1);
        drop(workflow);
        assert_eq!(previews.live_count(), 0);
    }

    #[tokio::test]
    async fn dropping_workflow_aborts_in_flight_fetch() {
        let (mut release, gate) = oneshot::channel();
        let source = Arc::new(ScriptedSource::new(vec![Step::ok("apple").gated(gate)]));
        let workflow = workflow(Arc::new(RecordingStore::default()), source.clone());
        source.called.notified().await;
        assert_eq!(source.calls(), 1);

        drop(workflow);
        tokio::time::timeout(Duration::from_secs(5), release.closed())
            .await
            .expect("fetch for generation 0 was aborted");
        assert_eq!(source.calls(), 1);
    }
}
