use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::Utc;
use shared::protocol::{PredictionResponse, StoredObjectSummary};
use tokio::sync::{oneshot, Notify};

use crate::{
    error::{PredictionFetchError, StorageWriteError},
    transport::{ObjectStore, PredictionSource, PutObjectRequest},
};

/// Records every put. Can fail, or hold each put until released.
#[derive(Default)]
pub(crate) struct RecordingStore {
    pub puts: Mutex<Vec<PutObjectRequest>>,
    pub fail_with: Option<StorageWriteError>,
    pub hold: Option<Arc<Hold>>,
}

#[derive(Default)]
pub(crate) struct Hold {
    pub started: Notify,
    pub release: Notify,
}

impl RecordingStore {
    pub fn failing(err: StorageWriteError) -> Self {
        Self {
            fail_with: Some(err),
            ..Self::default()
        }
    }

    pub fn held(hold: Arc<Hold>) -> Self {
        Self {
            hold: Some(hold),
            ..Self::default()
        }
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().expect("puts").len()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put_object(
        &self,
        request: PutObjectRequest,
    ) -> Result<StoredObjectSummary, StorageWriteError> {
        self.puts.lock().expect("puts").push(request.clone());
        if let Some(hold) = &self.hold {
            hold.started.notify_one();
            hold.release.notified().await;
        }
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        Ok(StoredObjectSummary {
            bucket: request.bucket,
            key: request.key,
            content_type: request.content_type,
            size_bytes: request.bytes.len() as u64,
            revision: self.put_count() as i64,
            stored_at: Utc::now(),
        })
    }
}

pub(crate) struct Step {
    result: Result<PredictionResponse, PredictionFetchError>,
    gate: Option<oneshot::Receiver<()>>,
}

impl Step {
    pub fn ok(prediction: &str) -> Self {
        Self {
            result: Ok(PredictionResponse {
                prediction: prediction.to_string(),
                object_key: None,
            }),
            gate: None,
        }
    }

    pub fn err(err: PredictionFetchError) -> Self {
        Self {
            result: Err(err),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: oneshot::Receiver<()>) -> Self {
        self.gate = Some(gate);
        self
    }
}

/// Answers fetches from a script in call order; once the script runs out
/// every call fails with a transport error.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    pub called: Notify,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PredictionSource for ScriptedSource {
    async fn fetch_prediction(&self) -> Result<PredictionResponse, PredictionFetchError> {
        let step = self.steps.lock().expect("steps").pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called.notify_one();
        let Some(step) = step else {
            return Err(PredictionFetchError::Transport("script exhausted".into()));
        };
        if let Some(gate) = step.gate {
            let _ = gate.await;
        }
        step.result
    }
}
