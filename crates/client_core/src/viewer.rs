use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use shared::{
    domain::{ObjectKey, UploadGeneration},
    protocol::PredictionResponse,
};
use tokio::{sync::watch, task::JoinSet};
use tracing::{debug, info, warn};

use crate::{error::PredictionFetchError, transport::PredictionSource};

pub const PREDICTION_PREFIX: &str = "Prediction from backend: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// What the viewer currently shows, plus bookkeeping UIs can poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerState {
    /// Last applied prediction. Empty until the first successful fetch.
    pub prediction: String,
    pub object_key: Option<ObjectKey>,
    /// Generation whose response produced `prediction`.
    pub applied: Option<UploadGeneration>,
    /// Highest generation whose fetch has finished, applied or not.
    pub settled: Option<UploadGeneration>,
    pub last_error: Option<PredictionFetchError>,
}

impl ViewerState {
    pub fn prediction_line(&self) -> String {
        format!("{PREDICTION_PREFIX}{}", self.prediction)
    }
}

pub struct PredictionViewer {
    source: Arc<dyn PredictionSource>,
    retry: RetryPolicy,
    last_observed: Mutex<Option<UploadGeneration>>,
    state: watch::Sender<ViewerState>,
}

impl PredictionViewer {
    pub fn new(source: Arc<dyn PredictionSource>, retry: RetryPolicy) -> Self {
        let (state, _) = watch::channel(ViewerState::default());
        Self {
            source,
            retry,
            last_observed: Mutex::new(None),
            state,
        }
    }

    pub fn state(&self) -> ViewerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewerState> {
        self.state.subscribe()
    }

    pub fn prediction_line(&self) -> String {
        self.state.borrow().prediction_line()
    }

    /// Returns true when `generation` has not been seen before and a fetch
    /// should be issued for it. Re-observing a value is a no-op.
    pub fn observe(&self, generation: UploadGeneration) -> bool {
        let mut last = self
            .last_observed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if last.is_some_and(|last| generation <= last) {
            return false;
        }
        *last = Some(generation);
        true
    }

    /// Fetches the prediction tagged with `generation` and applies it unless
    /// a newer generation was applied first. Returns whether it was applied.
    pub async fn refresh(&self, generation: UploadGeneration) -> bool {
        let result = self.fetch_with_retry(generation).await;
        self.apply(generation, result)
    }

    async fn fetch_with_retry(
        &self,
        generation: UploadGeneration,
    ) -> Result<PredictionResponse, PredictionFetchError> {
        let attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.source.fetch_prediction().await {
                Ok(response) => return Ok(response),
                Err(err) if attempt < attempts => {
                    warn!(%generation, attempt, error = %err, "prediction: fetch failed, retrying");
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn apply(
        &self,
        generation: UploadGeneration,
        result: Result<PredictionResponse, PredictionFetchError>,
    ) -> bool {
        let mut applied = false;
        self.state.send_modify(|state| {
            state.settled = state.settled.max(Some(generation));
            let stale = state.applied.is_some_and(|last| generation < last);
            match result {
                Ok(_) if stale => {
                    debug!(%generation, "prediction: dropped response older than the displayed one");
                }
                Ok(response) => {
                    info!(%generation, prediction = %response.prediction, "prediction: applied");
                    state.prediction = response.prediction;
                    state.object_key = response.object_key;
                    state.applied = Some(generation);
                    state.last_error = None;
                    applied = true;
                }
                Err(err) => {
                    warn!(%generation, error = %err, "prediction: fetch failed");
                    if !stale {
                        state.last_error = Some(err);
                    }
                }
            }
        });
        applied
    }

    /// Resolves once a fetch for `generation` or a later one has finished.
    pub async fn settled(&self, generation: UploadGeneration) -> ViewerState {
        let mut rx = self.subscribe();
        let result = rx
            .wait_for(|state| state.settled >= Some(generation))
            .await
            .map(|state| state.clone());
        match result {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Follows `generations` until the sender goes away, issuing one fetch per
    /// newly observed value. Dropping or aborting this future aborts every
    /// fetch still in flight.
    pub async fn run(self: Arc<Self>, mut generations: watch::Receiver<UploadGeneration>) {
        let mut fetches = JoinSet::new();
        let initial = *generations.borrow_and_update();
        self.spawn_if_new(&mut fetches, initial);

        loop {
            tokio::select! {
                changed = generations.changed() => {
                    if changed.is_err() {
                        debug!("prediction: generation source closed");
                        break;
                    }
                    let generation = *generations.borrow_and_update();
                    self.spawn_if_new(&mut fetches, generation);
                }
                Some(joined) = fetches.join_next() => {
                    if let Err(err) = joined {
                        if !err.is_cancelled() {
                            warn!(error = %err, "prediction: fetch task failed");
                        }
                    }
                }
            }
        }

        while let Some(joined) = fetches.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "prediction: fetch task failed");
            }
        }
    }

    fn spawn_if_new(self: &Arc<Self>, fetches: &mut JoinSet<()>, generation: UploadGeneration) {
        if !self.observe(generation) {
            return;
        }
        let viewer = Arc::clone(self);
        fetches.spawn(async move {
            viewer.refresh(generation).await;
        });
    }
}
