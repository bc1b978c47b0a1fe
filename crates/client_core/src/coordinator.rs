use std::sync::Arc;

use shared::domain::UploadGeneration;
use tokio::sync::watch;
use tracing::debug;

/// Owns the upload generation. Uploaders get [`Coordinator::increment`] as
/// their success callback and viewers subscribe to the value.
#[derive(Clone)]
pub struct Coordinator {
    generation: Arc<watch::Sender<UploadGeneration>>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(UploadGeneration::INITIAL);
        Self {
            generation: Arc::new(generation),
        }
    }

    pub fn increment(&self) -> UploadGeneration {
        let mut advanced = UploadGeneration::INITIAL;
        self.generation.send_modify(|generation| {
            *generation = generation.next();
            advanced = *generation;
        });
        debug!(generation = %advanced, "coordinator: generation advanced");
        advanced
    }

    pub fn current(&self) -> UploadGeneration {
        *self.generation.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadGeneration> {
        self.generation.subscribe()
    }

    pub fn success_callback(&self) -> impl FnOnce() + Send + 'static {
        let coordinator = self.clone();
        move || {
            coordinator.increment();
        }
    }
}
