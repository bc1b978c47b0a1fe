use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use tracing::debug;

/// Tracks local preview resources handed out for selected files.
///
/// Every [`PreviewHandle`] stays registered until it is dropped, so a caller
/// that replaces or discards its selection cannot leak previews.
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: Mutex<HashSet<u64>>,
}

impl RegistryInner {
    fn live(&self) -> MutexGuard<'_, HashSet<u64>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, file_name: &str) -> PreviewHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.live().insert(id);
        debug!(id, file_name, "preview: acquired");
        PreviewHandle {
            id,
            uri: format!("preview://{id}/{file_name}"),
            registry: Arc::clone(&self.inner),
        }
    }

    pub fn live_count(&self) -> usize {
        self.inner.live().len()
    }

    pub fn is_live(&self, id: u64) -> bool {
        self.inner.live().contains(&id)
    }
}

pub struct PreviewHandle {
    id: u64,
    uri: String,
    registry: Arc<RegistryInner>,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stable identifier for the preview; UIs key cached textures on it.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle")
            .field("id", &self.id)
            .field("uri", &self.uri)
            .finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.live().remove(&self.id);
        debug!(id = self.id, "preview: released");
    }
}
