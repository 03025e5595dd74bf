//! # Providers
//!
//! The provider owns every collage opened by this run, keyed by the path it was loaded from.
//! Loading may happen on many threads at once, each inserting its queue when done.

use std::path::{Path, PathBuf};

use collage_core::queue::CollageQueue;

/// A provider that keeps collages in-memory.
#[derive(Default)]
pub struct InMemoryCollageProvider {
    // We don't expect high contention - will only be locked for writing when a new queue is inserted.
    documents: parking_lot::RwLock<hashbrown::HashMap<PathBuf, CollageQueue>>,
}
impl InMemoryCollageProvider {
    /// Insert a queue into this provider.
    /// If a collage from this path is already open, the untouched queue is returned as an error.
    pub fn insert(&self, path: PathBuf, queue: CollageQueue) -> Result<(), CollageQueue> {
        match self.documents.write().entry(path) {
            hashbrown::hash_map::Entry::Occupied(_) => return Err(queue),
            hashbrown::hash_map::Entry::Vacant(v) => {
                log::trace!("Opened {}", v.key().display());
                v.insert(queue);
            }
        }
        Ok(())
    }
    /// Call the given closure on the queue of the collage opened from `path`, if found.
    pub fn inspect<F, T>(&self, path: &Path, f: F) -> Option<T>
    where
        F: FnOnce(&CollageQueue) -> T,
    {
        // Queues are shared handles. Clone out so the closure runs without the map locked.
        let queue = self.documents.read().get(path)?.clone();
        Some(f(&queue))
    }
    /// Paths of all the open collages, sorted.
    pub fn document_iter(&self) -> impl Iterator<Item = PathBuf> {
        let mut paths: Vec<_> = self.documents.read().keys().cloned().collect();
        paths.sort_unstable();
        paths.into_iter()
    }
}

pub fn provider() -> &'static InMemoryCollageProvider {
    static ONCE: std::sync::OnceLock<InMemoryCollageProvider> = std::sync::OnceLock::new();
    ONCE.get_or_init(Default::default)
}
