//! # Handles
//! Layers, shapes and observers are owned by arenas and referred to by handle, never by pointer.
//! A `Handle<T>` is unique within this execution of the program and namespaced by the type T.
//!
//! Handles are never persisted. A loaded collage allocates fresh handles for everything it contains,
//! so handles from two collages loaded in the same process never collide. This is what allows an
//! imported collage's layers to be moved into another arena as-is.

// Next available handle, by namespace.
static HANDLE_SERVER: parking_lot::RwLock<
    std::collections::BTreeMap<std::any::TypeId, std::sync::atomic::AtomicU64>,
> = parking_lot::const_rwlock(std::collections::BTreeMap::new());

/// Handle that is guarunteed unique within this execution of the program.
/// Handles with different namespaces may share a value but can never be compared.
pub struct Handle<T: std::any::Any> {
    id: std::num::NonZeroU64,
    _namespace: std::marker::PhantomData<T>,
}
impl<T: std::any::Any> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: std::any::Any> Copy for Handle<T> {}
impl<T: std::any::Any> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: std::any::Any> Eq for Handle<T> {}
impl<T: std::any::Any> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
/// Ordering is allocation order. Useful for stable iteration, meaningless otherwise.
impl<T: std::any::Any> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

// Safety - it's just a u64.
// T is only a namespace marker, a handle to a !Send type is still just a number.
unsafe impl<T: std::any::Any> Send for Handle<T> {}
unsafe impl<T: std::any::Any> Sync for Handle<T> {}

impl<T: std::any::Any> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: std::any::Any> Handle<T> {
    /// Raw numeric value of this handle.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.id.get()
    }
    /// Allocate a fresh handle.
    ///
    /// # Panics
    /// After `u64::MAX - 1` handles of one namespace have been handed out. That is
    /// not reachable by allocating one at a time.
    #[must_use]
    pub fn next() -> Self {
        let ty = std::any::TypeId::of::<T>();
        let id = {
            let read = HANDLE_SERVER.upgradable_read();
            if let Some(counter) = read.get(&ty) {
                counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            } else {
                // First handle of this namespace. Happens once per type for the whole program.
                let mut write = parking_lot::RwLockUpgradableReadGuard::upgrade(read);
                // Another thread may have raced us to the upgrade.
                write
                    .entry(ty)
                    .or_insert_with(|| 1.into())
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            }
        };
        let Some(id) = std::num::NonZeroU64::new(id) else {
            log::error!("{} handle overflow!", std::any::type_name::<T>());
            panic!("{} handle overflow!", std::any::type_name::<T>());
        };
        Self {
            id,
            _namespace: std::marker::PhantomData,
        }
    }
}
impl<T: std::any::Any> Default for Handle<T> {
    fn default() -> Self {
        Self::next()
    }
}
impl<T: std::any::Any> std::fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // rsplit always yields at least one item.
        let name = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or_default();
        write!(f, "{name}#{}", self.id)
    }
}
impl<T: std::any::Any> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::Handle;
    // Tests share the process-wide server, so each gets its own namespace.

    #[test]
    fn first_handle() {
        struct Namespace;
        let first = Handle::<Namespace>::next();
        // Not a stable guarantee, only true for a fresh namespace.
        assert_eq!(first.get(), 1);
        assert_eq!(Handle::<Namespace>::next().get(), 2);
    }
    #[test]
    fn unique() {
        struct Namespace;
        let mut handles: Vec<_> = std::iter::repeat_with(Handle::<Namespace>::next)
            .take(512)
            .collect();
        let before = handles.len();
        handles.sort_unstable();
        handles.dedup();
        assert_eq!(before, handles.len(), "had duplicate handles");
    }
    #[test]
    fn unique_across_threads() {
        struct Namespace;
        let threads: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    std::iter::repeat_with(Handle::<Namespace>::next)
                        .take(256)
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all: Vec<_> = threads
            .into_iter()
            .flat_map(|thread| thread.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1024);
    }
    #[test]
    fn display_names_namespace() {
        struct Layer;
        let handle = Handle::<Layer>::next();
        assert_eq!(handle.to_string(), format!("Layer#{}", handle.get()));
    }
}
