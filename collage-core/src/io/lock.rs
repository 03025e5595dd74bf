//! Per-file mutual exclusion for reading and writing collage files.
//!
//! Two jobs touching the same path run one after the other, jobs on different paths don't wait on
//! each other. Only this process is covered, other programs are free to touch the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

type Token = Arc<parking_lot::Mutex<()>>;

// Tokens by path. Entries nobody holds are swept on each new lock.
static TOKENS: parking_lot::Mutex<std::collections::BTreeMap<PathBuf, Token>> =
    parking_lot::const_mutex(std::collections::BTreeMap::new());

/// Held for the duration of one job on one path.
#[must_use = "the path is only locked while this is held"]
pub struct PathLock {
    path: PathBuf,
    _guard: parking_lot::ArcMutexGuard<parking_lot::RawMutex, ()>,
}
impl PathLock {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
impl std::fmt::Debug for PathLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PathLock").field(&self.path).finish()
    }
}

/// One key per file, so different spellings of it share a token. Only the directory is resolved,
/// the key must not change when the file itself is created or removed.
fn key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_owned());
    let (Some(parent), Some(name)) = (absolute.parent(), absolute.file_name()) else {
        return absolute;
    };
    match std::fs::canonicalize(parent) {
        Ok(parent) => parent.join(name),
        Err(_) => absolute,
    }
}
fn token(path: &Path) -> (PathBuf, Token) {
    let key = key(path);
    let mut tokens = TOKENS.lock();
    tokens.retain(|_, token| Arc::strong_count(token) > 1);
    let token = tokens.entry(key.clone()).or_default().clone();
    (key, token)
}

/// Lock `path`, waiting for whoever holds it.
pub fn lock(path: &Path) -> PathLock {
    let (path, token) = token(path);
    let guard = token.lock_arc();
    log::trace!("Locked {}", path.display());
    PathLock {
        path,
        _guard: guard,
    }
}
/// Lock `path` if nobody holds it.
pub fn try_lock(path: &Path) -> Option<PathLock> {
    let (path, token) = token(path);
    let guard = token.try_lock_arc()?;
    Some(PathLock {
        path,
        _guard: guard,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_path_excludes() {
        let path = Path::new("lock-test-same.xcl");
        let held = lock(path);
        assert!(try_lock(path).is_none());
        drop(held);
        assert!(try_lock(path).is_some());
    }
    #[test]
    fn different_paths_independent() {
        let _a = lock(Path::new("lock-test-a.xcl"));
        assert!(try_lock(Path::new("lock-test-b.xcl")).is_some());
    }
    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("collage-lock-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
    #[test]
    fn held_across_file_creation() {
        let dir = scratch_dir("create");
        let path = dir.join("f.xcl");
        let held = lock(&path);
        std::fs::write(&path, "").unwrap();
        assert!(try_lock(&path).is_none());
        drop(held);
        assert!(try_lock(&path).is_some());
        std::fs::remove_dir_all(&dir).unwrap();
    }
    #[cfg(unix)]
    #[test]
    fn symlinked_directory_shares_lock() {
        let dir = scratch_dir("link");
        let real = dir.join("real");
        std::fs::create_dir(&real).unwrap();
        let link = dir.join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let _held = lock(&link.join("f.xcl"));
        std::fs::write(real.join("f.xcl"), "").unwrap();
        assert!(try_lock(&real.join("f.xcl")).is_none());
        assert!(try_lock(&link.join("f.xcl")).is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }
    #[test]
    fn waits_for_holder() {
        let path = Path::new("lock-test-wait.xcl");
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let held = lock(path);
        let waiter = {
            let order = order.clone();
            std::thread::spawn(move || {
                let _lock = lock(path);
                order.lock().push("waiter");
            })
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        order.lock().push("holder");
        drop(held);
        waiter.join().unwrap();
        assert_eq!(*order.lock(), ["holder", "waiter"]);
    }
}
