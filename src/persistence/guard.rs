/**
 * guard.rs
 * Per-path mutual exclusion for read-modify-write units
 *
 * Every repository operation runs as one guarded unit: read table, mutate
 * one entry, write table back. At most one unit is in flight per resolved
 * file path at any time:
 * - Process scope: a named mutex per distinct path, shared by all guards
 *   (and therefore all repository instances) in this process.
 * - Host scope: additionally a blocking exclusive advisory lock (flock) on
 *   a sibling `<file>.lock` file, serializing against other processes on
 *   the same host.
 *
 * Two guards pointed at two different files never contend with each other.
 * The guard does not detect deadlock; a unit must terminate and must not
 * re-enter the guard for the same path.
 */

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::errors::Result;

#[cfg(unix)]
use crate::errors::FlagFileError;

/// Locking scope for a guarded file path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockScope {
    /// Serialize read-modify-write units across the threads of this process
    #[default]
    Process,
    /// Additionally hold an OS advisory lock for the duration of each unit,
    /// serializing against other processes sharing the file
    Host,
}

/// Process-wide registry of one mutex per distinct file path. Entries live
/// for the lifetime of the process, bounded by the number of distinct paths.
static PATH_LOCKS: OnceCell<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceCell::new();

fn lock_for(path: &Path) -> Arc<Mutex<()>> {
    let registry = PATH_LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = registry.lock().unwrap_or_else(|e| e.into_inner());
    map.entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Mutual-exclusion gate for one file path
#[derive(Debug)]
pub struct PathGuard {
    lock_path: PathBuf,
    mutex: Arc<Mutex<()>>,
    scope: LockScope,
}

impl PathGuard {
    /// Create a guard for the given resolved file path
    ///
    /// Guards created for the same path share one mutex; the caller is
    /// responsible for resolving equivalent spellings of a path to one
    /// canonical form before constructing the guard.
    pub fn new(path: PathBuf, scope: LockScope) -> Self {
        let mutex = lock_for(&path);
        let lock_path = lock_file_path(&path);
        PathGuard {
            lock_path,
            mutex,
            scope,
        }
    }

    /// Run `body` with exclusive access to the guarded path
    ///
    /// Blocks until the path mutex (and, for [`LockScope::Host`], the
    /// advisory file lock) is acquired. Lock acquisition failures surface
    /// as [`crate::errors::FlagFileError::Persistence`]; no retry happens
    /// here.
    pub fn with_exclusive_access<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        // A poisoned mutex means an earlier unit panicked mid-flight. The
        // on-disk table is still consistent (writes are atomic), so the
        // guard recovers the lock instead of propagating the poison.
        let _guard = self.mutex.lock().unwrap_or_else(|e| e.into_inner());
        match self.scope {
            LockScope::Process => body(),
            LockScope::Host => {
                let _host_lock = HostLock::acquire(&self.lock_path)?;
                body()
            }
        }
    }
}

/// Sibling lock file: `features.state` locks through `features.state.lock`.
/// Kept separate from the data file so the atomic rename over the data file
/// never disturbs the lock inode.
fn lock_file_path(path: &Path) -> PathBuf {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => path.with_file_name(format!("{}.lock", name)),
        None => path.with_file_name(".lock"),
    }
}

/// Blocking exclusive advisory lock, released on drop
struct HostLock {
    #[cfg(unix)]
    file: std::fs::File,
}

impl HostLock {
    #[cfg(unix)]
    fn acquire(lock_path: &Path) -> Result<Self> {
        use std::os::unix::io::AsRawFd;

        let file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(lock_path)
            .map_err(|e| {
                FlagFileError::Persistence(format!(
                    "Failed to create lock file {}: {}",
                    lock_path.display(),
                    e
                ))
            })?;

        // LOCK_EX blocks until the lock is available
        let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
        if rc != 0 {
            return Err(FlagFileError::Persistence(format!(
                "Failed to lock {}: {}",
                lock_path.display(),
                std::io::Error::last_os_error()
            )));
        }

        debug!(path = %lock_path.display(), "acquired host-wide advisory lock");
        Ok(HostLock { file })
    }

    #[cfg(not(unix))]
    fn acquire(lock_path: &Path) -> Result<Self> {
        // Advisory locking uses different APIs elsewhere; host scope
        // degrades to process scope on non-Unix platforms.
        debug!(path = %lock_path.display(), "host-wide locking unavailable on this platform");
        Ok(HostLock {})
    }
}

#[cfg(unix)]
impl Drop for HostLock {
    fn drop(&mut self) {
        use std::os::unix::io::AsRawFd;
        // close() would also release the lock
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}
