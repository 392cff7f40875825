//! File-based feature state repository
//!
//! The public facade of the crate: composes the codec, the atomic writer and
//! the path guard into `get`/`set` operations on a single flat file shared
//! by all callers. Every operation runs as one guarded read-modify-write
//! unit, so no caller ever observes a table mid-rewrite and concurrent
//! writers for distinct names never lose each other's updates.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::codec;
use crate::errors::{FlagFileError, Result};
use crate::persistence::atomic::write_atomically;
use crate::persistence::guard::{LockScope, PathGuard};
use crate::state::{FeatureState, FeatureTable};

/// Repository of named feature states backed by a single flat file
///
/// A missing file reads as an empty table; it is created on the first write.
/// A file that exists but fails to decode makes every operation fail with
/// [`FlagFileError::MalformedFile`] rather than silently discarding data.
///
/// # Example
///
/// ```no_run
/// use flagfile::{FeatureState, FileBasedStateRepository};
///
/// fn main() -> flagfile::Result<()> {
///     let repo = FileBasedStateRepository::new("/var/lib/app/features.state")?;
///
///     let state = FeatureState::enabled()
///         .with_strategy("gradual-rollout")
///         .with_parameter("percentage", "25");
///     repo.set_feature_state("NEW_CHECKOUT", state)?;
///
///     assert!(repo.get_feature_state("NEW_CHECKOUT")?.is_some());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileBasedStateRepository {
    path: PathBuf,
    guard: PathGuard,
}

impl FileBasedStateRepository {
    /// Create a repository bound to the given file path, with process-scoped
    /// locking
    ///
    /// The parent directory is created if missing and the path is resolved
    /// so that equivalent spellings of the same path share one guard.
    ///
    /// # Errors
    ///
    /// Returns [`FlagFileError::Persistence`] if the parent directory cannot
    /// be created or resolved.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_lock_scope(path, LockScope::Process)
    }

    /// Create a repository with an explicit lock scope
    ///
    /// Use [`LockScope::Host`] when independent processes share the file;
    /// each read-modify-write unit then also holds an OS advisory lock on a
    /// sibling `<file>.lock` file.
    pub fn with_lock_scope<P: AsRef<Path>>(path: P, scope: LockScope) -> Result<Self> {
        let path = resolve_path(path.as_ref())?;
        let guard = PathGuard::new(path.clone(), scope);
        Ok(FileBasedStateRepository { path, guard })
    }

    /// The resolved path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state of a single feature
    ///
    /// # Returns
    ///
    /// `Ok(None)` for a name never written; not-found is a normal outcome,
    /// not an error.
    pub fn get_feature_state(&self, name: &str) -> Result<Option<FeatureState>> {
        self.guard.with_exclusive_access(|| {
            let mut table = load_table(&self.path)?;
            Ok(table.remove(name))
        })
    }

    /// Persist the state of a single feature, fully replacing any previous
    /// record under the same name
    ///
    /// Under the guard: read the current file (a missing file is an empty
    /// table), decode, replace the one entry, re-encode the whole table and
    /// write it atomically. Every other caller sees either the pre-write or
    /// the post-write table, never an intermediate one.
    ///
    /// # Errors
    ///
    /// [`FlagFileError::InvalidFeatureName`] for an empty name,
    /// [`FlagFileError::MalformedFile`] if the existing file does not
    /// decode, [`FlagFileError::Persistence`] on I/O failure. A failed write
    /// leaves the previously persisted table intact.
    pub fn set_feature_state(&self, name: &str, state: FeatureState) -> Result<()> {
        if name.is_empty() {
            return Err(FlagFileError::InvalidFeatureName(
                "feature name must not be empty".to_string(),
            ));
        }
        self.guard.with_exclusive_access(|| {
            let mut table = load_table(&self.path)?;
            table.insert(name.to_string(), state);
            write_atomically(&self.path, &codec::encode_table(&table))
        })?;
        debug!(feature = name, path = %self.path.display(), "feature state persisted");
        Ok(())
    }

    /// Remove the record for a feature
    ///
    /// # Returns
    ///
    /// `true` if a record was present and removed. Removing an absent name
    /// is a no-op and does not rewrite the file.
    pub fn remove_feature_state(&self, name: &str) -> Result<bool> {
        self.guard.with_exclusive_access(|| {
            let mut table = load_table(&self.path)?;
            if table.remove(name).is_none() {
                return Ok(false);
            }
            write_atomically(&self.path, &codec::encode_table(&table))?;
            Ok(true)
        })
    }

    /// Snapshot of the complete table
    pub fn all_feature_states(&self) -> Result<FeatureTable> {
        self.guard.with_exclusive_access(|| load_table(&self.path))
    }

    /// Names of all persisted features, sorted
    pub fn feature_names(&self) -> Result<Vec<String>> {
        Ok(self.all_feature_states()?.into_keys().collect())
    }
}

/// Canonicalize the parent directory (creating it if missing) and re-join
/// the file name, so `./features.state` and an absolute spelling of the same
/// file resolve to one guard key. The file itself may not exist yet.
fn resolve_path(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| {
            FlagFileError::Persistence(format!("Path has no file name: {}", path.display()))
        })?
        .to_os_string();

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| {
        FlagFileError::Persistence(format!(
            "Failed to create directory {}: {}",
            parent.display(),
            e
        ))
    })?;
    let parent = fs::canonicalize(&parent).map_err(|e| {
        FlagFileError::Persistence(format!("Failed to resolve {}: {}", parent.display(), e))
    })?;

    Ok(parent.join(file_name))
}

fn load_table(path: &Path) -> Result<FeatureTable> {
    if !path.exists() {
        return Ok(FeatureTable::new());
    }
    let content = fs::read_to_string(path).map_err(|e| {
        FlagFileError::Persistence(format!("Failed to read {}: {}", path.display(), e))
    })?;
    codec::decode_table(&content)
}
