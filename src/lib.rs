//! # flagfile - Concurrent file-backed feature state persistence
//!
//! A persistence layer for named, mutable feature state records: small
//! configuration objects identifying whether a capability is enabled, which
//! activation strategy governs it, and the string parameters for that
//! strategy. The layer survives concurrent access from many threads (and,
//! with host-wide locking, multiple processes sharing the same file)
//! without losing or corrupting updates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │     FileBasedStateRepository (facade)   │
//! │     get / set / remove / list           │
//! └─────────────────────────────────────────┘
//!        │              │             │
//!   ┌────┴──────┐  ┌────┴─────┐  ┌────┴─────┐
//!   │ PathGuard │  │  codec   │  │  atomic  │
//!   │ per-path  │  │ line <-> │  │ tempfile │
//!   │ mutex +   │  │ record   │  │ + fsync  │
//!   │ flock     │  │ file <-> │  │ + rename │
//!   │           │  │ table    │  │          │
//!   └───────────┘  └──────────┘  └──────────┘
//! ```
//!
//! Every operation is one guarded read-modify-write unit: read the whole
//! file, decode it into a table, mutate one entry, re-encode and replace the
//! file atomically. Concurrent writers for distinct feature names never
//! lose each other's updates, and no reader ever observes a table
//! mid-rewrite.
//!
//! ## Example
//!
//! ```no_run
//! use flagfile::{FeatureState, FileBasedStateRepository};
//!
//! fn main() -> flagfile::Result<()> {
//!     let repo = FileBasedStateRepository::new("/var/lib/app/features.state")?;
//!
//!     let state = FeatureState::enabled()
//!         .with_strategy("gradual-rollout")
//!         .with_parameter("percentage", "25");
//!     repo.set_feature_state("NEW_CHECKOUT", state)?;
//!
//!     match repo.get_feature_state("NEW_CHECKOUT")? {
//!         Some(state) => println!("enabled: {}", state.enabled),
//!         None => println!("feature not configured"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod errors;
pub mod persistence;
pub mod state;

pub use errors::{FlagFileError, Result};
pub use persistence::{FileBasedStateRepository, LockScope};
pub use state::{FeatureState, FeatureTable};
