// persistence/mod.rs - Concurrent file persistence subsystem

pub mod atomic;
pub mod guard;
pub mod repository;

pub use atomic::write_atomically;
pub use guard::{LockScope, PathGuard};
pub use repository::FileBasedStateRepository;
