//! Durable storage for RosterSync.
//!
//! State lives in a single JSON document on the local filesystem, replaced
//! atomically on every save, with dated daily copies kept alongside it.

pub mod snapshot;

pub use snapshot::SnapshotManager;
