//! SQLite-backed versioned snapshot store.
//!
//! Persistent storage for the interception engine, using SQLite with async
//! access via tokio-rusqlite. It supports:
//!
//! - Fingerprint-keyed snapshots (SHA-256 over method, URL and vary headers)
//! - Generations with a single active row and cascading eviction
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod snapshots;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use generations::{GenerationInfo, GenerationState};
pub use hash::Fingerprint;
pub use snapshots::StoredSnapshot;
pub use store::SnapshotStore;
