//! The store interface consumed by the engine.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::generations::GenerationState;
use super::hash::Fingerprint;
use super::snapshots::StoredSnapshot;
use crate::Error;

/// Versioned snapshot store.
///
/// Snapshot reads and writes go to an explicit generation. Implementations
/// must be safe to call from concurrent tasks; conflicting writes to one
/// fingerprint may resolve in any order.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn get_snapshot(&self, generation: &str, fingerprint: &Fingerprint) -> Result<Option<StoredSnapshot>, Error>;

    async fn put_snapshot(&self, snapshot: &StoredSnapshot) -> Result<(), Error>;

    /// Atomic batch write used by install.
    async fn put_snapshots(&self, snapshots: &[StoredSnapshot]) -> Result<(), Error>;

    async fn list_generations(&self) -> Result<Vec<String>, Error>;

    async fn delete_generation(&self, label: &str) -> Result<bool, Error>;

    async fn create_generation(&self, label: &str) -> Result<(), Error>;

    async fn mark_generation_waiting(&self, label: &str) -> Result<(), Error>;

    async fn activate_generation(&self, label: &str) -> Result<(), Error>;

    async fn current_generation(&self) -> Result<Option<String>, Error>;

    async fn generation_state(&self, label: &str) -> Result<Option<GenerationState>, Error>;
}

#[async_trait]
impl SnapshotStore for CacheDb {
    async fn get_snapshot(&self, generation: &str, fingerprint: &Fingerprint) -> Result<Option<StoredSnapshot>, Error> {
        CacheDb::get_snapshot(self, generation, fingerprint).await
    }

    async fn put_snapshot(&self, snapshot: &StoredSnapshot) -> Result<(), Error> {
        self.upsert_snapshot(snapshot).await
    }

    async fn put_snapshots(&self, snapshots: &[StoredSnapshot]) -> Result<(), Error> {
        self.upsert_snapshots(snapshots).await
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        CacheDb::list_generations(self).await
    }

    async fn delete_generation(&self, label: &str) -> Result<bool, Error> {
        CacheDb::delete_generation(self, label).await
    }

    async fn create_generation(&self, label: &str) -> Result<(), Error> {
        CacheDb::create_generation(self, label).await
    }

    async fn mark_generation_waiting(&self, label: &str) -> Result<(), Error> {
        CacheDb::mark_generation_waiting(self, label).await
    }

    async fn activate_generation(&self, label: &str) -> Result<(), Error> {
        CacheDb::activate_generation(self, label).await
    }

    async fn current_generation(&self) -> Result<Option<String>, Error> {
        CacheDb::current_generation(self).await
    }

    async fn generation_state(&self, label: &str) -> Result<Option<GenerationState>, Error> {
        CacheDb::generation_state(self, label).await
    }
}
