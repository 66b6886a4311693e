//! Background sync hook for queued outbound mutations.

use async_trait::async_trait;

use holdfast_core::Error;

/// Tag the hosting application registers for pending message delivery.
pub const PENDING_MESSAGES: &str = "sync-pending-messages";

/// Durable queue of mutations that failed while offline.
///
/// The engine only forwards background-sync signals; storing and replaying
/// requests is up to the implementation.
#[async_trait]
pub trait OutboundQueue: Send + Sync {
    /// Replay everything queued under `tag`. Returns how many requests were delivered.
    async fn drain(&self, tag: &str) -> Result<usize, Error>;
}

/// Queue that holds nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopQueue;

#[async_trait]
impl OutboundQueue for NoopQueue {
    async fn drain(&self, tag: &str) -> Result<usize, Error> {
        tracing::info!(tag, "background sync requested, no outbound queue configured");
        Ok(0)
    }
}
