//! Per-class retrieval strategies.
//!
//! | class             | strategy                                  | full failure        |
//! |-------------------|-------------------------------------------|---------------------|
//! | `RemoteApiRead`   | cache-first, revalidate in background     | JSON placeholder    |
//! | `RemoteApiWrite`  | network only, store untouched             | 503 JSON rejection  |
//! | `Navigation`      | network first, then snapshot, entry page  | inline HTML shell   |
//! | `StaticResource`  | cache-first, revalidate in background     | empty 503           |
//!
//! Every path ends in a [`Response`]. Store errors are logged and treated as
//! a miss or a dropped write.

use std::sync::Arc;

use tokio::task::JoinHandle;
use url::Url;

use crate::classify::RoutingClass;
use crate::fallback::Synthesizer;
use crate::fetch::{FetchResponse, Transport};
use crate::lifecycle::ActiveGeneration;
use crate::policy::CachePolicy;
use crate::request::{InterceptedRequest, Response};
use holdfast_core::{Fingerprint, SnapshotStore, StoredSnapshot};

/// Runs the retrieval strategy for a classified request.
#[derive(Clone)]
pub struct Executor {
    store: Arc<dyn SnapshotStore>,
    transport: Arc<dyn Transport>,
    active: ActiveGeneration,
    policy: Arc<CachePolicy>,
    synthesizer: Arc<Synthesizer>,
    entry_page: Url,
}

impl Executor {
    pub fn new(
        store: Arc<dyn SnapshotStore>, transport: Arc<dyn Transport>, active: ActiveGeneration,
        policy: Arc<CachePolicy>, synthesizer: Synthesizer, entry_page: Url,
    ) -> Self {
        Self { store, transport, active, policy, synthesizer: Arc::new(synthesizer), entry_page }
    }

    pub async fn execute(&self, class: RoutingClass, request: &InterceptedRequest) -> Response {
        match class {
            RoutingClass::RemoteApiRead => self.api_read(request).await,
            RoutingClass::RemoteApiWrite => self.network_only(class, request).await,
            RoutingClass::Navigation => self.navigation(request).await,
            RoutingClass::StaticResource => self.cache_first(class, request).await,
        }
    }

    async fn api_read(&self, request: &InterceptedRequest) -> Response {
        if !self.policy.api_cacheable(&request.url) {
            tracing::debug!(url = %request.url, "api read outside the allow-list, bypassing store");
            return self.network_only(RoutingClass::RemoteApiRead, request).await;
        }
        self.cache_first(RoutingClass::RemoteApiRead, request).await
    }

    async fn network_only(&self, class: RoutingClass, request: &InterceptedRequest) -> Response {
        match self.transport.send(request).await {
            Ok(live) => Response::from_live(live),
            Err(err) => {
                tracing::debug!(url = %request.url, class = %class, error = %err, "network failed, synthesizing");
                self.synthesizer.synthesize(class)
            }
        }
    }

    async fn navigation(&self, request: &InterceptedRequest) -> Response {
        let err = match self.transport.send(request).await {
            Ok(live) => return Response::from_live(live),
            Err(err) => err,
        };
        tracing::debug!(url = %request.url, error = %err, "navigation offline, trying store");

        if let Some(generation) = self.active.get().await {
            if request.is_read()
                && let Some(snapshot) = self.lookup(&generation, &self.policy.fingerprint(request)).await
            {
                return Response::from_snapshot(snapshot);
            }

            let entry = InterceptedRequest::get(self.entry_page.clone());
            if let Some(snapshot) = self.lookup(&generation, &self.policy.fingerprint(&entry)).await {
                return Response::from_snapshot(snapshot);
            }
        }

        self.synthesizer.synthesize(RoutingClass::Navigation)
    }

    async fn cache_first(&self, class: RoutingClass, request: &InterceptedRequest) -> Response {
        if !request.is_read() {
            return self.network_only(class, request).await;
        }

        let fingerprint = self.policy.fingerprint(request);
        let generation = self.active.get().await;

        if let Some(generation) = &generation
            && let Some(snapshot) = self.lookup(generation, &fingerprint).await
        {
            drop(self.revalidate(request.clone(), fingerprint, generation.clone()));
            return Response::from_snapshot(snapshot);
        }

        match self.transport.send(request).await {
            Ok(live) => {
                match &generation {
                    Some(generation) => self.persist(generation, &fingerprint, request, &live).await,
                    None => tracing::debug!(url = %request.url, "no active generation, not persisting"),
                }
                Response::from_live(live)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, class = %class, error = %err, "miss and offline, synthesizing");
                self.synthesizer.synthesize(class)
            }
        }
    }

    /// Refresh a snapshot in a detached task.
    ///
    /// The write targets `generation`, the one the snapshot was read from. If
    /// that generation is evicted before the fetch completes the write fails
    /// and is dropped. Failures never reach the caller; the handle exists so
    /// callers can wait for completion.
    pub fn revalidate(&self, request: InterceptedRequest, fingerprint: Fingerprint, generation: String) -> JoinHandle<()> {
        let executor = self.clone();
        tokio::spawn(async move {
            match executor.transport.send(&request).await {
                Ok(live) => executor.persist(&generation, &fingerprint, &request, &live).await,
                Err(err) => tracing::debug!(url = %request.url, error = %err, "revalidation failed"),
            }
        })
    }

    async fn lookup(&self, generation: &str, fingerprint: &Fingerprint) -> Option<StoredSnapshot> {
        match self.store.get_snapshot(generation, fingerprint).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(generation, fingerprint = %fingerprint, error = %err, "store read failed, treating as miss");
                None
            }
        }
    }

    async fn persist(
        &self, generation: &str, fingerprint: &Fingerprint, request: &InterceptedRequest, live: &FetchResponse,
    ) {
        if let Err(err) = self.policy.check_persistable(request, live) {
            tracing::debug!(url = %request.url, error = %err, "response not stored");
            return;
        }

        let snapshot = snapshot_of(generation, fingerprint.clone(), request, live);
        if let Err(err) = self.store.put_snapshot(&snapshot).await {
            tracing::warn!(generation, url = %request.url, error = %err, "store write failed, dropping");
        }
    }
}

/// Capture a live response as a snapshot of `generation`.
pub fn snapshot_of(
    generation: &str, fingerprint: Fingerprint, request: &InterceptedRequest, live: &FetchResponse,
) -> StoredSnapshot {
    StoredSnapshot {
        fingerprint,
        generation: generation.to_string(),
        method: request.method.as_str().to_string(),
        url: request.url.to_string(),
        status: live.status.as_u16(),
        headers: live.header_pairs(),
        body: live.bytes.to_vec(),
        stored_at: chrono::Utc::now().to_rfc3339(),
    }
}
