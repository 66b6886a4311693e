//! Test doubles: a scripted transport and a call-counting store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::fallback::Synthesizer;
use crate::fetch::{FetchResponse, Transport};
use crate::lifecycle::{ActiveGeneration, LifecycleManager};
use crate::policy::CachePolicy;
use crate::request::InterceptedRequest;
use crate::strategy::{Executor, snapshot_of};
use holdfast_core::{AppConfig, CacheDb, Error, Fingerprint, GenerationState, SnapshotStore, StoredSnapshot};

pub(crate) const ORIGIN: &str = "https://app.example.com";

pub(crate) fn test_config() -> AppConfig {
    AppConfig { origin: ORIGIN.into(), api_base: format!("{ORIGIN}/api"), ..Default::default() }
}

pub(crate) fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

pub(crate) fn api_url(query: &str) -> String {
    format!("{ORIGIN}/api{query}")
}

struct Route {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// Transport answering from a fixed route table.
#[derive(Default)]
pub(crate) struct StubTransport {
    routes: Mutex<HashMap<String, Route>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubTransport {
    pub(crate) fn route(&self, target: &str, body: &str) {
        self.route_with(target, StatusCode::OK, &[], body);
    }

    pub(crate) fn route_with(&self, target: &str, status: StatusCode, headers: &[(&'static str, &'static str)], body: &str) {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        let route = Route { status, headers: map, body: Bytes::from(body.to_string()) };
        self.routes.lock().unwrap().insert(url(target).to_string(), route);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: &InterceptedRequest) -> Result<FetchResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::NetworkUnavailable("offline".into()));
        }

        let routes = self.routes.lock().unwrap();
        let route = routes
            .get(request.url.as_str())
            .ok_or_else(|| Error::NetworkUnavailable(format!("no route for {}", request.url)))?;
        if !route.status.is_success() {
            return Err(Error::NetworkUnavailable(format!("status {}", route.status.as_u16())));
        }

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status: route.status,
            content_type: None,
            bytes: route.body.clone(),
            headers: route.headers.clone(),
            fetch_ms: 0,
        })
    }
}

/// [`CacheDb`] wrapper counting snapshot reads and writes, with an optional failure switch.
pub(crate) struct RecordingStore {
    db: CacheDb,
    reads: AtomicUsize,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingStore {
    pub(crate) fn new(db: CacheDb) -> Self {
        Self { db, reads: AtomicUsize::new(0), writes: AtomicUsize::new(0), failing: AtomicBool::new(false) }
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make snapshot reads and writes fail.
    pub(crate) fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::InvalidInput("store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for RecordingStore {
    async fn get_snapshot(&self, generation: &str, fingerprint: &Fingerprint) -> Result<Option<StoredSnapshot>, Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.db.get_snapshot(generation, fingerprint).await
    }

    async fn put_snapshot(&self, snapshot: &StoredSnapshot) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.db.upsert_snapshot(snapshot).await
    }

    async fn put_snapshots(&self, snapshots: &[StoredSnapshot]) -> Result<(), Error> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.db.upsert_snapshots(snapshots).await
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.db.list_generations().await
    }

    async fn delete_generation(&self, label: &str) -> Result<bool, Error> {
        self.db.delete_generation(label).await
    }

    async fn create_generation(&self, label: &str) -> Result<(), Error> {
        self.db.create_generation(label).await
    }

    async fn mark_generation_waiting(&self, label: &str) -> Result<(), Error> {
        self.db.mark_generation_waiting(label).await
    }

    async fn activate_generation(&self, label: &str) -> Result<(), Error> {
        self.db.activate_generation(label).await
    }

    async fn current_generation(&self) -> Result<Option<String>, Error> {
        self.db.current_generation().await
    }

    async fn generation_state(&self, label: &str) -> Result<Option<GenerationState>, Error> {
        self.db.generation_state(label).await
    }
}

/// In-memory store, stub transport and an executor wired to them.
pub(crate) struct Fixture {
    pub db: CacheDb,
    pub store: Arc<RecordingStore>,
    pub transport: Arc<StubTransport>,
    pub active: ActiveGeneration,
    pub policy: Arc<CachePolicy>,
    pub executor: Executor,
}

impl Fixture {
    pub(crate) async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub(crate) async fn with_config(config: AppConfig) -> Self {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = Arc::new(RecordingStore::new(db.clone()));
        let transport = Arc::new(StubTransport::default());
        let active = ActiveGeneration::default();
        let policy = Arc::new(CachePolicy::from_config(&config).unwrap());
        let entry_page = policy.resolve(&config.entry_page).unwrap();
        let executor = Executor::new(
            store.clone(),
            transport.clone(),
            active.clone(),
            policy.clone(),
            Synthesizer::new(&config.fallback),
            entry_page,
        );
        Self { db, store, transport, active, policy, executor }
    }

    pub(crate) fn asset_url(&self, path: &str) -> String {
        self.policy.resolve(path).unwrap().to_string()
    }

    /// Create `label` directly in the store and make it current.
    pub(crate) async fn activate(&self, label: &str) {
        self.db.create_generation(label).await.unwrap();
        self.db.mark_generation_waiting(label).await.unwrap();
        self.db.activate_generation(label).await.unwrap();
        self.active.set(Some(label.to_string())).await;
    }

    /// Write a 200 snapshot for a GET of `target` straight into the database.
    pub(crate) async fn seed(&self, generation: &str, target: &str, body: &str) {
        let request = InterceptedRequest::get(url(target));
        let live = FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status: StatusCode::OK,
            content_type: None,
            bytes: Bytes::from(body.to_string()),
            headers: HeaderMap::new(),
            fetch_ms: 0,
        };
        let snapshot = snapshot_of(generation, self.policy.fingerprint(&request), &request, &live);
        self.db.upsert_snapshot(&snapshot).await.unwrap();
    }

    pub(crate) fn lifecycle(&self, version: &str, assets: &[&str]) -> LifecycleManager {
        LifecycleManager::new(
            self.store.clone(),
            self.transport.clone(),
            self.active.clone(),
            self.policy.clone(),
            version,
            assets.iter().map(|a| a.to_string()).collect(),
        )
    }
}
