//! The interception engine: classifier, executor and lifecycle behind one handle.

use std::sync::Arc;

use url::Url;

use crate::classify::{Classifier, RoutingClass};
use crate::fallback::Synthesizer;
use crate::fetch::Transport;
use crate::lifecycle::{ActivationReport, ActiveGeneration, InstallReport, LifecycleManager, LifecycleState};
use crate::policy::CachePolicy;
use crate::request::{InterceptedRequest, Response};
use crate::strategy::Executor;
use crate::sync::{NoopQueue, OutboundQueue};
use holdfast_core::{AppConfig, Error, Fingerprint, SnapshotStore, StoredSnapshot};

/// Entry point for the hosting application.
pub struct Engine {
    classifier: Classifier,
    policy: Arc<CachePolicy>,
    executor: Executor,
    lifecycle: LifecycleManager,
    queue: Arc<dyn OutboundQueue>,
    store: Arc<dyn SnapshotStore>,
    active: ActiveGeneration,
}

impl Engine {
    /// Build an engine for `config`. Nothing is installed until [`Engine::deploy`]
    /// or [`Engine::install`] runs.
    pub fn new(config: &AppConfig, store: Arc<dyn SnapshotStore>, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        let classifier = Classifier::from_config(config)?;
        let policy = Arc::new(CachePolicy::from_config(config)?);
        let entry_page = policy.resolve(&config.entry_page)?;
        let active = ActiveGeneration::default();

        let executor = Executor::new(
            store.clone(),
            transport.clone(),
            active.clone(),
            policy.clone(),
            Synthesizer::new(&config.fallback),
            entry_page,
        );
        let lifecycle = LifecycleManager::new(
            store.clone(),
            transport,
            active.clone(),
            policy.clone(),
            config.version.clone(),
            config.static_assets.clone(),
        );

        Ok(Self { classifier, policy, executor, lifecycle, queue: Arc::new(NoopQueue), store, active })
    }

    pub fn with_queue(mut self, queue: Arc<dyn OutboundQueue>) -> Self {
        self.queue = queue;
        self
    }

    pub fn classify(&self, request: &InterceptedRequest) -> RoutingClass {
        self.classifier.classify(&request.method, &request.url, request.navigate)
    }

    /// Answer an intercepted request. Never fails; the worst case is a placeholder.
    pub async fn intercept(&self, request: &InterceptedRequest) -> Response {
        let class = self.classify(request);
        let response = self.executor.execute(class, request).await;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            class = %class,
            status = response.status.as_u16(),
            source = ?response.source,
            "intercepted"
        );
        response
    }

    pub async fn restore(&self) -> Result<Option<String>, Error> {
        self.lifecycle.restore().await
    }

    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.lifecycle.install().await
    }

    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        self.lifecycle.activate().await
    }

    pub async fn deploy(&self) -> Result<ActivationReport, Error> {
        self.lifecycle.deploy().await
    }

    pub async fn lifecycle_state(&self) -> Result<LifecycleState, Error> {
        self.lifecycle.observe().await
    }

    pub fn version(&self) -> &str {
        self.lifecycle.version()
    }

    pub async fn current_generation(&self) -> Option<String> {
        self.active.get().await
    }

    /// Forward a background-sync signal to the outbound queue.
    pub async fn background_sync(&self, tag: &str) -> Result<usize, Error> {
        let drained = self.queue.drain(tag).await?;
        tracing::debug!(tag, drained, "background sync complete");
        Ok(drained)
    }

    /// Resolve a reference against the application origin.
    pub fn resolve(&self, reference: &str) -> Result<Url, Error> {
        self.policy.resolve(reference)
    }

    pub fn fingerprint(&self, request: &InterceptedRequest) -> Fingerprint {
        self.policy.fingerprint(request)
    }

    /// Read a snapshot from the current generation.
    pub async fn snapshot(&self, fingerprint: &Fingerprint) -> Result<StoredSnapshot, Error> {
        let generation = self
            .active
            .get()
            .await
            .ok_or_else(|| Error::StoreMiss("no active generation".into()))?;
        self.store
            .get_snapshot(&generation, fingerprint)
            .await?
            .ok_or_else(|| Error::StoreMiss(fingerprint.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Source;
    use crate::sync::PENDING_MESSAGES;
    use crate::testing::{Fixture, api_url, test_config, url};
    use async_trait::async_trait;
    use reqwest::{Method, StatusCode};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn engine(f: &Fixture) -> Engine {
        Engine::new(&test_config(), f.store.clone(), f.transport.clone()).unwrap()
    }

    fn serve_static(f: &Fixture) {
        for asset in &test_config().static_assets {
            f.transport.route(&f.asset_url(asset), &format!("<p>{asset}</p>"));
        }
    }

    #[tokio::test]
    async fn test_online_then_offline_api_read() {
        let f = Fixture::new().await;
        serve_static(&f);
        let engine = engine(&f).await;
        engine.deploy().await.unwrap();

        let data = api_url("?op=getData");
        f.transport.route(&data, r#"{"comments":[{"text":"hi"}],"announcements":[]}"#);
        let request = InterceptedRequest::get(url(&data));

        let online = engine.intercept(&request).await;
        assert_eq!(online.source, Source::Network);

        f.transport.set_offline(true);
        let offline = engine.intercept(&request).await;
        assert_eq!(offline.source, Source::Store);
        assert_eq!(offline.body, online.body);
    }

    #[tokio::test]
    async fn test_offline_api_read_without_snapshot() {
        let f = Fixture::new().await;
        serve_static(&f);
        let engine = engine(&f).await;
        engine.deploy().await.unwrap();
        f.transport.set_offline(true);

        let response = engine.intercept(&InterceptedRequest::get(url(&api_url("?op=getData")))).await;
        assert_eq!(response.status, StatusCode::OK);
        let body = response.json().unwrap();
        assert_eq!(body["offline"], json!(true));
        assert_eq!(body["comments"], json!([]));
    }

    #[tokio::test]
    async fn test_offline_post_is_rejected_without_store_access() {
        let f = Fixture::new().await;
        serve_static(&f);
        let engine = engine(&f).await;
        engine.deploy().await.unwrap();
        f.transport.set_offline(true);
        let (reads, writes) = (f.store.reads(), f.store.writes());

        let request = InterceptedRequest::new(Method::POST, url(&api_url("?op=postComment"))).with_body("{}");
        let response = engine.intercept(&request).await;

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.json().unwrap()["offline"], json!(true));
        assert_eq!(f.store.reads(), reads);
        assert_eq!(f.store.writes(), writes);
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_installed_shell() {
        let f = Fixture::new().await;
        serve_static(&f);
        let engine = engine(&f).await;
        engine.deploy().await.unwrap();
        f.transport.set_offline(true);

        let response = engine.intercept(&InterceptedRequest::navigation(url(&f.asset_url("/")))).await;
        assert_eq!(response.source, Source::Store);
        assert_eq!(response.text(), "<p>/</p>");

        let response = engine.intercept(&InterceptedRequest::navigation(url(&f.asset_url("/chat")))).await;
        assert_eq!(response.text(), "<p>/index.html</p>");
    }

    #[tokio::test]
    async fn test_offline_navigation_before_install() {
        let f = Fixture::new().await;
        f.transport.set_offline(true);
        let engine = engine(&f).await;

        let response = engine.intercept(&InterceptedRequest::navigation(url(&f.asset_url("/")))).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.source, Source::Fallback);
    }

    #[tokio::test]
    async fn test_deploy_leaves_one_generation() {
        let f = Fixture::new().await;
        f.activate("holdfast-v0").await;
        serve_static(&f);
        let engine = engine(&f).await;
        engine.restore().await.unwrap();

        let report = engine.deploy().await.unwrap();
        assert_eq!(report.evicted, vec!["holdfast-v0".to_string()]);
        assert_eq!(f.db.list_generations().await.unwrap(), vec![engine.version().to_string()]);
        assert_eq!(engine.current_generation().await.as_deref(), Some(engine.version()));
    }

    #[tokio::test]
    async fn test_snapshot_lookup() {
        let f = Fixture::new().await;
        serve_static(&f);
        let engine = engine(&f).await;

        let index = InterceptedRequest::get(engine.resolve("/index.html").unwrap());
        let fingerprint = engine.fingerprint(&index);
        assert!(matches!(engine.snapshot(&fingerprint).await, Err(Error::StoreMiss(_))));

        engine.deploy().await.unwrap();
        let snapshot = engine.snapshot(&fingerprint).await.unwrap();
        assert_eq!(snapshot.body, b"<p>/index.html</p>");

        let missing = Fingerprint::compute("GET", "https://app.example.com/nope", &[]);
        assert!(matches!(engine.snapshot(&missing).await, Err(Error::StoreMiss(_))));
    }

    struct CountingQueue(AtomicUsize);

    #[async_trait]
    impl OutboundQueue for CountingQueue {
        async fn drain(&self, _tag: &str) -> Result<usize, Error> {
            Ok(self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    #[tokio::test]
    async fn test_background_sync_reaches_queue() {
        let f = Fixture::new().await;
        let engine = engine(&f).await;
        assert_eq!(engine.background_sync(PENDING_MESSAGES).await.unwrap(), 0);

        let engine = engine.with_queue(Arc::new(CountingQueue(AtomicUsize::new(0))));
        assert_eq!(engine.background_sync(PENDING_MESSAGES).await.unwrap(), 1);
        assert_eq!(engine.background_sync(PENDING_MESSAGES).await.unwrap(), 2);
    }
}
