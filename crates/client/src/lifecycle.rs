//! Store generation lifecycle: install, activate, evict.
//!
//! ```text
//! Idle -> Installing -> Waiting -> Active -> Superseded
//!              \
//!               -> Failed
//! ```
//!
//! Install fetches every static asset before touching the store and writes
//! them in one batch, so a failed install leaves no partial generation and the
//! previous current generation keeps serving. Activation swaps the
//! process-wide [`ActiveGeneration`] and then destroys every other generation.

use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::fetch::Transport;
use crate::policy::CachePolicy;
use crate::request::InterceptedRequest;
use crate::strategy::snapshot_of;
use holdfast_core::{Error, GenerationState, SnapshotStore, StoredSnapshot};

/// Process-wide handle to the label of the current generation.
///
/// Cloned into every component that reads or writes snapshots; swapping the
/// label switches all of them at once.
#[derive(Debug, Clone, Default)]
pub struct ActiveGeneration(Arc<RwLock<Option<String>>>);

impl ActiveGeneration {
    pub async fn get(&self) -> Option<String> {
        self.0.read().await.clone()
    }

    pub async fn set(&self, label: Option<String>) {
        *self.0.write().await = label;
    }
}

/// Lifecycle state of this deployment's generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Installing,
    Waiting,
    Active,
    Superseded,
    Failed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Installing => "installing",
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Superseded => "superseded",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    pub label: String,
    /// Snapshots written
    pub assets: usize,
    /// The label was already active and was re-populated in place.
    pub in_place: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationReport {
    pub current: String,
    pub evicted: Vec<String>,
}

/// Owns generation creation and destruction for one deployment version.
pub struct LifecycleManager {
    store: Arc<dyn SnapshotStore>,
    transport: Arc<dyn Transport>,
    active: ActiveGeneration,
    policy: Arc<CachePolicy>,
    version: String,
    assets: Vec<String>,
    state: RwLock<LifecycleState>,
    /// Serializes install and activate.
    transition: Mutex<()>,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn SnapshotStore>, transport: Arc<dyn Transport>, active: ActiveGeneration,
        policy: Arc<CachePolicy>, version: impl Into<String>, assets: Vec<String>,
    ) -> Self {
        Self {
            store,
            transport,
            active,
            policy,
            version: version.into(),
            assets,
            state: RwLock::new(LifecycleState::Idle),
            transition: Mutex::new(()),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    async fn set_state(&self, state: LifecycleState) {
        *self.state.write().await = state;
    }

    /// Adopt the store's persisted current generation.
    pub async fn restore(&self) -> Result<Option<String>, Error> {
        let current = self.store.current_generation().await?;
        self.active.set(current.clone()).await;
        if current.as_deref() == Some(self.version.as_str()) {
            self.set_state(LifecycleState::Active).await;
        }
        tracing::info!(current = ?current, version = %self.version, "restored current generation");
        Ok(current)
    }

    /// Re-check whether this deployment's generation is still current.
    pub async fn observe(&self) -> Result<LifecycleState, Error> {
        let current = self.store.current_generation().await?;
        let mut state = self.state.write().await;
        if *state == LifecycleState::Active && current.as_deref() != Some(self.version.as_str()) {
            tracing::info!(version = %self.version, current = ?current, "generation superseded");
            *state = LifecycleState::Superseded;
        }
        Ok(*state)
    }

    /// Create and populate this version's generation.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let _guard = self.transition.lock().await;
        self.install_locked().await
    }

    /// Make this version's generation current and evict every other one.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let _guard = self.transition.lock().await;
        self.activate_locked().await
    }

    /// Install followed immediately by activation.
    pub async fn deploy(&self) -> Result<ActivationReport, Error> {
        let _guard = self.transition.lock().await;
        self.install_locked().await?;
        self.activate_locked().await
    }

    async fn install_locked(&self) -> Result<InstallReport, Error> {
        let previous = self.state().await;
        self.set_state(LifecycleState::Installing).await;
        tracing::info!(version = %self.version, assets = self.assets.len(), "installing generation");

        match self.populate().await {
            Ok(report) => {
                let next = if report.in_place { LifecycleState::Active } else { LifecycleState::Waiting };
                self.set_state(next).await;
                tracing::info!(version = %self.version, assets = report.assets, in_place = report.in_place, "generation installed");
                Ok(report)
            }
            Err(err) => {
                // A failed in-place refresh leaves the live generation untouched.
                let next = if previous == LifecycleState::Active { LifecycleState::Active } else { LifecycleState::Failed };
                self.set_state(next).await;
                tracing::error!(version = %self.version, error = %err, state = next.as_str(), "install failed");
                Err(err)
            }
        }
    }

    async fn populate(&self) -> Result<InstallReport, Error> {
        let snapshots = self.fetch_assets().await?;

        let existing = self.store.generation_state(&self.version).await?;
        let in_place = existing == Some(GenerationState::Active);
        match existing {
            Some(GenerationState::Active) => {}
            Some(state) => {
                tracing::debug!(version = %self.version, state = %state, "discarding leftover generation");
                self.store.delete_generation(&self.version).await?;
                self.store.create_generation(&self.version).await?;
            }
            None => self.store.create_generation(&self.version).await?,
        }

        if let Err(err) = self.write(&snapshots, in_place).await {
            if !in_place && let Err(cleanup) = self.store.delete_generation(&self.version).await {
                tracing::warn!(version = %self.version, error = %cleanup, "failed to discard partial generation");
            }
            return Err(err);
        }

        Ok(InstallReport { label: self.version.clone(), assets: snapshots.len(), in_place })
    }

    async fn write(&self, snapshots: &[StoredSnapshot], in_place: bool) -> Result<(), Error> {
        self.store.put_snapshots(snapshots).await?;
        if !in_place {
            self.store.mark_generation_waiting(&self.version).await?;
        }
        Ok(())
    }

    /// Fetch every asset concurrently; the first failure fails them all.
    async fn fetch_assets(&self) -> Result<Vec<StoredSnapshot>, Error> {
        let requests = self
            .assets
            .iter()
            .map(|asset| {
                self.policy
                    .resolve(asset)
                    .map(InterceptedRequest::get)
                    .map_err(|e| population_failed(asset, &e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        try_join_all(requests.iter().map(|request| async move {
            let live = self
                .transport
                .send(request)
                .await
                .map_err(|e| population_failed(request.url.as_str(), &e))?;
            self.policy
                .check_persistable(request, &live)
                .map_err(|e| population_failed(request.url.as_str(), &e))?;
            Ok::<_, Error>(snapshot_of(&self.version, self.policy.fingerprint(request), request, &live))
        }))
        .await
    }

    async fn activate_locked(&self) -> Result<ActivationReport, Error> {
        match self.store.generation_state(&self.version).await? {
            Some(GenerationState::Waiting | GenerationState::Active) => {}
            Some(GenerationState::Installing) => {
                return Err(Error::InvalidTransition(format!("generation {} is still installing", self.version)));
            }
            None => {
                return Err(Error::InvalidTransition(format!("generation {} is not installed", self.version)));
            }
        }

        self.store.activate_generation(&self.version).await?;
        self.active.set(Some(self.version.clone())).await;
        self.set_state(LifecycleState::Active).await;
        tracing::info!(version = %self.version, "generation activated");

        let mut evicted = Vec::new();
        for label in self.store.list_generations().await? {
            if label != self.version && self.store.delete_generation(&label).await? {
                tracing::info!(label = %label, "evicted generation");
                evicted.push(label);
            }
        }

        Ok(ActivationReport { current: self.version.clone(), evicted })
    }
}

fn population_failed(asset: &str, err: &Error) -> Error {
    Error::InstallPopulationFailed { asset: asset.to_string(), reason: err.to_string() }
}
