//! Client side of holdfast.
//!
//! This crate provides the live transport and the interception engine that
//! decides, per request, whether to answer from the store, the network, or an
//! offline placeholder.

pub mod classify;
pub mod engine;
pub mod fallback;
pub mod fetch;
pub mod lifecycle;
pub mod policy;
pub mod request;
pub mod strategy;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{Classifier, RoutingClass};
pub use engine::Engine;
pub use fallback::Synthesizer;
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Transport};
pub use lifecycle::{ActivationReport, ActiveGeneration, InstallReport, LifecycleManager, LifecycleState};
pub use policy::CachePolicy;
pub use request::{InterceptedRequest, Response, Source};
pub use strategy::Executor;
pub use sync::{NoopQueue, OutboundQueue, PENDING_MESSAGES};
