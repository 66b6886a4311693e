//! Core types and shared functionality for holdfast.
//!
//! This crate provides:
//! - The versioned snapshot store with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, Fingerprint, GenerationInfo, GenerationState, SnapshotStore, StoredSnapshot};
pub use config::{AppConfig, ConfigError, FallbackConfig};
pub use error::Error;
