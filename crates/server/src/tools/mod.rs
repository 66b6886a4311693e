//! MCP tool implementations.
//!
//! This module contains all tools exposed by the holdfast server.

pub mod cache;
pub mod intercept;
pub mod lifecycle;
pub mod sync;

pub use intercept::InterceptParams;
pub use sync::BackgroundSyncParams;
