//! Unified error types for holdfast.
//!
//! The first four variants are the engine's routing taxonomy; the rest are
//! infrastructure failures from the store, configuration or input parsing.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type shared by the store, the engine and the server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport failure or a non-success HTTP status.
    #[error("NETWORK_UNAVAILABLE: {0}")]
    NetworkUnavailable(String),

    /// No snapshot stored for the fingerprint.
    #[error("STORE_MISS: {0}")]
    StoreMiss(String),

    /// A static asset could not be fetched or stored during install.
    #[error("INSTALL_POPULATION_FAILED: {asset}: {reason}")]
    InstallPopulationFailed { asset: String, reason: String },

    /// Response is not eligible for persistence. Callers treat this as a no-op.
    #[error("UNPERSISTABLE: {0}")]
    Unpersistable(String),

    /// A lifecycle signal arrived in a state that cannot accept it.
    #[error("INVALID_TRANSITION: {0}")]
    InvalidTransition(String),

    /// Invalid input parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Whether the error is one the engine absorbs by serving from the store or a fallback.
    pub fn is_offline(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(format!("json: {err}"))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::NetworkUnavailable(msg) => (-32000, msg.clone()),
            Error::StoreMiss(msg) => (-32001, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::InstallPopulationFailed { .. } => (-32004, err.to_string()),
            Error::Unpersistable(msg) => (-32005, msg.clone()),
            Error::InvalidTransition(msg) => (-32006, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
