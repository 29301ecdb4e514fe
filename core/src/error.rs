//! Error types for the portclaim-core library.

use thiserror::Error;

/// Result type alias for portclaim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring the registry or claiming ports.
#[derive(Error, Debug)]
pub enum Error {
    /// Heartbeat interval is negative.
    #[error("invalid heartbeat: required >= 0 (got {0})")]
    InvalidHeartbeat(i64),

    /// A range bound is out of `1..=65535` or `to < from`.
    #[error("invalid port range: {0}")]
    InvalidRange(String),

    /// A preferred port is out of `1..=65535`.
    #[error("invalid port: required > 0 and < 65536 (got {0})")]
    InvalidPort(i64),

    /// Every candidate port was busy.
    #[error("no free port available")]
    NoFreePort,

    /// A release target or claim name that cannot identify anything.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A claim was issued outside of a current-thread tokio runtime.
    #[error("claim requires a running current-thread tokio runtime")]
    NoRuntime,

    /// The registry was dropped before the claim resolved.
    #[error("port registry closed")]
    Closed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true for errors raised by input validation, before any probing.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidHeartbeat(_)
                | Error::InvalidRange(_)
                | Error::InvalidPort(_)
                | Error::InvalidArgument(_)
        )
    }
}
