//! Error types for the route watcher.

use crate::types::LifecycleState;
use std::net::IpAddr;
use std::num::ParseIntError;
use thiserror::Error;

/// Error reported by a BGP engine implementation.
pub type EngineError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for watcher operations.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("cannot initialize without a BGP session configuration")]
    ConfigMissing,

    #[error("failed to start BGP session: {0}")]
    SessionStartFailed(#[source] EngineError),

    #[error("failed to add BGP neighbor {neighbor}: {source}")]
    NeighborAddFailed {
        neighbor: IpAddr,
        #[source]
        source: EngineError,
    },

    #[error("BGP engine failed to stop: {0}")]
    EngineStop(#[source] EngineError),

    #[error("invalid subscriber identity: {0:?}")]
    InvalidSubscriber(String),

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("failed to spawn background thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for WatchError {
    fn from(e: serde_json::Error) -> Self {
        WatchError::Config(e.to_string())
    }
}

/// A best-path record whose AS path is not a single decimal AS number.
///
/// Never leaves the watch loop: the offending path is logged and skipped.
#[derive(Debug, Error)]
pub enum PathDecodeError {
    /// Contains something other than ASCII digits, including signs.
    #[error("AS path {0:?} is not an unsigned decimal number")]
    NotDecimal(String),

    #[error("cannot decode AS path {as_path:?}: {source}")]
    Parse {
        as_path: String,
        #[source]
        source: ParseIntError,
    },
}

impl PathDecodeError {
    /// The AS path text that failed to decode.
    pub fn as_path(&self) -> &str {
        match self {
            PathDecodeError::NotDecimal(as_path) => as_path,
            PathDecodeError::Parse { as_path, .. } => as_path,
        }
    }
}

/// Result type for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;
