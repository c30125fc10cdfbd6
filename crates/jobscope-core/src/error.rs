//! Error types for resolution, caching and remote operations.

use std::fmt;
use std::path::PathBuf;

use jobscope_proto::{Address, EntityKind};
use thiserror::Error;

/// Inbound operation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Single entity lookup.
    Get,
    /// Paginated status listing.
    Statuses,
    /// Log stream.
    Logs,
    /// Resource metric stream.
    Resources,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("get"),
            Self::Statuses => f.write_str("list statuses for"),
            Self::Logs => f.write_str("stream logs for"),
            Self::Resources => f.write_str("stream resources for"),
        }
    }
}

/// Failure reported by a [`RemoteClient`](crate::remote::RemoteClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Transport-level failure (timeout, refused connection, broken socket).
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The entity exists but the caller may not access it.
    #[error("forbidden: {0}")]
    Forbidden(String),
}

/// Errors from the local context cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A slot holds a value of the wrong kind.
    #[error("cached {kind} at {} is corrupt: {reason}", .path.display())]
    Corrupt {
        /// Slot that was read.
        kind: EntityKind,
        /// Backing location.
        path: PathBuf,
        /// What was wrong.
        reason: String,
    },
}

/// Errors surfaced by core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A required address part was neither given nor cached.
    #[error("no {0} given and none cached from a previous command")]
    UnresolvedContext(EntityKind),

    /// The supplied parts cannot form an address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Transport failure talking to the remote.
    #[error("could not {operation} `{target}`: remote unavailable: {reason}")]
    RemoteUnavailable {
        /// Failing operation.
        operation: Operation,
        /// Address the operation targeted.
        target: Address,
        /// Transport detail.
        reason: String,
    },

    /// The remote reports the entity does not exist.
    #[error("could not {operation} `{target}`: not found: {message}")]
    NotFound {
        /// Failing operation.
        operation: Operation,
        /// Address the operation targeted.
        target: Address,
        /// Remote message.
        message: String,
    },

    /// The remote refuses access to the entity.
    #[error("could not {operation} `{target}`: access denied: {message}")]
    Forbidden {
        /// Failing operation.
        operation: Operation,
        /// Address the operation targeted.
        target: Address,
        /// Remote message.
        message: String,
    },

    /// The stream broke after some messages were delivered.
    #[error("stream interrupted after {delivered} message(s): {reason}")]
    StreamInterrupted {
        /// Messages handed to the caller before the break.
        delivered: u64,
        /// Transport detail.
        reason: String,
    },

    /// The context cache could not be read.
    #[error("context cache error: {0}")]
    Cache(#[from] CacheError),
}

impl CoreError {
    /// Attach operation and address context to a remote failure.
    #[must_use]
    pub fn remote(operation: Operation, target: impl Into<Address>, err: RemoteError) -> Self {
        let target = target.into();
        match err {
            RemoteError::Unavailable(reason) => Self::RemoteUnavailable {
                operation,
                target,
                reason,
            },
            RemoteError::NotFound(message) => Self::NotFound {
                operation,
                target,
                message,
            },
            RemoteError::Forbidden(message) => Self::Forbidden {
                operation,
                target,
                message,
            },
        }
    }

    /// Returns true for failures raised before any network call.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedContext(_) | Self::InvalidAddress(_) | Self::Cache(_)
        )
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
