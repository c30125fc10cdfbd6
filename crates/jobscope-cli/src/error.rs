//! CLI error types.

use jobscope_core::{CacheError, CoreError};
use thiserror::Error;

/// Exit code for remote and stream failures.
pub const EXIT_REMOTE: u8 = 1;

/// Exit code for resolution, argument and configuration failures.
pub const EXIT_USAGE: u8 = 2;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// A core operation failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Core(e) if e.is_local() => EXIT_USAGE,
            Self::Config(_) => EXIT_USAGE,
            Self::Core(_) | Self::Format(_) | Self::Io(_) => EXIT_REMOTE,
        }
    }
}

impl From<CacheError> for CliError {
    fn from(err: CacheError) -> Self {
        Self::Core(err.into())
    }
}
