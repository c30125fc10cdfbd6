//! # jobscope-cli
//!
//! Command-line interface for inspecting remote projects, experiments and
//! jobs.
//!
//! Provides commands for:
//! - Project, experiment and job details
//! - Paginated status listings
//! - Following job logs and resource usage
//! - Inspecting and clearing the cached context
//!
//! # Architecture
//!
//! The CLI connects to a tracking gateway via WebSocket using the protocol
//! defined in `jobscope-proto::api`. The [`client::GatewayClient`] implements
//! the `jobscope-core` remote client boundary; resolution, caching, paging
//! and streaming live in `jobscope-core`.
//!
//! ```text
//! ┌──────────────┐     API Protocol      ┌─────────────────┐
//! │ jobscope-cli │◄─────────────────────►│     gateway     │
//! └──────────────┘     (WebSocket)       └─────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format};
pub use client::GatewayClient;
pub use config::CliConfig;
pub use error::CliError;
pub use output::OutputFormat;
