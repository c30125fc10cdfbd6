//! # jobscope-proto
//!
//! Data model and gateway protocol for jobscope.
//!
//! - [`types`] - entity kinds, addresses, remote records, pages and stream messages
//! - [`api`] - request/response messages exchanged with the gateway

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod error;
pub mod types;

pub use api::{API_PROTOCOL_VERSION, ApiRequest, ApiResponse, error_codes};
pub use error::ProtoError;
pub use types::{
    Address, Cursor, Entity, EntityKind, EntityStatus, JobAddress, JobRef, PageMeta, ProjectRef,
    ResponsePage, StreamKind, StreamMessage,
};
