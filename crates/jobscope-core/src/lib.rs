//! # jobscope-core
//!
//! Resolution, context caching, pagination and stream consumption for the
//! jobscope CLI.
//!
//! - [`resolver`] - builds addresses from explicit and cached identifiers
//! - [`context`] - last-used project/experiment/job, persisted per kind
//! - [`remote`] - the client boundary to the tracking backend
//! - [`stream`] - pull loop over log and metric streams
//! - [`paginate`] - lazy walk over status pages
//! - [`session`] - the inbound operations, wiring the above together
//!
//! ## Example
//!
//! ```rust
//! use jobscope_core::{ContextCache, ExplicitParts, Resolver};
//! use jobscope_proto::{EntityKind, ProjectRef};
//!
//! let cache = ContextCache::in_memory();
//! let parts = ExplicitParts::none()
//!     .with_project(ProjectRef::new("adam", "mnist").unwrap())
//!     .with_experiment(3);
//!
//! let address = Resolver::new(&cache)
//!     .resolve(EntityKind::Experiment, &parts.into())
//!     .unwrap();
//! assert_eq!(address.to_string(), "adam/mnist/3");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod error;
pub mod paginate;
pub mod remote;
pub mod resolver;
pub mod session;
pub mod stream;

pub use context::{
    ContextBackend, ContextCache, ContextSnapshot, ContextValue, FileBackend, MemoryBackend,
};
pub use error::{CacheError, CoreError, Operation, RemoteError, Result};
pub use paginate::{Page, PageWalker};
pub use remote::{MessageStream, RemoteClient};
pub use resolver::{ExplicitParts, Resolver, Selector};
pub use session::Session;
pub use stream::{StreamOutcome, consume};
pub use tokio_util::sync::CancellationToken;
