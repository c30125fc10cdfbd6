//! Inbound operations.
//!
//! A [`Session`] binds a [`RemoteClient`] to a [`ContextCache`] for one
//! invocation. Every operation resolves its address first, so a missing
//! identifier fails before any network call. The cache is written only once
//! the remote has confirmed the address.

use std::ops::ControlFlow;

use jobscope_proto::{Address, Entity, EntityKind, JobAddress, StreamKind, StreamMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::context::{ContextBackend, ContextCache};
use crate::error::{CoreError, Operation, Result};
use crate::paginate::{Page, PageWalker};
use crate::remote::RemoteClient;
use crate::resolver::{Resolver, Selector};
use crate::stream::{StreamOutcome, consume};

/// A client and a cache used together.
#[derive(Debug)]
pub struct Session<'a, C, B> {
    client: &'a mut C,
    cache: &'a ContextCache<B>,
}

impl<'a, C, B> Session<'a, C, B>
where
    C: RemoteClient,
    B: ContextBackend,
{
    /// Create a session.
    #[must_use]
    pub const fn new(client: &'a mut C, cache: &'a ContextCache<B>) -> Self {
        Self { client, cache }
    }

    /// Resolve a selector without contacting the remote.
    ///
    /// # Errors
    ///
    /// See [`Resolver::resolve`].
    pub fn resolve(&self, kind: EntityKind, selector: &Selector) -> Result<Address> {
        Resolver::new(self.cache).resolve(kind, selector)
    }

    /// Fetch one entity and remember its address.
    ///
    /// # Errors
    ///
    /// Returns a resolution error or the remote failure.
    pub async fn get(&mut self, kind: EntityKind, selector: &Selector) -> Result<(Address, Entity)> {
        let address = self.resolve(kind, selector)?;
        let entity = self
            .client
            .fetch_one(&address)
            .await
            .map_err(|e| CoreError::remote(Operation::Get, address.clone(), e))?;

        remember(self.cache, &address);
        Ok((address, entity))
    }

    /// Fetch the first status page and return a walker for the rest.
    ///
    /// The address is remembered once the first page arrives.
    ///
    /// # Errors
    ///
    /// Returns a resolution error or the first-page failure.
    pub async fn statuses(
        &mut self,
        kind: EntityKind,
        selector: &Selector,
    ) -> Result<(Page, PageWalker<'_, C>)> {
        let address = self.resolve(kind, selector)?;
        let cache = self.cache;

        let mut walker = PageWalker::new(&mut *self.client, address);
        let first = walker.first_page().await?;
        remember(cache, walker.address());
        Ok((first, walker))
    }

    /// Stream a job's log lines until the stream ends or is cancelled.
    ///
    /// # Errors
    ///
    /// Returns a resolution error, the subscription failure, or
    /// [`CoreError::StreamInterrupted`].
    pub async fn logs<F>(
        &mut self,
        selector: &Selector,
        cancel: &CancellationToken,
        on_message: F,
    ) -> Result<StreamOutcome>
    where
        F: FnMut(StreamMessage) -> ControlFlow<()>,
    {
        self.stream(StreamKind::Logs, selector, cancel, on_message)
            .await
    }

    /// Stream a job's resource samples until the stream ends or is cancelled.
    ///
    /// # Errors
    ///
    /// Returns a resolution error, the subscription failure, or
    /// [`CoreError::StreamInterrupted`].
    pub async fn resources<F>(
        &mut self,
        selector: &Selector,
        cancel: &CancellationToken,
        on_message: F,
    ) -> Result<StreamOutcome>
    where
        F: FnMut(StreamMessage) -> ControlFlow<()>,
    {
        self.stream(StreamKind::Resources, selector, cancel, on_message)
            .await
    }

    async fn stream<F>(
        &mut self,
        kind: StreamKind,
        selector: &Selector,
        cancel: &CancellationToken,
        mut on_message: F,
    ) -> Result<StreamOutcome>
    where
        F: FnMut(StreamMessage) -> ControlFlow<()>,
    {
        let address = self.resolve(EntityKind::Job, selector)?;
        let job = job_of(&address)?;

        let (operation, opened) = match kind {
            StreamKind::Logs => (Operation::Logs, self.client.open_log_stream(&job).await),
            StreamKind::Resources => (
                Operation::Resources,
                self.client.open_metric_stream(&job).await,
            ),
        };
        let stream = opened.map_err(|e| CoreError::remote(operation, job.clone(), e))?;
        debug!(%address, %kind, "stream opened");

        let cache = self.cache;
        let mut confirmed = false;
        consume(stream, cancel, |message| {
            if !confirmed {
                confirmed = true;
                remember(cache, &address);
            }
            on_message(message)
        })
        .await
    }
}

fn job_of(address: &Address) -> Result<JobAddress> {
    address
        .job()
        .cloned()
        .ok_or_else(|| CoreError::InvalidAddress(format!("`{address}` is not a job")))
}

fn remember<B: ContextBackend>(cache: &ContextCache<B>, address: &Address) {
    if let Err(e) = cache.remember(address) {
        warn!(%address, error = %e, "failed to update context cache");
    }
}
