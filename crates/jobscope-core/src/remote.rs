//! Remote resource client boundary.
//!
//! The core talks to the tracking backend only through these traits. The CLI
//! provides a WebSocket implementation; tests provide scripted fakes.

use std::future::Future;

use jobscope_proto::{Address, Cursor, Entity, JobAddress, ResponsePage, StreamMessage};

use crate::error::RemoteError;

/// Client for the remote tracking backend.
///
/// Implementations report failures as [`RemoteError`] and never retry.
pub trait RemoteClient: Send {
    /// Handle for an open log or metric stream.
    type Stream: MessageStream;

    /// Fetch a single entity.
    ///
    /// # Errors
    ///
    /// Returns the remote failure unchanged.
    fn fetch_one(
        &mut self,
        address: &Address,
    ) -> impl Future<Output = Result<Entity, RemoteError>> + Send;

    /// Fetch one page of status records. `cursor` is `None` for the first page.
    ///
    /// # Errors
    ///
    /// Returns the remote failure unchanged.
    fn fetch_page(
        &mut self,
        address: &Address,
        cursor: Option<&Cursor>,
    ) -> impl Future<Output = Result<ResponsePage, RemoteError>> + Send;

    /// Open a job's log stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is refused or the transport fails.
    fn open_log_stream(
        &mut self,
        job: &JobAddress,
    ) -> impl Future<Output = Result<Self::Stream, RemoteError>> + Send;

    /// Open a job's resource metric stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription is refused or the transport fails.
    fn open_metric_stream(
        &mut self,
        job: &JobAddress,
    ) -> impl Future<Output = Result<Self::Stream, RemoteError>> + Send;
}

/// An open message stream.
pub trait MessageStream: Send {
    /// Pull the next message.
    ///
    /// `None` means the remote ended the stream gracefully.
    fn next_message(
        &mut self,
    ) -> impl Future<Output = Option<Result<StreamMessage, RemoteError>>> + Send;

    /// Release the stream. Called exactly once by the consumer.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
