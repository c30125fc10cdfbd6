//! Streaming consumer.
//!
//! Pulls messages one at a time from a [`MessageStream`] and hands each to a
//! callback before pulling the next. The stream is closed exactly once on
//! every exit path.

use std::ops::ControlFlow;

use jobscope_proto::StreamMessage;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::{CoreError, Result};
use crate::remote::MessageStream;

/// How a stream finished without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StreamOutcome {
    /// The remote ended the stream.
    Completed {
        /// Messages handed to the callback.
        delivered: u64,
    },
    /// The caller stopped the stream.
    Cancelled {
        /// Messages handed to the callback.
        delivered: u64,
    },
}

impl StreamOutcome {
    /// Messages handed to the callback.
    #[must_use]
    pub const fn delivered(&self) -> u64 {
        match self {
            Self::Completed { delivered } | Self::Cancelled { delivered } => *delivered,
        }
    }

    /// Returns true if the caller stopped the stream.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Drain `stream`, invoking `on_message` for each message in arrival order.
///
/// Returns when the remote ends the stream, when `cancel` fires, or when
/// `on_message` returns [`ControlFlow::Break`]. Cancellation is checked before
/// every pull and wins over a message that is ready at the same time.
///
/// # Errors
///
/// Returns [`CoreError::StreamInterrupted`] if a read fails. Messages already
/// delivered stay delivered.
pub async fn consume<S, F>(
    mut stream: S,
    cancel: &CancellationToken,
    mut on_message: F,
) -> Result<StreamOutcome>
where
    S: MessageStream,
    F: FnMut(StreamMessage) -> ControlFlow<()>,
{
    let mut delivered: u64 = 0;

    let result = loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(delivered, "stream cancelled");
                break Ok(StreamOutcome::Cancelled { delivered });
            }
            next = stream.next_message() => next,
        };

        match next {
            Some(Ok(message)) => {
                delivered += 1;
                trace!(delivered, kind = %message.stream_kind(), "stream message");
                if on_message(message).is_break() {
                    debug!(delivered, "stream stopped by consumer");
                    break Ok(StreamOutcome::Cancelled { delivered });
                }
            }
            Some(Err(e)) => {
                debug!(delivered, error = %e, "stream interrupted");
                break Err(CoreError::StreamInterrupted {
                    delivered,
                    reason: e.to_string(),
                });
            }
            None => {
                debug!(delivered, "stream completed");
                break Ok(StreamOutcome::Completed { delivered });
            }
        }
    };

    stream.close().await;
    result
}
