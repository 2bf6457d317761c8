// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bounded provider-event feed.
use atlas_core::AnchorEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// An event the feed could not accept. The event is handed back so the provider
/// can retry or coalesce it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverflowError {
    /// The buffer is full.
    #[error("anchor feed full ({capacity} events buffered)")]
    Full {
        /// Rejected event.
        event: Box<AnchorEvent>,
        /// Buffer capacity.
        capacity: usize,
    },
    /// The update loop has stopped.
    #[error("anchor feed closed")]
    Closed(Box<AnchorEvent>),
}

impl OverflowError {
    /// The rejected event.
    pub fn into_event(self) -> AnchorEvent {
        match self {
            Self::Full { event, .. } | Self::Closed(event) => *event,
        }
    }
}

/// Sending half of the anchor event stream. Cheap to clone; events from one clone
/// are applied in the order they were pushed.
#[derive(Debug, Clone)]
pub struct AnchorFeed {
    tx: mpsc::Sender<AnchorEvent>,
}

impl AnchorFeed {
    pub(crate) fn new(tx: mpsc::Sender<AnchorEvent>) -> Self {
        Self { tx }
    }

    /// Enqueues `event` without waiting.
    pub fn push(&self, event: AnchorEvent) -> Result<(), OverflowError> {
        self.tx.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(event) => OverflowError::Full {
                event: Box::new(event),
                capacity: self.tx.max_capacity(),
            },
            mpsc::error::TrySendError::Closed(event) => OverflowError::Closed(Box::new(event)),
        })
    }

    /// Enqueues `event`, waiting for buffer space.
    pub async fn send(&self, event: AnchorEvent) -> Result<(), OverflowError> {
        self.tx
            .send(event)
            .await
            .map_err(|mpsc::error::SendError(event)| OverflowError::Closed(Box::new(event)))
    }

    /// Free buffer slots right now.
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    /// `true` once the update loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
