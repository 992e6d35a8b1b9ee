//! services/api/src/web/feed.rs
//!
//! The change feed behind the realtime view synchronizer: a broadcast channel
//! of row-agnostic table events. This service is the store's single writer, so
//! one publish after each committed write gives subscribers the at-least-once
//! notification the refetch policy needs.

use async_stream::stream;
use foodbridge_core::ports::{ChangeEvent, ChangeOp, StoreTable};
use futures::Stream;
use tokio::sync::broadcast;
use tracing::warn;

/// How many undelivered events a slow subscriber may buffer before it lags.
/// Lag is harmless here: it collapses into a single wildcard refetch.
const FEED_CAPACITY: usize = 256;

/// What a subscriber observes: a concrete table event, or the fact that it
/// fell behind and unknown events were dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSignal {
    Event(ChangeEvent),
    /// Some notifications were missed; treat it as "anything may have changed".
    Lagged,
}

/// The shared publish side of the change feed. Cheap to clone.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Announces one committed insert/update/delete. Having no subscribers is
    /// not an error; the event simply has no audience.
    pub fn publish(&self, table: StoreTable, op: ChangeOp) {
        let _ = self.tx.send(ChangeEvent { table, op });
    }

    pub fn subscribe(&self) -> FeedSubscription {
        FeedSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// One subscriber's view of the feed. Dropping it (or the stream made from
/// it) releases the subscription; nothing outlives the view that opened it.
pub struct FeedSubscription {
    rx: broadcast::Receiver<ChangeEvent>,
}

impl FeedSubscription {
    /// Waits for the next signal. Returns `None` once the feed is closed
    /// (application shutdown).
    pub async fn next_signal(&mut self) -> Option<FeedSignal> {
        match self.rx.recv().await {
            Ok(event) => Some(FeedSignal::Event(event)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Change feed subscriber lagged, {} events dropped", skipped);
                Some(FeedSignal::Lagged)
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Exposes the subscription as a lazy stream of signals, suitable for
    /// `select!`-driven connection loops.
    pub fn into_stream(mut self) -> impl Stream<Item = FeedSignal> {
        stream! {
            while let Some(signal) = self.next_signal().await {
                yield signal;
            }
        }
    }
}
