//! services/api/src/editor/autosave.rs
//!
//! The persistence half of an editor session: a save lane that serializes writes
//! for one owner, and a cancellable, re-armable debounce timer that feeds it.

use chrono::{DateTime, Utc};
use portfolio_core::domain::PortfolioDocument;
use portfolio_core::ports::{DocumentStore, PortResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// An immutable document state tagged with the session revision it was taken at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub revision: u64,
    pub document: Arc<PortfolioDocument>,
}

/// Progress of writes, reported to whoever drives the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    Started { revision: u64 },
    Saved { revision: u64, updated_at: DateTime<Utc> },
    Failed { revision: u64 },
}

/// Serializes the writes of one session.
///
/// Holding the lock across the store call means writes land in dispatch order, and
/// the remembered revision lets a write that was overtaken by a newer one be dropped.
pub struct SaveLane {
    store: Arc<dyn DocumentStore>,
    owner: Uuid,
    last_written: Mutex<Option<u64>>,
    events: Option<mpsc::UnboundedSender<SaveEvent>>,
}

impl SaveLane {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        owner: Uuid,
        events: Option<mpsc::UnboundedSender<SaveEvent>>,
    ) -> Self {
        Self {
            store,
            owner,
            last_written: Mutex::new(None),
            events,
        }
    }

    fn emit(&self, event: SaveEvent) {
        if let Some(events) = &self.events {
            // The receiver is gone once the session is torn down; nothing to tell.
            let _ = events.send(event);
        }
    }

    /// Writes `snapshot` unless a newer or equal revision has already been written.
    /// Returns the server timestamp, or `None` when the write was skipped.
    pub async fn write(&self, snapshot: Snapshot) -> PortResult<Option<DateTime<Utc>>> {
        let mut last_written = self.last_written.lock().await;
        if matches!(*last_written, Some(done) if done >= snapshot.revision) {
            debug!(
                "Skipping save of revision {} for {}; already persisted",
                snapshot.revision, self.owner
            );
            return Ok(None);
        }

        self.emit(SaveEvent::Started {
            revision: snapshot.revision,
        });
        match self
            .store
            .put_portfolio(self.owner, &snapshot.document)
            .await
        {
            Ok(updated_at) => {
                *last_written = Some(snapshot.revision);
                info!(
                    "Saved portfolio of {} at revision {}",
                    self.owner, snapshot.revision
                );
                self.emit(SaveEvent::Saved {
                    revision: snapshot.revision,
                    updated_at,
                });
                Ok(Some(updated_at))
            }
            Err(e) => {
                self.emit(SaveEvent::Failed {
                    revision: snapshot.revision,
                });
                Err(e)
            }
        }
    }
}

/// A single-shot delay that is re-armed on every edit. Only one timer is live at a time.
pub struct DebounceTimer {
    delay: Duration,
    armed: Option<CancellationToken>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, armed: None }
    }

    /// Cancels any pending timer and starts a new one that writes `snapshot` through
    /// `lane` once `delay` has passed without another call.
    pub fn arm(&mut self, lane: Arc<SaveLane>, snapshot: Snapshot) {
        self.cancel();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    debug!("Autosave of revision {} superseded", snapshot.revision);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
            let revision = snapshot.revision;
            if let Err(e) = lane.write(snapshot).await {
                warn!("Autosave of revision {} failed: {:?}", revision, e);
            }
        });
        self.armed = Some(token);
    }

    /// Stops a pending timer. A write that already started is left to finish.
    pub fn cancel(&mut self) {
        if let Some(token) = self.armed.take() {
            token.cancel();
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
