//! # Live Queries
//!
//! The consumer side of a store's live subscription, plus the task that store plugins use to
//! produce one. A producer re-runs its query whenever the board changes (and optionally on a
//! timer) and pushes the full, ordered result set down a bounded channel.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::models::{BoardId, Win};

/// Snapshots buffered between a producer and a slow consumer.
pub const SNAPSHOT_BUFFER: usize = 16;

type Detach = Box<dyn FnOnce() + Send>;

/// A live result set delivered as a sequence of full snapshots.
///
/// Snapshots arrive in the order the store produced them. Detaching is idempotent and
/// also happens on drop, so a forgotten query cannot keep its producer alive.
pub struct LiveQuery {
    snapshots: mpsc::Receiver<anyhow::Result<Vec<Win>>>,
    detach: Option<Detach>,
}

impl LiveQuery {
    pub fn new(
        snapshots: mpsc::Receiver<anyhow::Result<Vec<Win>>>,
        detach: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            snapshots,
            detach: Some(Box::new(detach)),
        }
    }

    /// Waits for the next snapshot. `None` once the producer is gone or the query is detached.
    pub async fn next_snapshot(&mut self) -> Option<anyhow::Result<Vec<Win>>> {
        if self.detach.is_none() {
            return None;
        }
        self.snapshots.recv().await
    }

    /// Stops the producer. Returns `false` if the query was already detached.
    pub fn detach(&mut self) -> bool {
        match self.detach.take() {
            Some(detach) => {
                detach();
                self.snapshots.close();
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.detach.is_some()
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for LiveQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Spawns the producer side of a live query for `board_id`.
///
/// `changes` must be subscribed before the call so no change between the first fetch and the
/// first wait is lost. A failed fetch is delivered and ends the query. A closed change channel
/// ends it silently; the consumer sees the channel close.
pub fn spawn_live_query<F, Fut>(
    board_id: BoardId,
    mut changes: broadcast::Receiver<BoardId>,
    poll: Option<Duration>,
    fetch: F,
) -> LiveQuery
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<Vec<Win>>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);

    let task = tokio::spawn(async move {
        let mut ticker = poll.map(|every| {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval
        });
        if let Some(ticker) = ticker.as_mut() {
            // the first tick completes immediately
            ticker.tick().await;
        }

        loop {
            let snapshot = fetch().await;
            let failed = snapshot.is_err();
            if tx.send(snapshot).await.is_err() || failed {
                break;
            }

            // wait until this board changes or the poll interval elapses
            loop {
                let tick = async {
                    match ticker.as_mut() {
                        Some(ticker) => {
                            ticker.tick().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                };
                tokio::select! {
                    changed = changes.recv() => match changed {
                        Ok(changed) if changed == board_id => break,
                        Ok(_) => continue,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            log::debug!("live query for board {board_id} lagged by {skipped} changes");
                            break;
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                    _ = tick => break,
                }
            }
        }
    });

    LiveQuery::new(rx, move || task.abort())
}
