//! # Live Feed Synchronizer
//!
//! Keeps a [`FeedView`] of one board in step with the store and reports new heads.
//! Snapshots are applied one at a time through [`reduce`], so a store that re-delivers an
//! overlapping or identical result set produces no spurious events.

use std::sync::Arc;

use anyhow::anyhow;
use hf_core::error::{AppError, Result};
use hf_core::feed::{reduce, FeedView, HeadChanged, FEED_LIMIT};
use hf_core::live::LiveQuery;
use hf_core::models::BoardId;
use hf_core::traits::WinRepo;
use log::{debug, info, warn};

pub struct FeedSynchronizer {
    wins: Arc<dyn WinRepo>,
}

impl FeedSynchronizer {
    pub fn new(wins: Arc<dyn WinRepo>) -> Self {
        Self { wins }
    }

    /// Opens the live query for `board_id`. The view starts empty until the first snapshot.
    pub async fn subscribe(&self, board_id: &BoardId) -> Result<FeedSubscription> {
        let live = self
            .wins
            .watch_approved(board_id, FEED_LIMIT)
            .await
            .map_err(AppError::Feed)?;
        info!("Subscribed to the feed of board {board_id}");

        Ok(FeedSubscription {
            board_id: board_id.clone(),
            live,
            view: FeedView::default(),
            terminated: false,
        })
    }
}

/// What a single applied snapshot did to the view.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedUpdate {
    pub head_changed: Option<HeadChanged>,
    pub len: usize,
}

/// A live view over one board's approved wins.
///
/// Owned by exactly one consumer. Dropping it detaches the live query.
#[derive(Debug)]
pub struct FeedSubscription {
    board_id: BoardId,
    live: LiveQuery,
    view: FeedView,
    terminated: bool,
}

impl FeedSubscription {
    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    pub fn view(&self) -> &FeedView {
        &self.view
    }

    /// Still delivering snapshots: neither unsubscribed nor failed.
    pub fn is_active(&self) -> bool {
        self.live.is_attached() && !self.terminated
    }

    /// Waits for the next snapshot and applies it.
    ///
    /// Returns `None` after [`unsubscribe`](Self::unsubscribe). A live-query failure, or the
    /// store closing the query on its own, is returned once as [`AppError::Feed`]; the
    /// subscription is dead after that and the caller has to subscribe again.
    pub async fn recv(&mut self) -> Option<Result<FeedUpdate>> {
        if !self.is_active() {
            return None;
        }

        let outcome = match self.live.next_snapshot().await {
            Some(Ok(snapshot)) => {
                let (view, head_changed) = reduce(&self.view, snapshot);
                self.view = view;
                if let Some(event) = &head_changed {
                    debug!("New head {} on board {}", event.win.id, self.board_id);
                }
                return Some(Ok(FeedUpdate {
                    head_changed,
                    len: self.view.len(),
                }));
            }
            Some(Err(err)) => err,
            None => anyhow!("live query closed by the store"),
        };

        warn!("Feed of board {} terminated: {outcome:#}", self.board_id);
        self.terminated = true;
        self.live.detach();
        Some(Err(AppError::Feed(outcome)))
    }

    /// Detaches the live query. Safe to call any number of times.
    pub fn unsubscribe(&mut self) {
        if self.live.detach() {
            info!("Unsubscribed from the feed of board {}", self.board_id);
        }
    }
}
