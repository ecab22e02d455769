//! # Feed View
//!
//! Client-side cache of a board's approved wins and the reducer that folds store snapshots
//! into it. The reducer is pure so head-change detection can be tested without a store.

use crate::models::{Win, WinStatus};
use std::collections::HashSet;

/// Maximum number of wins a feed view holds.
pub const FEED_LIMIT: usize = 100;

/// Approved wins, newest first, at most [`FEED_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedView {
    wins: Vec<Win>,
}

impl FeedView {
    /// The most recent win.
    pub fn head(&self) -> Option<&Win> {
        self.wins.first()
    }

    pub fn wins(&self) -> &[Win] {
        &self.wins
    }

    pub fn len(&self) -> usize {
        self.wins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wins.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Win> {
        self.wins.iter()
    }
}

/// Raised when a snapshot brings a different win to the top of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadChanged {
    pub win: Win,
}

/// Replaces `previous` with `snapshot` and reports whether the head changed.
///
/// The snapshot is taken as-is from the store but the view invariant is enforced anyway:
/// only approved wins, first occurrence of each id, newest first, capped at [`FEED_LIMIT`].
/// An empty result never raises an event.
pub fn reduce(previous: &FeedView, snapshot: Vec<Win>) -> (FeedView, Option<HeadChanged>) {
    let mut seen = HashSet::new();
    let mut wins: Vec<Win> = snapshot
        .into_iter()
        .filter(|win| win.status == WinStatus::Approved)
        .filter(|win| seen.insert(win.id.clone()))
        .collect();
    // stable: equal timestamps keep the store's order
    wins.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    wins.truncate(FEED_LIMIT);

    let view = FeedView { wins };
    let changed = match (previous.head(), view.head()) {
        (_, None) => None,
        (None, Some(head)) => Some(head),
        (Some(old), Some(head)) if old.id != head.id => Some(head),
        _ => None,
    };
    let event = changed.map(|win| HeadChanged { win: win.clone() });
    (view, event)
}
