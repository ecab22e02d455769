//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the session layer.
//! They are injected, never looked up globally, so every component can run against fakes.

use async_trait::async_trait;

use crate::live::LiveQuery;
use crate::models::{Board, BoardId, NewBoard, NewWin, Principal, Win};

/// Persistence contract for board records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BoardRepo: Send + Sync {
    /// Inserts a board; the store assigns its id and creation timestamp.
    async fn insert_board(&self, board: NewBoard) -> anyhow::Result<Board>;

    /// Exact match on an already-normalized code. When several boards share it,
    /// the earliest created one is returned.
    async fn find_board_by_code(&self, code: &str) -> anyhow::Result<Option<Board>>;
}

/// Persistence contract for the wins of a board.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait WinRepo: Send + Sync {
    /// Single atomic insert; the store assigns id and creation timestamp.
    async fn insert_win(&self, board_id: &BoardId, win: NewWin) -> anyhow::Result<Win>;

    /// Opens a live query over the approved wins of a board, newest first,
    /// at most `limit` per snapshot. Every snapshot is the full result set.
    async fn watch_approved(&self, board_id: &BoardId, limit: usize) -> anyhow::Result<LiveQuery>;
}

/// Anonymous identity bootstrap.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Idempotent. `None` means no identity is available on this runtime, which is not an error.
    async fn ensure_identity(&self) -> anyhow::Result<Option<Principal>>;
}
