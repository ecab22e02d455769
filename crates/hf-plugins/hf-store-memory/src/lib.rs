//! # hf-store-memory
//!
//! In-process implementation of `BoardRepo` and `WinRepo`.
//! Behaves like the hosted document store: the store assigns ids and timestamps, and every
//! write to a board re-runs that board's live queries with the full result set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use dashmap::DashMap;
use hf_core::clock::ServerClock;
use hf_core::live::{spawn_live_query, LiveQuery};
use hf_core::models::{Board, BoardId, NewBoard, NewWin, Win, WinId, WinStatus};
use hf_core::traits::{BoardRepo, WinRepo};
use log::debug;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pending change notifications per subscriber before it is considered lagging.
const CHANGE_BUFFER: usize = 64;

#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    boards: DashMap<BoardId, Board>,
    /// Wins per board, in insertion order
    wins: DashMap<BoardId, Vec<Win>>,
    clock: ServerClock,
    changes: broadcast::Sender<BoardId>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(Inner {
                boards: DashMap::new(),
                wins: DashMap::new(),
                clock: ServerClock::new(),
                changes,
                offline: AtomicBool::new(false),
            }),
        }
    }

    /// Simulates losing the connection: every call fails and open live queries error out.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
        if offline {
            for board in self.inner.boards.iter() {
                self.inner.notify(board.key());
            }
        }
    }

    /// Moderator action: moves a win to another status.
    pub fn set_win_status(&self, board_id: &BoardId, win_id: &WinId, status: WinStatus) -> anyhow::Result<()> {
        self.inner.check_online()?;
        {
            let mut wins = self
                .inner
                .wins
                .get_mut(board_id)
                .ok_or_else(|| anyhow!("board {board_id} not found"))?;
            let win = wins
                .iter_mut()
                .find(|win| &win.id == win_id)
                .ok_or_else(|| anyhow!("win {win_id} not found on board {board_id}"))?;
            win.status = status;
        }
        debug!("Win {win_id} on board {board_id} is now {status}");
        self.inner.notify(board_id);
        Ok(())
    }

    /// Every win of a board regardless of status, oldest first.
    pub fn wins(&self, board_id: &BoardId) -> Vec<Win> {
        self.inner
            .wins
            .get(board_id)
            .map(|wins| wins.value().clone())
            .unwrap_or_default()
    }

    pub fn board_count(&self) -> usize {
        self.inner.boards.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn check_online(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            bail!("store unavailable");
        }
        Ok(())
    }

    fn notify(&self, board_id: &BoardId) {
        // no receivers just means nobody is watching
        let _ = self.changes.send(board_id.clone());
    }

    fn approved(&self, board_id: &BoardId, limit: usize) -> anyhow::Result<Vec<Win>> {
        self.check_online()?;
        let mut wins: Vec<Win> = self
            .wins
            .get(board_id)
            .map(|wins| {
                wins.iter()
                    .filter(|win| win.status == WinStatus::Approved)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        wins.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_str().cmp(a.id.as_str()))
        });
        wins.truncate(limit);
        Ok(wins)
    }
}

#[async_trait]
impl BoardRepo for MemoryStore {
    async fn insert_board(&self, board: NewBoard) -> anyhow::Result<Board> {
        self.inner.check_online()?;
        let stored = Board {
            id: BoardId::new(Uuid::now_v7().to_string()),
            name: board.name,
            code: board.code,
            theme: board.theme,
            moderation: board.moderation,
            created_at: self.inner.clock.now(),
        };
        self.inner.wins.insert(stored.id.clone(), Vec::new());
        self.inner.boards.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn find_board_by_code(&self, code: &str) -> anyhow::Result<Option<Board>> {
        self.inner.check_online()?;
        Ok(self
            .inner
            .boards
            .iter()
            .filter(|board| board.code.as_str() == code)
            .min_by_key(|board| board.created_at)
            .map(|board| board.value().clone()))
    }
}

#[async_trait]
impl WinRepo for MemoryStore {
    async fn insert_win(&self, board_id: &BoardId, win: NewWin) -> anyhow::Result<Win> {
        self.inner.check_online()?;
        let stored = Win {
            id: WinId::new(Uuid::now_v7().to_string()),
            text: win.text,
            emoji: win.emoji,
            status: win.status,
            created_at: self.inner.clock.now(),
        };
        self.inner
            .wins
            .get_mut(board_id)
            .ok_or_else(|| anyhow!("board {board_id} not found"))?
            .push(stored.clone());
        self.inner.notify(board_id);
        Ok(stored)
    }

    async fn watch_approved(&self, board_id: &BoardId, limit: usize) -> anyhow::Result<LiveQuery> {
        self.inner.check_online()?;
        let changes = self.inner.changes.subscribe();
        let inner = self.inner.clone();
        let id = board_id.clone();
        Ok(spawn_live_query(board_id.clone(), changes, None, move || {
            let snapshot = inner.approved(&id, limit);
            async move { snapshot }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hf_core::code::JoinCode;

    fn new_board(code: &str, moderation: bool) -> NewBoard {
        NewBoard {
            name: "Test Board".into(),
            code: JoinCode::parse(code).unwrap(),
            theme: "confetti".into(),
            moderation,
        }
    }

    fn new_win(text: &str, status: WinStatus) -> NewWin {
        NewWin {
            text: text.into(),
            emoji: "🎉".into(),
            status,
        }
    }

    #[tokio::test]
    async fn test_find_board_by_code_returns_earliest() {
        let store = MemoryStore::new();
        let first = store.insert_board(new_board("FOX-271", false)).await.unwrap();
        store.insert_board(new_board("FOX-271", true)).await.unwrap();

        let found = store.find_board_by_code("FOX-271").await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
        assert!(store.find_board_by_code("OWL-100").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_live_query_sees_new_approved_wins() {
        let store = MemoryStore::new();
        let board = store.insert_board(new_board("ELK-500", false)).await.unwrap();
        let mut live = store.watch_approved(&board.id, 100).await.unwrap();

        assert!(live.next_snapshot().await.unwrap().unwrap().is_empty());

        store.insert_win(&board.id, new_win("first", WinStatus::Approved)).await.unwrap();
        let snapshot = live.next_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);

        store.insert_win(&board.id, new_win("held", WinStatus::Pending)).await.unwrap();
        store.insert_win(&board.id, new_win("second", WinStatus::Approved)).await.unwrap();
        // one snapshot per change; the last one holds both approved wins, newest first
        let _ = live.next_snapshot().await.unwrap().unwrap();
        let snapshot = live.next_snapshot().await.unwrap().unwrap();
        let texts: Vec<&str> = snapshot.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_moderation_updates_reach_live_queries() {
        let store = MemoryStore::new();
        let board = store.insert_board(new_board("BEE-123", true)).await.unwrap();
        let pending = store.insert_win(&board.id, new_win("wait", WinStatus::Pending)).await.unwrap();
        let mut live = store.watch_approved(&board.id, 100).await.unwrap();
        assert!(live.next_snapshot().await.unwrap().unwrap().is_empty());

        store.set_win_status(&board.id, &pending.id, WinStatus::Approved).unwrap();
        assert_eq!(live.next_snapshot().await.unwrap().unwrap().len(), 1);

        store.set_win_status(&board.id, &pending.id, WinStatus::Hidden).unwrap();
        assert!(live.next_snapshot().await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_limit_is_applied() {
        let store = MemoryStore::new();
        let board = store.insert_board(new_board("OWL-999", false)).await.unwrap();
        for i in 0..120 {
            store.insert_win(&board.id, new_win(&format!("win {i}"), WinStatus::Approved)).await.unwrap();
        }
        let mut live = store.watch_approved(&board.id, 100).await.unwrap();
        let snapshot = live.next_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 100);
        assert_eq!(snapshot[0].text, "win 119");
    }

    #[tokio::test]
    async fn test_offline_store_fails_writes_and_feeds() {
        let store = MemoryStore::new();
        let board = store.insert_board(new_board("HARE-321", false)).await.unwrap();
        let mut live = store.watch_approved(&board.id, 100).await.unwrap();
        assert!(live.next_snapshot().await.unwrap().is_ok());

        store.set_offline(true);
        assert!(store.insert_win(&board.id, new_win("x", WinStatus::Approved)).await.is_err());
        assert!(live.next_snapshot().await.unwrap().is_err());
        assert!(live.next_snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_insert_win_into_unknown_board_fails() {
        let store = MemoryStore::new();
        let err = store
            .insert_win(&BoardId::new("missing"), new_win("x", WinStatus::Approved))
            .await;
        assert!(err.is_err());
    }
}
