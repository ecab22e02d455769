//! # hf-store-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `hf-core` domain models.
//!
//! SQLite has no change feed, so live queries re-run on two triggers: writes made through
//! this store (in-process notification) and a poll interval that picks up other writers.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use hf_core::clock::{from_micros, ServerClock};
use hf_core::code::JoinCode;
use hf_core::live::{spawn_live_query, LiveQuery};
use hf_core::models::{Board, BoardId, NewBoard, NewWin, Win, WinId, WinStatus};
use hf_core::traits::{BoardRepo, WinRepo};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Default interval at which live queries re-read the database.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS boards (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL,
        code        TEXT NOT NULL,
        theme       TEXT NOT NULL,
        moderation  INTEGER NOT NULL,
        created_at  INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS boards_by_code ON boards (code, created_at)",
    "CREATE TABLE IF NOT EXISTS wins (
        id          TEXT PRIMARY KEY,
        board_id    TEXT NOT NULL REFERENCES boards (id),
        text        TEXT NOT NULL,
        emoji       TEXT NOT NULL,
        status      TEXT NOT NULL,
        created_at  INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS wins_feed ON wins (board_id, status, created_at DESC)",
];

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    clock: Arc<ServerClock>,
    changes: broadcast::Sender<BoardId>,
    poll: Option<Duration>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    ///
    /// # Developer Note
    /// An in-memory database lives exactly as long as its connection, so `sqlite::memory:`
    /// gets a single connection that is never recycled.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let in_memory = url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(if in_memory { None } else { Some(Duration::from_secs(600)) })
            .max_lifetime(if in_memory { None } else { Some(Duration::from_secs(1800)) })
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        log::info!("SQLite store ready at {url}");

        let (changes, _) = broadcast::channel(64);
        Ok(Self {
            pool,
            clock: Arc::new(ServerClock::new()),
            changes,
            poll: Some(DEFAULT_POLL_INTERVAL),
        })
    }

    /// Sets how often live queries re-read the database; `None` relies on in-process writes only.
    pub fn with_poll_interval(mut self, poll: Option<Duration>) -> Self {
        self.poll = poll;
        self
    }

    /// Moderator action: moves a win to another status.
    pub async fn set_win_status(&self, board_id: &BoardId, win_id: &WinId, status: WinStatus) -> anyhow::Result<()> {
        let updated = sqlx::query("UPDATE wins SET status = ? WHERE id = ? AND board_id = ?")
            .bind(status.as_str())
            .bind(win_id.as_str())
            .bind(board_id.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if updated == 0 {
            bail!("win {win_id} not found on board {board_id}");
        }
        self.notify(board_id);
        Ok(())
    }

    fn notify(&self, board_id: &BoardId) {
        let _ = self.changes.send(board_id.clone());
    }
}

fn board_from_row(row: &SqliteRow) -> anyhow::Result<Board> {
    let code: String = row.try_get("code")?;
    Ok(Board {
        id: BoardId::new(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
        code: JoinCode::parse(&code).ok_or_else(|| anyhow!("stored join code {code:?} is malformed"))?,
        theme: row.try_get("theme")?,
        moderation: row.try_get("moderation")?,
        created_at: timestamp(row)?,
    })
}

fn win_from_row(row: &SqliteRow) -> anyhow::Result<Win> {
    let status: String = row.try_get("status")?;
    Ok(Win {
        id: WinId::new(row.try_get::<String, _>("id")?),
        text: row.try_get("text")?,
        emoji: row.try_get("emoji")?,
        status: WinStatus::from_str(&status).map_err(|e| anyhow!(e))?,
        created_at: timestamp(row)?,
    })
}

fn timestamp(row: &SqliteRow) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    let micros: i64 = row.try_get("created_at")?;
    from_micros(micros).ok_or_else(|| anyhow!("created_at {micros} is out of range"))
}

async fn approved_wins(pool: &SqlitePool, board_id: &BoardId, limit: usize) -> anyhow::Result<Vec<Win>> {
    sqlx::query(
        "SELECT id, text, emoji, status, created_at FROM wins
         WHERE board_id = ? AND status = 'approved'
         ORDER BY created_at DESC, id DESC
         LIMIT ?",
    )
    .bind(board_id.as_str())
    .bind(limit as i64)
    .fetch_all(pool)
    .await?
    .iter()
    .map(win_from_row)
    .collect()
}

#[async_trait]
impl BoardRepo for SqliteStore {
    async fn insert_board(&self, board: NewBoard) -> anyhow::Result<Board> {
        let stored = Board {
            id: BoardId::new(Uuid::now_v7().to_string()),
            name: board.name,
            code: board.code,
            theme: board.theme,
            moderation: board.moderation,
            created_at: self.clock.now(),
        };

        sqlx::query("INSERT INTO boards (id, name, code, theme, moderation, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(stored.id.as_str())
            .bind(&stored.name)
            .bind(stored.code.as_str())
            .bind(&stored.theme)
            .bind(stored.moderation)
            .bind(stored.created_at.timestamp_micros())
            .execute(&self.pool)
            .await?;

        Ok(stored)
    }

    /// Earliest board wins when a code is shared.
    async fn find_board_by_code(&self, code: &str) -> anyhow::Result<Option<Board>> {
        let row = sqlx::query(
            "SELECT id, name, code, theme, moderation, created_at FROM boards WHERE code = ? ORDER BY created_at ASC LIMIT 1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(board_from_row).transpose()
    }
}

#[async_trait]
impl WinRepo for SqliteStore {
    async fn insert_win(&self, board_id: &BoardId, win: NewWin) -> anyhow::Result<Win> {
        let stored = Win {
            id: WinId::new(Uuid::now_v7().to_string()),
            text: win.text,
            emoji: win.emoji,
            status: win.status,
            created_at: self.clock.now(),
        };

        sqlx::query("INSERT INTO wins (id, board_id, text, emoji, status, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(stored.id.as_str())
            .bind(board_id.as_str())
            .bind(&stored.text)
            .bind(&stored.emoji)
            .bind(stored.status.as_str())
            .bind(stored.created_at.timestamp_micros())
            .execute(&self.pool)
            .await?;

        self.notify(board_id);
        Ok(stored)
    }

    async fn watch_approved(&self, board_id: &BoardId, limit: usize) -> anyhow::Result<LiveQuery> {
        let changes = self.changes.subscribe();
        let pool = self.pool.clone();
        let id = board_id.clone();
        Ok(spawn_live_query(board_id.clone(), changes, self.poll, move || {
            let pool = pool.clone();
            let id = id.clone();
            async move { approved_wins(&pool, &id, limit).await }
        }))
    }
}
