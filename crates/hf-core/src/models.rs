//! # Domain Models
//!
//! These structs represent the core entities of the High Five Board.
//! Identifiers and timestamps are assigned by the backing store, never by the client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::code::JoinCode;

/// Theme written on every new board.
pub const DEFAULT_THEME: &str = "confetti";

/// Opaque, store-assigned board identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(String);

impl BoardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque, store-assigned win identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WinId(String);

impl WinId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A celebration session, found by its join code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(skip)]
    pub id: BoardId,
    pub name: String,
    pub code: JoinCode,
    pub theme: String,
    /// When set, new wins are held as `pending` until approved elsewhere.
    pub moderation: bool,
    pub created_at: DateTime<Utc>,
}

/// A board record before the store has assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBoard {
    pub name: String,
    pub code: JoinCode,
    pub theme: String,
    pub moderation: bool,
}

/// Visibility of a win. Only `Approved` wins reach the live feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinStatus {
    Approved,
    Pending,
    Hidden,
}

impl WinStatus {
    /// Status a freshly submitted win starts in.
    pub fn initial(moderation: bool) -> Self {
        if moderation {
            WinStatus::Pending
        } else {
            WinStatus::Approved
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WinStatus::Approved => "approved",
            WinStatus::Pending => "pending",
            WinStatus::Hidden => "hidden",
        }
    }
}

impl fmt::Display for WinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WinStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(WinStatus::Approved),
            "pending" => Ok(WinStatus::Pending),
            "hidden" => Ok(WinStatus::Hidden),
            other => Err(format!("unknown win status {other:?}")),
        }
    }
}

/// A single short celebratory submission attached to a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Win {
    #[serde(skip)]
    pub id: WinId,
    pub text: String,
    pub emoji: String,
    pub status: WinStatus,
    pub created_at: DateTime<Utc>,
}

/// A win record before the store has assigned its id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWin {
    pub text: String,
    pub emoji: String,
    pub status: WinStatus,
}

/// Anonymous identity handed out by an [`IdentityProvider`](crate::traits::IdentityProvider).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Screen mode of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Join,
    Submit,
    Display,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Join => "join",
            Mode::Submit => "submit",
            Mode::Display => "display",
        })
    }
}
