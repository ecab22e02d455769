//! # Session State Machine
//!
//! Sequences the registry, the submission gate and the feed synchronizer behind the three
//! screen modes. Only declared transitions are accepted:
//!
//! ```text
//!   join ──join(code)──▶ submit ──open_display──▶ display ──back──▶ join
//!     any ──create_board──▶ display
//! ```
//!
//! Entering `display` subscribes to the board's feed and leaving it unsubscribes, so a
//! session never holds more than one live query.

use std::sync::Arc;

use hf_core::code::JoinCode;
use hf_core::error::{AppError, Result};
use hf_core::feed::FeedView;
use hf_core::models::{Board, Mode, Principal, WinId};
use hf_core::traits::IdentityProvider;
use hf_core::validation::validate_emoji;
use log::{debug, info, warn};

use crate::gate::SubmissionGate;
use crate::registry::BoardRegistry;
use crate::sync::{FeedSubscription, FeedSynchronizer, FeedUpdate};
use crate::Backends;

/// Emoji a fresh draft starts with.
pub const DEFAULT_EMOJI: &str = "🎉";

/// The moves a session can be asked to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Joined,
    CreateBoard,
    OpenDisplay,
    Back,
}

impl Transition {
    /// Target mode of this transition from `from`, or `None` if it is not declared.
    pub fn target(self, from: Mode) -> Option<Mode> {
        match (from, self) {
            (Mode::Join, Transition::Joined) => Some(Mode::Submit),
            (_, Transition::CreateBoard) => Some(Mode::Display),
            (Mode::Submit, Transition::OpenDisplay) => Some(Mode::Display),
            (Mode::Display, Transition::Back) => Some(Mode::Join),
            _ => None,
        }
    }

    fn action(self) -> &'static str {
        match self {
            Transition::Joined => "join a board",
            Transition::CreateBoard => "create a board",
            Transition::OpenDisplay => "open the display",
            Transition::Back => "go back",
        }
    }
}

/// One participant's (or host's) walk through a board.
pub struct Session {
    registry: BoardRegistry,
    gate: SubmissionGate,
    sync: FeedSynchronizer,
    identity: Arc<dyn IdentityProvider>,
    principal: Option<Principal>,
    mode: Mode,
    board: Option<Board>,
    draft: String,
    emoji: String,
    feed: Option<FeedSubscription>,
}

impl Session {
    pub fn new(backends: Backends) -> Self {
        Self {
            registry: BoardRegistry::new(backends.boards),
            gate: SubmissionGate::new(backends.wins.clone()),
            sync: FeedSynchronizer::new(backends.wins),
            identity: backends.identity,
            principal: None,
            mode: Mode::Join,
            board: None,
            draft: String::new(),
            emoji: DEFAULT_EMOJI.to_string(),
            feed: None,
        }
    }

    /// See [`BoardRegistry::with_code_attempts`].
    pub fn with_code_attempts(mut self, attempts: u32) -> Self {
        self.registry = self.registry.with_code_attempts(attempts);
        self
    }

    /// Bootstraps the anonymous identity. Writes work without calling this first, but
    /// calling it up front keeps the first submission fast.
    pub async fn start(&mut self) -> Option<&Principal> {
        self.ensure_identity().await;
        self.principal.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Current feed view, while a subscription exists.
    pub fn feed(&self) -> Option<&FeedView> {
        self.feed.as_ref().map(FeedSubscription::view)
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    pub fn set_emoji(&mut self, emoji: impl Into<String>) {
        self.emoji = emoji.into();
    }

    /// Resolves `code` and moves to `submit`.
    ///
    /// A code with no board leaves the session in `join` and returns [`AppError::NotFound`].
    pub async fn join(&mut self, code: &str) -> Result<Board> {
        let next = self.check(Transition::Joined)?;

        let Some(board) = self.registry.resolve_code(code).await? else {
            info!("No board for join code {code:?}");
            return Err(AppError::NotFound("board".into(), JoinCode::normalize(code)));
        };

        self.board = Some(board.clone());
        self.enter(next);
        Ok(board)
    }

    /// Creates a board and opens its display. Allowed from every mode.
    ///
    /// If the board is written but the feed cannot be opened, the session is still in
    /// `display` with the new board (see [`board`](Self::board)); use
    /// [`resubscribe`](Self::resubscribe) to retry the feed.
    pub async fn create_board(&mut self, name: &str, moderation: bool) -> Result<Board> {
        let next = self.check(Transition::CreateBoard)?;
        self.ensure_identity().await;

        let board = self.registry.create_board(name, moderation).await?;

        self.close_feed();
        self.board = Some(board.clone());
        self.enter(next);
        self.open_feed().await?;
        Ok(board)
    }

    /// Moves from `submit` to `display` and subscribes to the board's feed.
    pub async fn open_display(&mut self) -> Result<()> {
        let next = self.check(Transition::OpenDisplay)?;
        self.enter(next);
        self.open_feed().await
    }

    /// Leaves `display` for `join`, dropping the board, its feed and the draft.
    pub fn back(&mut self) -> Result<()> {
        let next = self.check(Transition::Back)?;
        self.close_feed();
        self.board = None;
        self.draft.clear();
        self.enter(next);
        Ok(())
    }

    /// Submits the current draft with the current emoji. Only valid in `submit`.
    ///
    /// The draft is cleared on success and kept on failure so the user can retry.
    pub async fn submit(&mut self) -> Result<WinId> {
        if self.mode != Mode::Submit {
            return Err(AppError::InvalidTransition {
                from: self.mode,
                action: "submit a win",
            });
        }
        let emoji = validate_emoji(&self.emoji)?;
        self.ensure_identity().await;

        let board = self
            .board
            .as_ref()
            .ok_or_else(|| AppError::ValidationError("no board selected".into()))?;
        let id = self
            .gate
            .submit_win(&board.id, &self.draft, &emoji, board.moderation)
            .await?;

        self.draft.clear();
        Ok(id)
    }

    /// Opens a fresh feed subscription after a [`AppError::Feed`]. Only valid in `display`.
    pub async fn resubscribe(&mut self) -> Result<()> {
        if self.mode != Mode::Display {
            return Err(AppError::InvalidTransition {
                from: self.mode,
                action: "subscribe to a feed",
            });
        }
        self.open_feed().await
    }

    /// Applies the next feed snapshot. `None` outside `display` or once the feed has ended.
    pub async fn next_update(&mut self) -> Option<Result<FeedUpdate>> {
        if self.mode != Mode::Display {
            return None;
        }
        self.feed.as_mut()?.recv().await
    }

    fn check(&self, transition: Transition) -> Result<Mode> {
        transition
            .target(self.mode)
            .ok_or(AppError::InvalidTransition {
                from: self.mode,
                action: transition.action(),
            })
    }

    fn enter(&mut self, mode: Mode) {
        if self.mode != mode {
            info!("Session {} -> {}", self.mode, mode);
        }
        self.mode = mode;
    }

    async fn open_feed(&mut self) -> Result<()> {
        self.close_feed();
        let board_id = match &self.board {
            Some(board) => board.id.clone(),
            None => return Err(AppError::ValidationError("no board selected".into())),
        };

        match self.sync.subscribe(&board_id).await {
            Ok(feed) => {
                self.feed = Some(feed);
                Ok(())
            }
            Err(err) => {
                warn!("Could not open the feed of board {board_id}: {err}");
                Err(err)
            }
        }
    }

    fn close_feed(&mut self) {
        if let Some(mut feed) = self.feed.take() {
            feed.unsubscribe();
        }
    }

    async fn ensure_identity(&mut self) {
        if self.principal.is_some() {
            return;
        }
        match self.identity.ensure_identity().await {
            Ok(Some(principal)) => {
                info!("Signed in as {}", principal.as_str());
                self.principal = Some(principal);
            }
            Ok(None) => debug!("No identity on this runtime, continuing without one"),
            Err(err) => warn!("Identity bootstrap failed: {err:#}"),
        }
    }
}
