//! # Submission Gate
//!
//! Validates a win, applies the board's moderation policy and persists it.
//! Every submission is an independent insert, so concurrent submitters cannot conflict.

use std::sync::Arc;

use hf_core::error::{AppError, Result};
use hf_core::models::{BoardId, NewWin, WinId, WinStatus};
use hf_core::traits::WinRepo;
use hf_core::validation::validate_win_text;
use log::info;

pub struct SubmissionGate {
    wins: Arc<dyn WinRepo>,
}

impl SubmissionGate {
    pub fn new(wins: Arc<dyn WinRepo>) -> Self {
        Self { wins }
    }

    /// Writes a win as `pending` when moderation is on, `approved` otherwise.
    ///
    /// Text is trimmed and must be 1..=140 characters; a rejected win never reaches the store.
    /// The emoji is the caller's responsibility.
    pub async fn submit_win(
        &self,
        board_id: &BoardId,
        text: &str,
        emoji: &str,
        moderation: bool,
    ) -> Result<WinId> {
        if board_id.is_empty() {
            return Err(AppError::ValidationError("no board selected".into()));
        }
        let text = validate_win_text(text)?;

        let win = self
            .wins
            .insert_win(
                board_id,
                NewWin {
                    text,
                    emoji: emoji.to_string(),
                    status: WinStatus::initial(moderation),
                },
            )
            .await
            .map_err(AppError::StoreWrite)?;

        info!("Win {} submitted to board {} as {}", win.id, board_id, win.status);
        Ok(win.id)
    }
}
