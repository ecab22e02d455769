//! # Board Registry
//!
//! Creates boards and resolves join codes to them.

use std::sync::Arc;

use hf_core::code::JoinCode;
use hf_core::error::{AppError, Result};
use hf_core::models::{Board, NewBoard, DEFAULT_THEME};
use hf_core::traits::BoardRepo;
use hf_core::validation::validate_board_name;
use log::{debug, info, warn};

/// Codes drawn before the registry gives up avoiding a collision.
pub const DEFAULT_CODE_ATTEMPTS: u32 = 8;

pub struct BoardRegistry {
    boards: Arc<dyn BoardRepo>,
    code_attempts: u32,
}

impl BoardRegistry {
    pub fn new(boards: Arc<dyn BoardRepo>) -> Self {
        Self {
            boards,
            code_attempts: DEFAULT_CODE_ATTEMPTS,
        }
    }

    /// How many codes to try against existing boards. `1` skips the check entirely.
    pub fn with_code_attempts(mut self, attempts: u32) -> Self {
        self.code_attempts = attempts.max(1);
        self
    }

    /// Creates a board and returns it with its store-assigned id and its join code.
    ///
    /// No retry on a failed write; the caller decides.
    pub async fn create_board(&self, name: &str, moderation: bool) -> Result<Board> {
        let name = validate_board_name(name)?;
        let code = self.pick_code().await;

        let board = self
            .boards
            .insert_board(NewBoard {
                name,
                code,
                theme: DEFAULT_THEME.to_string(),
                moderation,
            })
            .await
            .map_err(AppError::StoreWrite)?;

        info!(
            "Created board {} ({:?}) with code {}, moderation {}",
            board.id, board.name, board.code, board.moderation
        );
        Ok(board)
    }

    /// Finds the board behind a join code, ignoring case and whitespace.
    ///
    /// A miss (including input that cannot be a code) is `Ok(None)`, never an error.
    pub async fn resolve_code(&self, code: &str) -> Result<Option<Board>> {
        let Some(code) = JoinCode::parse(code) else {
            debug!("{code:?} is not a well-formed join code");
            return Ok(None);
        };

        let board = self
            .boards
            .find_board_by_code(code.as_str())
            .await
            .map_err(AppError::StoreRead)?;
        debug!("Resolved {code} to {:?}", board.as_ref().map(|b| &b.id));
        Ok(board)
    }

    /// Draws codes until one is unused or the attempts run out.
    ///
    /// The check and the insert are not atomic, so two hosts can still race to the same code.
    /// A failed lookup ends the check early; the write that follows reports the outage.
    async fn pick_code(&self) -> JoinCode {
        let mut code = JoinCode::generate();
        if self.code_attempts == 1 {
            return code;
        }

        for attempt in 1..=self.code_attempts {
            let taken = match self.boards.find_board_by_code(code.as_str()).await {
                Ok(found) => found.is_some(),
                Err(err) => {
                    // a failed check must not turn a board creation into a read error
                    warn!("Could not check join code {code}, using it unchecked: {err:#}");
                    return code;
                }
            };
            if !taken {
                return code;
            }
            debug!("Join code {code} already in use (attempt {attempt})");
            if attempt < self.code_attempts {
                code = JoinCode::generate();
            }
        }

        warn!(
            "No free join code after {} attempts, reusing {code}",
            self.code_attempts
        );
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hf_core::models::BoardId;
    use hf_core::traits::MockBoardRepo;

    fn stored(new: NewBoard) -> Board {
        Board {
            id: BoardId::new("b1"),
            name: new.name,
            code: new.code,
            theme: new.theme,
            moderation: new.moderation,
            created_at: Utc::now(),
        }
    }

    fn existing(code: &str) -> Board {
        stored(NewBoard {
            name: "Old".into(),
            code: code.parse().unwrap(),
            theme: DEFAULT_THEME.into(),
            moderation: false,
        })
    }

    #[tokio::test]
    async fn test_create_board_writes_generated_code() {
        let mut repo = MockBoardRepo::new();
        repo.expect_find_board_by_code().returning(|_| Ok(None));
        repo.expect_insert_board()
            .withf(|new| new.name == "Team Standup" && !new.moderation && new.theme == "confetti")
            .times(1)
            .returning(|new| Ok(stored(new)));

        let registry = BoardRegistry::new(Arc::new(repo));
        let board = registry.create_board("  Team Standup ", false).await.unwrap();

        assert!(JoinCode::parse(board.code.as_str()).is_some());
        assert_eq!(board.name, "Team Standup");
    }

    #[tokio::test]
    async fn test_create_board_retries_taken_codes() {
        let mut repo = MockBoardRepo::new();
        let mut lookups = 0;
        repo.expect_find_board_by_code().times(3).returning(move |code| {
            lookups += 1;
            Ok((lookups < 3).then(|| existing(code)))
        });
        repo.expect_insert_board().times(1).returning(|new| Ok(stored(new)));

        let registry = BoardRegistry::new(Arc::new(repo));
        registry.create_board("Wins", true).await.unwrap();
    }

    #[tokio::test]
    async fn test_single_attempt_skips_lookup() {
        let mut repo = MockBoardRepo::new();
        repo.expect_find_board_by_code().never();
        repo.expect_insert_board().times(1).returning(|new| Ok(stored(new)));

        let registry = BoardRegistry::new(Arc::new(repo)).with_code_attempts(1);
        registry.create_board("Wins", false).await.unwrap();
    }

    #[tokio::test]
    async fn test_all_codes_taken_still_creates() {
        let mut repo = MockBoardRepo::new();
        repo.expect_find_board_by_code()
            .times(2)
            .returning(|code| Ok(Some(existing(code))));
        repo.expect_insert_board().times(1).returning(|new| Ok(stored(new)));

        let registry = BoardRegistry::new(Arc::new(repo)).with_code_attempts(2);
        assert!(registry.create_board("Wins", false).await.is_ok());
    }

    #[tokio::test]
    async fn test_create_board_surfaces_write_failure() {
        let mut repo = MockBoardRepo::new();
        repo.expect_find_board_by_code().returning(|_| Ok(None));
        repo.expect_insert_board()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("permission denied")));

        let registry = BoardRegistry::new(Arc::new(repo));
        let err = registry.create_board("Wins", false).await.unwrap_err();
        assert!(matches!(err, AppError::StoreWrite(_)));
    }

    #[tokio::test]
    async fn test_failed_code_check_still_reports_write_failure() {
        let mut repo = MockBoardRepo::new();
        repo.expect_find_board_by_code()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("store unavailable")));
        repo.expect_insert_board()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("store unavailable")));

        let registry = BoardRegistry::new(Arc::new(repo));
        let err = registry.create_board("Wins", false).await.unwrap_err();
        assert!(matches!(err, AppError::StoreWrite(_)));
    }

    #[tokio::test]
    async fn test_failed_code_check_still_creates_board() {
        let mut repo = MockBoardRepo::new();
        repo.expect_find_board_by_code()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("index not ready")));
        repo.expect_insert_board().times(1).returning(|new| Ok(stored(new)));

        let registry = BoardRegistry::new(Arc::new(repo));
        assert!(registry.create_board("Wins", false).await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_name_never_reaches_store() {
        let mut repo = MockBoardRepo::new();
        repo.expect_find_board_by_code().never();
        repo.expect_insert_board().never();

        let registry = BoardRegistry::new(Arc::new(repo));
        let err = registry.create_board("   ", false).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_resolve_code_normalizes_input() {
        let mut repo = MockBoardRepo::new();
        repo.expect_find_board_by_code()
            .withf(|code| code == "FOX-271")
            .times(2)
            .returning(|code| Ok(Some(existing(code))));

        let registry = BoardRegistry::new(Arc::new(repo));
        let a = registry.resolve_code("fox-271").await.unwrap().unwrap();
        let b = registry.resolve_code(" FOX-271 ").await.unwrap().unwrap();
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_resolve_code_miss_is_none() {
        let mut repo = MockBoardRepo::new();
        repo.expect_find_board_by_code().times(1).returning(|_| Ok(None));

        let registry = BoardRegistry::new(Arc::new(repo));
        assert!(registry.resolve_code("OWL-404").await.unwrap().is_none());
        // malformed input is a miss without a lookup
        assert!(registry.resolve_code("not a code").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_code_surfaces_read_failure() {
        let mut repo = MockBoardRepo::new();
        repo.expect_find_board_by_code()
            .returning(|_| Err(anyhow::anyhow!("offline")));

        let registry = BoardRegistry::new(Arc::new(repo));
        let err = registry.resolve_code("OWL-404").await.unwrap_err();
        assert!(matches!(err, AppError::StoreRead(_)));
    }
}
