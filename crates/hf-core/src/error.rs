//! # AppError
//!
//! Centralized error handling for the High Five Board.
//! Maps port failures and rejected operations to actionable error types.
//! Nothing here is fatal: every variant is scoped to one operation or one subscription.

use thiserror::Error;

use crate::models::Mode;

/// The primary error type for all hf-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Lookup miss (e.g., no board with that join code). User-correctable.
    #[error("{0} not found: {1}")]
    NotFound(String, String),

    /// Caller-side rejection (e.g., empty win text). Never reaches the store.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The backing store rejected a write (network, permission).
    #[error("store write failed: {0}")]
    StoreWrite(#[source] anyhow::Error),

    /// The backing store failed a one-shot read.
    #[error("store read failed: {0}")]
    StoreRead(#[source] anyhow::Error),

    /// A live subscription terminated. The caller has to subscribe again.
    #[error("live feed terminated: {0}")]
    Feed(#[source] anyhow::Error),

    /// The session was asked to do something its current mode does not allow.
    #[error("cannot {action} while in {from} mode")]
    InvalidTransition { from: Mode, action: &'static str },
}

/// A specialized Result type for High Five Board logic.
pub type Result<T> = std::result::Result<T, AppError>;
