//! # hf-session
//!
//! The orchestration layer of the High Five Board: it coordinates the flow between a
//! participant's actions and the core ports.

pub mod gate;
pub mod registry;
pub mod session;
pub mod sync;

use std::sync::Arc;

use hf_core::traits::{BoardRepo, IdentityProvider, WinRepo};

pub use gate::SubmissionGate;
pub use registry::{BoardRegistry, DEFAULT_CODE_ATTEMPTS};
pub use session::{Session, Transition, DEFAULT_EMOJI};
pub use sync::{FeedSubscription, FeedSynchronizer, FeedUpdate};

/// The plugins a session runs against.
///
/// # Developer Note
/// A single store usually implements both repos; pass the same `Arc` twice.
#[derive(Clone)]
pub struct Backends {
    pub boards: Arc<dyn BoardRepo>,
    pub wins: Arc<dyn WinRepo>,
    pub identity: Arc<dyn IdentityProvider>,
}
