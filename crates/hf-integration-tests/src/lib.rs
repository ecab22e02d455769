//! Shared wiring for the end-to-end tests under `tests/`.

use std::sync::Arc;
use std::time::Duration;

use hf_auth_anon::AnonIdentityProvider;
use hf_core::models::Win;
use hf_session::{Backends, Session};
use hf_store_memory::MemoryStore;

/// Upper bound on how long a test waits for a feed update that must arrive.
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a feed has to stay silent before it is considered settled.
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Backends that all point at one shared in-memory store.
pub fn memory_backends(store: &MemoryStore) -> Backends {
    let store = Arc::new(store.clone());
    Backends {
        boards: store.clone(),
        wins: store,
        identity: Arc::new(AnonIdentityProvider::new(None)),
    }
}

pub fn memory_session(store: &MemoryStore) -> Session {
    Session::new(memory_backends(store))
}

/// Waits for the next head change on a displaying session.
///
/// Panics if the feed fails, ends or stays quiet for [`UPDATE_TIMEOUT`].
pub async fn next_head(session: &mut Session) -> Win {
    let wait = async {
        loop {
            match session.next_update().await {
                Some(Ok(update)) => {
                    if let Some(changed) = update.head_changed {
                        return changed.win;
                    }
                }
                Some(Err(err)) => panic!("feed failed while waiting for a head: {err}"),
                None => panic!("feed ended while waiting for a head"),
            }
        }
    };
    match tokio::time::timeout(UPDATE_TIMEOUT, wait).await {
        Ok(win) => win,
        Err(_) => panic!("no head change within {UPDATE_TIMEOUT:?}"),
    }
}

/// Applies updates until the feed is quiet and returns how many head changes it saw.
pub async fn settle(session: &mut Session) -> usize {
    let mut heads = 0;
    while let Ok(Some(Ok(update))) = tokio::time::timeout(QUIET_PERIOD, session.next_update()).await {
        if update.head_changed.is_some() {
            heads += 1;
        }
    }
    heads
}
