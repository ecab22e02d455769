//! # High Five Binary
//!
//! Headless display host. Assembles the plugins selected at compile time, creates a board,
//! then logs every new head of its feed until Ctrl-C.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hf_config::{Settings, StoreBackend};
use hf_core::traits::{BoardRepo, IdentityProvider, WinRepo};
use hf_session::{Backends, Session};
use log::{debug, info, warn};

// Feature-gated plugins
#[cfg(feature = "store-memory")]
use hf_store_memory::MemoryStore;

#[cfg(feature = "store-sqlite")]
use hf_store_sqlite::SqliteStore;

#[cfg(feature = "auth-anon")]
use hf_auth_anon::AnonIdentityProvider;

/// Pause before reopening a feed that failed.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(3);

type Stores = (Arc<dyn BoardRepo>, Arc<dyn WinRepo>);

async fn open_store(settings: &Settings) -> anyhow::Result<Stores> {
    match settings.store.backend {
        #[cfg(feature = "store-memory")]
        StoreBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            Ok((store.clone() as Arc<dyn BoardRepo>, store as Arc<dyn WinRepo>))
        }
        #[cfg(feature = "store-sqlite")]
        StoreBackend::Sqlite => {
            let store = SqliteStore::new(&settings.store.url)
                .await
                .with_context(|| format!("opening {}", settings.store.url))?
                .with_poll_interval(settings.store.poll_interval());
            let store = Arc::new(store);
            Ok((store.clone() as Arc<dyn BoardRepo>, store as Arc<dyn WinRepo>))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("store backend {other:?} is not compiled into this binary"),
    }
}

#[cfg(feature = "auth-anon")]
fn identity(settings: &Settings) -> Arc<dyn IdentityProvider> {
    if settings.identity.enabled {
        Arc::new(AnonIdentityProvider::new(settings.identity.persist_path.clone()))
    } else {
        Arc::new(AnonIdentityProvider::disabled())
    }
}

#[cfg(not(feature = "auth-anon"))]
fn identity(_settings: &Settings) -> Arc<dyn IdentityProvider> {
    struct NoIdentity;

    #[async_trait::async_trait]
    impl IdentityProvider for NoIdentity {
        async fn ensure_identity(&self) -> anyhow::Result<Option<hf_core::models::Principal>> {
            Ok(None)
        }
    }

    Arc::new(NoIdentity)
}

/// Logs feed updates until `shutdown` resolves, reopening the feed whenever it drops.
/// Leaves display mode on the way out.
async fn run_display(
    session: &mut Session,
    shutdown: impl Future<Output = ()>,
) -> hf_core::error::Result<()> {
    tokio::pin!(shutdown);
    let mut feed_down = false;

    loop {
        if feed_down {
            tokio::select! {
                _ = tokio::time::sleep(RESUBSCRIBE_DELAY) => {}
                _ = &mut shutdown => break,
            }
            tokio::select! {
                result = session.resubscribe() => match result {
                    Ok(()) => feed_down = false,
                    Err(err) => {
                        warn!("Resubscribe failed: {err}");
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            }
        }

        tokio::select! {
            update = session.next_update() => match update {
                Some(Ok(update)) => match update.head_changed {
                    Some(changed) => info!("{} {}", changed.win.emoji, changed.win.text),
                    None => debug!("Feed shows {} wins", update.len),
                },
                Some(Err(err)) => warn!("Feed lost: {err}"),
                None => feed_down = true,
            },
            _ = &mut shutdown => break,
        }
    }

    session.back()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Settings first so RUST_LOG from .env is honoured
    let settings = Settings::load()?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let (boards, wins) = open_store(&settings).await?;
    let backends = Backends {
        boards,
        wins,
        identity: identity(&settings),
    };

    let mut session = Session::new(backends).with_code_attempts(settings.board.code_attempts);
    session.start().await;

    if let Err(err) = session
        .create_board(&settings.board.name, settings.board.moderation)
        .await
    {
        // The board may exist even though its feed did not open
        if session.board().is_none() {
            return Err(err).context("creating the board");
        }
        warn!("Board created but its feed is unavailable: {err}");
    }
    let board = session
        .board()
        .cloned()
        .context("session has no board after creating one")?;
    info!("🙌 \"{}\" is live. Join code: {}", board.name, board.code);

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {err}");
        }
    };
    run_display(&mut session, shutdown).await?;
    info!("Display closed");
    Ok(())
}
