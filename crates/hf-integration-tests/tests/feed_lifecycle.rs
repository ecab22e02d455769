//! Subscribing, failing, resubscribing and tearing down a board's feed.

use std::sync::Arc;

use hf_core::error::AppError;
use hf_integration_tests::{init_logging, memory_session, next_head, settle, UPDATE_TIMEOUT};
use hf_session::{FeedSynchronizer, Session};
use hf_store_memory::MemoryStore;

async fn wait_for_feed_error(session: &mut Session) {
    let wait = async {
        loop {
            match session.next_update().await {
                Some(Ok(_)) => continue,
                Some(Err(AppError::Feed(_))) => return,
                other => panic!("expected a feed error, got {other:?}"),
            }
        }
    };
    tokio::time::timeout(UPDATE_TIMEOUT, wait)
        .await
        .expect("feed error within timeout");
}

#[tokio::test]
async fn test_feed_error_then_resubscribe() {
    init_logging();
    let store = MemoryStore::new();
    let mut host = memory_session(&store);
    let mut participant = memory_session(&store);

    let board = host.create_board("Weekly Sync", false).await.unwrap();
    settle(&mut host).await;

    store.set_offline(true);
    wait_for_feed_error(&mut host).await;
    assert!(host.next_update().await.is_none());
    assert!(matches!(host.resubscribe().await, Err(AppError::Feed(_))));

    store.set_offline(false);
    host.resubscribe().await.unwrap();
    settle(&mut host).await;

    participant.join(board.code.as_str()).await.unwrap();
    participant.set_draft("Back online");
    participant.submit().await.unwrap();
    assert_eq!(next_head(&mut host).await.text, "Back online");
}

#[tokio::test]
async fn test_unsubscribe_twice_is_a_no_op() {
    init_logging();
    let store = MemoryStore::new();
    let mut host = memory_session(&store);
    let board = host.create_board("Lunch & Learn", false).await.unwrap();

    let sync = FeedSynchronizer::new(Arc::new(store.clone()));
    let mut feed = sync.subscribe(&board.id).await.unwrap();
    assert!(feed.recv().await.unwrap().is_ok());
    assert!(feed.is_active());

    feed.unsubscribe();
    feed.unsubscribe();
    assert!(!feed.is_active());
    assert!(feed.recv().await.is_none());
    assert_eq!(feed.board_id(), &board.id);
}

#[tokio::test]
async fn test_left_display_receives_nothing() {
    init_logging();
    let store = MemoryStore::new();
    let mut host = memory_session(&store);
    let mut participant = memory_session(&store);

    let board = host.create_board("Town Hall", false).await.unwrap();
    settle(&mut host).await;
    host.back().unwrap();

    participant.join(board.code.as_str()).await.unwrap();
    participant.set_draft("Nobody is watching");
    participant.submit().await.unwrap();

    assert!(host.next_update().await.is_none());
    assert!(host.feed().is_none());
}

#[tokio::test]
async fn test_switching_boards_follows_only_the_new_one() {
    init_logging();
    let store = MemoryStore::new();
    let mut host = memory_session(&store);
    let mut old_room = memory_session(&store);
    let mut new_room = memory_session(&store);

    let first = host.create_board("Morning", false).await.unwrap();
    let second = host.create_board("Afternoon", false).await.unwrap();
    settle(&mut host).await;

    old_room.join(first.code.as_str()).await.unwrap();
    old_room.set_draft("For the old board");
    old_room.submit().await.unwrap();
    assert_eq!(settle(&mut host).await, 0);
    assert!(host.feed().unwrap().is_empty());

    new_room.join(second.code.as_str()).await.unwrap();
    new_room.set_draft("For the new board");
    new_room.submit().await.unwrap();
    assert_eq!(next_head(&mut host).await.text, "For the new board");
}
