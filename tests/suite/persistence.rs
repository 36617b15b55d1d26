//! Session state across engine restarts.

use std::sync::Arc;

use tempfile::TempDir;

use waypoint_engine::{Engine, FileSessionStore, SessionStore, TurnInput};
use waypoint_types::{ConversationId, NonEmptyString, UserScope};

use crate::common::{panels, t0};

fn engine(store: &Arc<FileSessionStore>) -> Engine {
    Engine::builder().store(store.clone()).build()
}

fn input(text: &str) -> TurnInput {
    TurnInput::new(
        ConversationId::new("team/chat 1"),
        NonEmptyString::new(text).unwrap(),
        UserScope::new("user-1"),
        t0(),
    )
    .with_panels(panels())
}

#[tokio::test]
async fn histories_survive_a_restart_but_rejections_do_not() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileSessionStore::new(dir.path()).unwrap());
    let conversation = ConversationId::new("team/chat 1");

    let first = engine(&store);
    first.handle_turn(input("open panel e")).await;
    first.handle_turn(input("dmo wiget")).await;
    first.handle_turn(input("no")).await;
    assert!(!first.snapshot(&conversation).await.rejected().is_empty());

    let restarted = engine(&store);
    let state = restarted.snapshot(&conversation).await;
    assert_eq!(state.request_history().len(), 1);
    assert_eq!(state.action_history().len(), 1);
    assert!(state.rejected().is_empty());
    assert!(state.last_suggestion().is_none());

    let saved = store.load(&conversation).await.unwrap();
    assert!(saved.is_some());
    assert!(store.path_for(&conversation).ends_with("team_chat_1.json"));
}
