//! One relay turn at a time: history in, answer streamed, both recorded.

mod common;

use common::{RelayHarness, sse_stream};
use parley_llm::{Role, Turn};
use parley_memory::ConversationStore;
use parley_render::VecSink;
use parley_render::prompt::{assemble, memory_message};

/// Run one exchange the way the bot does and return the answer.
async fn exchange(harness: &RelayHarness, user_id: &str, author: &str, text: &str) -> String {
    let history = harness.store.read(user_id);
    harness
        .store
        .append(user_id, author, &memory_message(text, &[]), Role::User)
        .await
        .unwrap();

    let turns = assemble("You are helpful.", &history, author, text, &[]);
    let sink = VecSink::new();
    let answer = harness.renderer.render(&turns, &sink).await;
    if !answer.is_empty() {
        harness
            .store
            .append(user_id, author, &answer, Role::Assistant)
            .await
            .unwrap();
    }
    answer
}

#[tokio::test]
async fn exchange_is_recorded_and_persisted() {
    let mut harness = RelayHarness::new().await;
    let _mock = harness.serve_stream(sse_stream(&["Hi ", "Ana!"])).await;

    let answer = exchange(&harness, "42", "Ana", "hello").await;
    assert_eq!(answer, "Hi Ana!");

    let expected = vec![Turn::user("Ana: hello"), Turn::assistant("Hi Ana!")];
    assert_eq!(harness.store.read("42"), expected);

    let reopened = ConversationStore::open(harness.store_path(), 6).unwrap();
    assert_eq!(reopened.read("42"), expected);
    assert_eq!(reopened.snapshot()["42"].display_name, "Ana");
}

#[tokio::test]
async fn history_precedes_new_message_once() {
    let mut harness = RelayHarness::new().await;
    let _mock = harness.serve_stream(sse_stream(&["first"])).await;
    exchange(&harness, "42", "Ana", "one").await;

    let history = harness.store.read("42");
    let turns = assemble("sys", &history, "Ana", "two", &[]);

    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0], Turn::system("sys"));
    assert_eq!(turns[1], Turn::user("Ana: one"));
    assert_eq!(turns[2], Turn::assistant("first"));
    assert_eq!(turns[3].role, Role::User);
    let user_turns = turns.iter().filter(|t| t.role == Role::User).count();
    assert_eq!(user_turns, 2);
}

#[tokio::test]
async fn window_keeps_latest_six_turns() {
    let mut harness = RelayHarness::new().await;
    let _mock = harness.serve_stream(sse_stream(&["ack"])).await;

    for i in 0..5 {
        exchange(&harness, "7", "Bo", &format!("message {i}")).await;
    }

    let turns = harness.store.read("7");
    assert_eq!(turns.len(), 6);
    assert_eq!(turns[0], Turn::user("Bo: message 2"));
    assert_eq!(turns[5], Turn::assistant("ack"));
}

#[tokio::test]
async fn failed_answer_leaves_user_turn_unanswered() {
    let mut harness = RelayHarness::new().await;
    let _mock = harness
        .server
        .mock("POST", "/")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let answer = exchange(&harness, "9", "Cy", "anyone there?").await;

    assert_eq!(answer, "");
    assert_eq!(harness.store.read("9"), vec![Turn::user("Cy: anyone there?")]);
}

#[tokio::test]
async fn users_do_not_share_windows() {
    let mut harness = RelayHarness::new().await;
    let _mock = harness.serve_stream(sse_stream(&["sure"])).await;

    exchange(&harness, "1", "Ana", "a").await;
    exchange(&harness, "2", "Bo", "b").await;

    assert_eq!(harness.store.read("1")[0], Turn::user("Ana: a"));
    assert_eq!(harness.store.read("2")[0], Turn::user("Bo: b"));
    assert!(harness.store.purge("1").await.unwrap());
    assert!(harness.store.read("1").is_empty());
    assert_eq!(harness.store.read("2").len(), 2);
}
