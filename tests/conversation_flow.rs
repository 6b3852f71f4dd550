mod common;

use colloquy::agent::PROVIDER_ERROR_MARKER;
use colloquy::config::DEFAULT_SEED_PROMPT;
use colloquy::memory::{ConversationMemory, InMemoryStore, JsonFileStore, Message, Role};
use common::{MockLLMProvider, orchestrator};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_log_grows_one_entry_per_turn_and_reloads() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("memory").join("history.json");

    let builder = MockLLMProvider::with_responses(vec!["plan A", "plan B", "plan C"]);
    let judge = MockLLMProvider::with_responses(vec!["critique A", "critique B", "critique C"]);
    let store = Arc::new(JsonFileStore::open(&path).expect("open store"));
    let mut orch = orchestrator(builder, judge, store, vec!["", "  ", ""]).await;

    for _ in 0..3 {
        let outcome = orch.run_round().await.expect("round");
        assert!(!outcome.closed);
    }
    // seed + 3 rounds x 2 turns
    assert_eq!(orch.memory().len(), 1 + 6);
    let written = orch.memory().messages().to_vec();
    drop(orch);

    let reopened = Arc::new(JsonFileStore::open(&path).expect("reopen store"));
    let reloaded = ConversationMemory::open(reopened).await.expect("reload");
    assert_eq!(reloaded.messages(), written.as_slice());
    assert_eq!(reloaded.messages()[0], Message::human(DEFAULT_SEED_PROMPT));
}

#[tokio::test]
async fn test_resumed_session_continues_from_last_entry() {
    let tmp = TempDir::new().expect("create temp dir");
    let path = tmp.path().join("history.json");
    std::fs::write(
        &path,
        r#"[
  {"role": "user", "content": "Build a portfolio site"},
  {"role": "assistant", "content": "Use a static generator"},
  {"role": "assistant", "content": "Static is fine, add analytics"},
  {"role": "user", "content": "Make it bilingual"}
]"#,
    )
    .expect("write history");

    let builder = MockLLMProvider::with_responses(vec!["Add i18n routing"]);
    let judge = MockLLMProvider::with_responses(vec!["Routing plan is sound"]);
    let store = Arc::new(JsonFileStore::open(&path).expect("open store"));
    let mut orch = orchestrator(builder.clone(), judge, store, vec![""]).await;

    let outcome = orch.run_round().await.expect("round");
    assert_eq!(outcome.builder_input, "Make it bilingual");

    // Builder sees role prompt + full history + input
    let call = &builder.calls()[0];
    assert_eq!(call.messages.len(), 1 + 4 + 1);
    assert_eq!(call.messages[0].role, "system");
    assert_eq!(call.input(), "Make it bilingual");
    assert_eq!(orch.memory().len(), 6);
}

#[tokio::test]
async fn test_judge_sees_builder_reply_and_full_history() {
    let builder = MockLLMProvider::with_responses(vec!["Use Next.js"]);
    let judge = MockLLMProvider::with_responses(vec!["Too heavy for a landing page"]);
    let store = Arc::new(InMemoryStore::new());
    let mut orch = orchestrator(builder, judge.clone(), store, vec![""]).await;

    orch.run_round().await.expect("round");

    let call = &judge.calls()[0];
    assert_eq!(call.input(), "Use Next.js");
    // system + seed + builder reply + input
    assert_eq!(call.messages.len(), 4);
    assert_eq!(call.messages[2].role, "assistant");
    assert_eq!(call.messages[2].content, "Use Next.js");
}

#[tokio::test]
async fn test_judge_failure_renders_inline_and_waits_for_human() {
    let builder = MockLLMProvider::with_responses(vec!["plan A", "plan B"]);
    let judge = MockLLMProvider::failing("503 Service Unavailable");
    let store = Arc::new(InMemoryStore::new());
    let mut orch = orchestrator(builder.clone(), judge, store.clone(), vec!["try again"]).await;

    let outcome = orch.run_round().await.expect("round survives provider failure");
    assert!(outcome.judge_reply.contains(PROVIDER_ERROR_MARKER));
    assert!(outcome.judge_reply.contains("Judy"));
    assert!(outcome.judge_reply.contains("503"));
    assert_eq!(outcome.interjection.as_deref(), Some("try again"));

    let log = store.snapshot();
    let placeholders = log
        .iter()
        .filter(|m| m.role == Role::Assistant && m.content.contains(PROVIDER_ERROR_MARKER))
        .count();
    assert_eq!(placeholders, 1);

    // The next round proceeds from the human line
    let next = orch.run_round().await.expect("second round");
    assert_eq!(next.builder_input, "try again");
}

#[tokio::test]
async fn test_builder_failure_feeds_placeholder_to_judge() {
    let builder = MockLLMProvider::failing("connection reset");
    let judge = MockLLMProvider::with_responses(vec!["Nothing to review"]);
    let store = Arc::new(InMemoryStore::new());
    let mut orch = orchestrator(builder, judge.clone(), store, vec![""]).await;

    let outcome = orch.run_round().await.expect("round");
    assert!(outcome.builder_reply.contains(PROVIDER_ERROR_MARKER));
    assert_eq!(judge.calls()[0].input(), outcome.builder_reply);
}

#[tokio::test]
async fn test_interjections_shape_the_next_round() {
    let builder = MockLLMProvider::with_responses(vec!["plan A", "plan B", "plan C"]);
    let judge = MockLLMProvider::with_responses(vec!["critique A", "critique B", "critique C"]);
    let store = Arc::new(InMemoryStore::new());
    let mut orch = orchestrator(
        builder.clone(),
        judge,
        store.clone(),
        vec!["\t ", "Focus on accessibility", ""],
    )
    .await;

    orch.run_round().await.expect("round 1");
    orch.run_round().await.expect("round 2");
    orch.run_round().await.expect("round 3");

    let inputs: Vec<String> = builder.calls().iter().map(|c| c.input().to_string()).collect();
    assert_eq!(
        inputs,
        vec![
            DEFAULT_SEED_PROMPT.to_string(),
            "critique A".to_string(),
            "Focus on accessibility".to_string(),
        ]
    );

    let log = store.snapshot();
    assert_eq!(log.len(), 1 + 6 + 1);
    assert_eq!(log[5], Message::human("Focus on accessibility"));
}

#[tokio::test]
async fn test_run_returns_when_input_ends() {
    let builder = MockLLMProvider::with_responses(vec![]);
    let judge = MockLLMProvider::with_responses(vec![]);
    let store = Arc::new(InMemoryStore::new());
    let mut orch = orchestrator(builder, judge, store.clone(), vec![]).await;

    orch.run().await.expect("clean end of input");
    assert_eq!(orch.rounds(), 1);
    assert_eq!(store.snapshot().len(), 3);
}
