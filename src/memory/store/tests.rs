use super::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_load_creates_missing_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("memory").join("history.json");
    let store = JsonFileStore::open(&path).unwrap();

    let messages = store.load().await.unwrap();
    assert!(messages.is_empty());
    assert!(path.exists());
    let on_disk: Vec<Message> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(on_disk.is_empty());
}

#[tokio::test]
async fn test_persist_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");
    let store = JsonFileStore::open(&path).unwrap();

    let log = vec![Message::human("seed"), Message::assistant("plan")];
    store.persist(&log).await.unwrap();
    assert_eq!(store.load().await.unwrap(), log);
}

#[tokio::test]
async fn test_on_disk_schema_is_role_content_array() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");
    let store = JsonFileStore::open(&path).unwrap();
    store
        .persist(&[Message::human("hi"), Message::assistant("hello")])
        .await
        .unwrap();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        raw,
        serde_json::json!([
            {"role": "user", "content": "hi"},
            {"role": "assistant", "content": "hello"}
        ])
    );
}

#[tokio::test]
async fn test_load_reads_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");
    fs::write(
        &path,
        r#"[{"role": "user", "content": "Let's build"}, {"role": "assistant", "content": "Sure"}]"#,
    )
    .unwrap();

    let store = JsonFileStore::open(&path).unwrap();
    let messages = store.load().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1], Message::assistant("Sure"));
}

#[tokio::test]
async fn test_corrupt_store_is_store_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");
    fs::write(&path, "{not json").unwrap();

    let store = JsonFileStore::open(&path).unwrap();
    match store.load().await {
        Err(ColloquyError::Store(msg)) => assert!(msg.contains("parse")),
        other => panic!("expected Store error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_role_is_store_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");
    fs::write(&path, r#"[{"role": "system", "content": "x"}]"#).unwrap();

    let store = JsonFileStore::open(&path).unwrap();
    assert!(matches!(store.load().await, Err(ColloquyError::Store(_))));
}

#[test]
fn test_second_open_is_locked_out() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");
    let first = JsonFileStore::open(&path).unwrap();

    match JsonFileStore::open(&path) {
        Err(ColloquyError::Store(msg)) => assert!(msg.contains("in use")),
        Err(other) => panic!("expected Store error, got {:?}", other),
        Ok(_) => panic!("second store should not acquire the lock"),
    }

    drop(first);
    assert!(JsonFileStore::open(&path).is_ok());
}

#[test]
fn test_lock_path_is_sibling() {
    assert_eq!(
        lock_path(Path::new("memory/history.json")),
        PathBuf::from("memory/history.json.lock")
    );
}

#[tokio::test]
async fn test_persist_failure_is_persistence_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.json");
    let store = JsonFileStore::open(&path).unwrap();
    // A directory at the target path makes the rename fail
    fs::create_dir(&path).unwrap();

    assert!(matches!(
        store.persist(&[Message::human("x")]).await,
        Err(ColloquyError::Persistence(_))
    ));
}

#[tokio::test]
async fn test_in_memory_store() {
    let store = InMemoryStore::with_messages(vec![Message::human("seed")]);
    assert_eq!(store.load().await.unwrap().len(), 1);

    store
        .persist(&[Message::human("seed"), Message::assistant("reply")])
        .await
        .unwrap();
    assert_eq!(store.snapshot().len(), 2);
    assert!(InMemoryStore::new().load().await.unwrap().is_empty());
}
