use std::sync::atomic::{AtomicBool, Ordering};

use agent_relay::orchestrator::chat_handle::ChatHandleStore;
use agent_relay::AppError;

#[tokio::test]
async fn existing_handle_is_reused_without_creation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".vibe-agent-chat");
    std::fs::write(&path, "abc123\n").unwrap();

    let called = AtomicBool::new(false);
    let store = ChatHandleStore::new(&path);
    let handle = store
        .get_or_create(|| async {
            called.store(true, Ordering::SeqCst);
            Ok("other".to_owned())
        })
        .await
        .unwrap();

    assert_eq!(handle, "abc123");
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn missing_handle_is_created_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat");
    let store = ChatHandleStore::new(&path);

    let handle = store
        .get_or_create(|| async { Ok("  new-chat \n".to_owned()) })
        .await
        .unwrap();

    assert_eq!(handle, "new-chat");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "new-chat");
}

#[tokio::test]
async fn empty_file_triggers_creation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat");
    std::fs::write(&path, "   \n").unwrap();
    let store = ChatHandleStore::new(&path);

    let handle = store
        .get_or_create(|| async { Ok("fresh".to_owned()) })
        .await
        .unwrap();

    assert_eq!(handle, "fresh");
    assert_eq!(store.load().await.unwrap().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn creation_failure_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat");
    let store = ChatHandleStore::new(&path);

    let err = store
        .get_or_create(|| async { Err(AppError::Agent("create-chat failed".into())) })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Agent(_)));
    assert!(!path.exists());
}

#[tokio::test]
async fn empty_created_handle_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = ChatHandleStore::new(dir.path().join("chat"));

    let err = store
        .get_or_create(|| async { Ok("\n".to_owned()) })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Agent(_)));
}

#[cfg(unix)]
mod cli {
    use agent_relay::config::AgentConfig;
    use agent_relay::orchestrator::chat_handle::create_chat;
    use agent_relay::AppError;

    #[tokio::test]
    async fn create_chat_returns_trimmed_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig {
            program: "echo".into(),
            create_chat_args: vec!["chat-42".into()],
            ..AgentConfig::default()
        };
        let id = create_chat(&config, dir.path()).await.unwrap();
        assert_eq!(id, "chat-42");
    }

    #[tokio::test]
    async fn create_chat_fails_on_nonzero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let config = AgentConfig {
            program: "false".into(),
            create_chat_args: Vec::new(),
            ..AgentConfig::default()
        };
        let err = create_chat(&config, dir.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Agent(_)));
    }
}
