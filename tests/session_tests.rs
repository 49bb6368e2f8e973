//! Session token tests

use async_trait::async_trait;
use shortener::auth::{SessionSealer, SessionStore, load_user, open_session};
use shortener::errors::{Result, ShortenerError};
use shortener::storage::{MemoryStore, Storage};
use std::collections::HashMap;
use std::sync::Mutex;

/// 记录所有写入的会话
#[derive(Default)]
struct RecordingStore {
    sessions: Mutex<HashMap<String, String>>,
    fail_loads: bool,
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn load_user(&self, session: &str) -> Result<Option<String>> {
        if self.fail_loads {
            return Err(ShortenerError::database_connection("backend down"));
        }
        Ok(self.sessions.lock().unwrap().get(session).cloned())
    }

    async fn store_session(&self, owner_id: &str, session: &str) -> Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.to_string(), owner_id.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn test_open_session_stores_opaque_value_not_token() {
    let store = RecordingStore::default();
    let (owner, token) = open_session(&store).await.unwrap();

    assert!(uuid::Uuid::parse_str(&owner).is_ok());

    let sessions = store.sessions.lock().unwrap().clone();
    assert_eq!(sessions.len(), 1);
    let (opaque, stored_owner) = sessions.into_iter().next().unwrap();
    assert_eq!(stored_owner, owner);
    // 16 随机字节的 hex
    assert_eq!(opaque.len(), 32);
    assert_ne!(opaque, token);

    let sealer = SessionSealer::builtin().unwrap();
    assert_eq!(sealer.unseal(&token).unwrap(), opaque);
    assert_eq!(sealer.seal(&opaque).unwrap(), token);
}

#[tokio::test]
async fn test_session_round_trip() {
    let store = RecordingStore::default();
    let (owner, token) = open_session(&store).await.unwrap();
    assert_eq!(load_user(&token, &store).await.unwrap(), Some(owner));
}

#[tokio::test]
async fn test_sessions_are_distinct() {
    let store = RecordingStore::default();
    let (owner_a, token_a) = open_session(&store).await.unwrap();
    let (owner_b, token_b) = open_session(&store).await.unwrap();
    assert_ne!(owner_a, owner_b);
    assert_ne!(token_a, token_b);
}

#[tokio::test]
async fn test_garbage_token_yields_none() {
    let store = RecordingStore::default();
    assert_eq!(load_user("", &store).await.unwrap(), None);
    assert_eq!(load_user("zzzz", &store).await.unwrap(), None);
    assert_eq!(load_user("00112233445566778899", &store).await.unwrap(), None);
}

#[tokio::test]
async fn test_valid_token_for_unknown_session() {
    let store = RecordingStore::default();
    let token = SessionSealer::builtin().unwrap().seal("never-stored").unwrap();
    assert_eq!(load_user(&token, &store).await.unwrap(), None);
}

#[tokio::test]
async fn test_backend_errors_propagate() {
    let store = RecordingStore {
        fail_loads: true,
        ..RecordingStore::default()
    };
    let token = SessionSealer::builtin().unwrap().seal("opaque").unwrap();
    let err = load_user(&token, &store).await.unwrap_err();
    assert!(matches!(err, ShortenerError::DatabaseConnection(_)));
}

#[tokio::test]
async fn test_storage_facade_as_session_store() {
    let storage = Storage::new(MemoryStore::new());
    let (owner, token) = open_session(&storage).await.unwrap();
    assert_eq!(load_user(&token, &storage).await.unwrap(), Some(owner));
    assert_eq!(storage.count_users().await.unwrap(), 1);
}
