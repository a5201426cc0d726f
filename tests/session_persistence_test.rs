// Session store behaviour against the real file adapter.

use duet::adapters::FilePersistence;
use duet::models::{Message, Origin};
use duet::store::SessionStore;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_reopen_from_disk_restores_everything() {
    let dir = TempDir::new().unwrap();

    let (first, second, snapshot) = {
        let mut store = SessionStore::open(FilePersistence::new(dir.path()));
        let first = store.current_session_id().to_string();
        store.append_message(&first, Message::user("hello"));
        store.update_last_assistant_message(&first, "hi", Origin::Batch);

        let second = store.create_session();
        store.append_message(&second, Message::user("other"));
        (first, second, store.snapshot())
    };

    let store = SessionStore::open(FilePersistence::new(dir.path()));
    assert_eq!(store.snapshot(), snapshot);
    assert_eq!(store.current_session_id(), second);
    assert_eq!(store.messages(&first).len(), 2);
    assert_eq!(store.messages(&first)[1].origin, Origin::Batch);
}

#[test]
fn test_switch_is_persisted() {
    let dir = TempDir::new().unwrap();
    let first = {
        let mut store = SessionStore::open(FilePersistence::new(dir.path()));
        let first = store.current_session_id().to_string();
        store.create_session();
        store.switch_session(&first);
        first
    };

    let store = SessionStore::open(FilePersistence::new(dir.path()));
    assert_eq!(store.current_session_id(), first);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_delete_current_persists_replacement() {
    let dir = TempDir::new().unwrap();
    let replacement = {
        let mut store = SessionStore::open(FilePersistence::new(dir.path()));
        let only = store.current_session_id().to_string();
        store.delete_session(&only);
        store.current_session_id().to_string()
    };

    let store = SessionStore::open(FilePersistence::new(dir.path()));
    assert_eq!(store.len(), 1);
    assert_eq!(store.current_session_id(), replacement);
}

#[test]
fn test_damaged_pointer_keeps_history() {
    let dir = TempDir::new().unwrap();
    let id = {
        let mut store = SessionStore::open(FilePersistence::new(dir.path()));
        let id = store.current_session_id().to_string();
        store.append_message(&id, Message::user("remember me"));
        id
    };
    fs::write(dir.path().join("current_session.json"), "\"trunc").unwrap();

    let store = SessionStore::open(FilePersistence::new(dir.path()));
    assert_eq!(store.len(), 1);
    assert_eq!(store.current_session_id(), id);
    assert_eq!(store.messages(&id)[0].content, "remember me");

    let on_disk = fs::read_to_string(dir.path().join("sessions.json")).unwrap();
    assert!(on_disk.contains("remember me"));
}

#[test]
fn test_damaged_session_map_is_kept_aside() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("sessions.json"), "{ broken").unwrap();
    fs::write(dir.path().join("current_session.json"), "\"gone\"").unwrap();

    let store = SessionStore::open(FilePersistence::new(dir.path()));
    assert_eq!(store.len(), 1);
    assert!(store.current_session().unwrap().messages.is_empty());

    assert_eq!(
        fs::read_to_string(dir.path().join("sessions.json.corrupt")).unwrap(),
        "{ broken"
    );
    let reopened = SessionStore::open(FilePersistence::new(dir.path()));
    assert_eq!(reopened.current_session_id(), store.current_session_id());
}

#[test]
fn test_stored_layout_uses_two_keys() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::open(FilePersistence::new(dir.path()));

    let current: String =
        serde_json::from_str(&fs::read_to_string(dir.path().join("current_session.json")).unwrap())
            .unwrap();
    assert_eq!(current, store.current_session_id());

    let sessions: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("sessions.json")).unwrap())
            .unwrap();
    assert!(sessions.get(store.current_session_id()).is_some());
}

#[test]
fn test_unwritable_dir_keeps_memory_and_marks_dirty() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file in the way").unwrap();

    let mut store = SessionStore::open(FilePersistence::new(blocker.join("data")));
    assert!(store.is_dirty());

    let id = store.current_session_id().to_string();
    store.append_message(&id, Message::user("still here"));
    assert_eq!(store.messages(&id).len(), 1);
    assert!(!store.flush());
}
