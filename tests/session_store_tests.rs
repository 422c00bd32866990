use library_portal::{
    session::{Role, SESSION_KEY, Session, SessionStore},
    storage::{FileKeyValueStore, KeyValueState, KeyValueStore, MemoryKeyValueStore},
};
use std::{fs, path::PathBuf, sync::Arc};
use uuid::Uuid;

fn temp_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("library-portal-test-{}", Uuid::new_v4().simple()))
        .join("session.json")
}

fn file_backed(path: &PathBuf) -> SessionStore {
    let store = FileKeyValueStore::new(path.clone()).expect("temp store should open");
    SessionStore::new(Arc::new(store) as KeyValueState)
}

fn memory_backed(raw: &str) -> SessionStore {
    SessionStore::new(Arc::new(MemoryKeyValueStore::with_raw(SESSION_KEY, raw)) as KeyValueState)
}

fn alice() -> Session {
    Session {
        id: "u1".into(),
        full_name: "Alice Reader".into(),
        email: "alice@library.test".into(),
        role: Role::User,
    }
}

#[test]
fn test_write_then_read_round_trips() {
    let path = temp_path();
    let sessions = file_backed(&path);
    assert_eq!(sessions.read(), None);

    sessions.write(&alice()).unwrap();
    assert_eq!(sessions.read(), Some(alice()));
}

#[test]
fn test_session_survives_reopen() {
    let path = temp_path();
    file_backed(&path).write(&alice()).unwrap();

    // A fresh store over the same file sees the session.
    assert_eq!(file_backed(&path).read(), Some(alice()));
}

#[test]
fn test_write_replaces_previous_session() {
    let path = temp_path();
    let sessions = file_backed(&path);
    sessions.write(&alice()).unwrap();

    let admin = Session {
        id: "a1".into(),
        full_name: "Ada Admin".into(),
        email: "ada@library.test".into(),
        role: Role::Admin,
    };
    sessions.write(&admin).unwrap();
    assert_eq!(sessions.read(), Some(admin));
}

#[test]
fn test_clear_is_idempotent() {
    let path = temp_path();
    let sessions = file_backed(&path);
    sessions.write(&alice()).unwrap();

    sessions.clear().unwrap();
    sessions.clear().unwrap();
    assert_eq!(sessions.read(), None);
}

#[test]
fn test_stored_under_current_user_key() {
    let path = temp_path();
    file_backed(&path).write(&alice()).unwrap();

    let raw = FileKeyValueStore::new(path.clone())
        .unwrap()
        .get(SESSION_KEY)
        .unwrap()
        .expect("session key present");
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["fullName"], "Alice Reader");
    assert_eq!(json["role"], "user");
}

#[test]
fn test_malformed_records_read_as_signed_out() {
    for raw in [
        "not json at all",
        "{}",
        r#"{"id":"u1","fullName":"A","email":"a@b.co"}"#,
        r#"{"id":"u1","fullName":"A","email":"a@b.co","role":"librarian"}"#,
        r#"{"id":"","fullName":"A","email":"a@b.co","role":"user"}"#,
        r#"{"id":"   ","fullName":"A","email":"a@b.co","role":"admin"}"#,
        "null",
    ] {
        assert_eq!(memory_backed(raw).read(), None, "accepted {raw:?}");
    }
}

#[test]
fn test_extra_fields_are_ignored() {
    let raw = r#"{"id":"u1","fullName":"Alice Reader","email":"alice@library.test","role":"user","mobileNo":"0123456789"}"#;
    assert_eq!(memory_backed(raw).read(), Some(alice()));
}

#[test]
fn test_corrupt_file_reads_as_signed_out() {
    let path = temp_path();
    let sessions = file_backed(&path);
    fs::write(&path, "{ truncated").unwrap();

    assert_eq!(sessions.read(), None);

    // The next write heals the document.
    sessions.write(&alice()).unwrap();
    assert_eq!(sessions.read(), Some(alice()));
}

#[test]
fn test_unavailable_backend_reads_as_signed_out_but_write_fails() {
    let sessions = SessionStore::new(Arc::new(MemoryKeyValueStore::new_failing()) as KeyValueState);
    assert_eq!(sessions.read(), None);
    assert!(sessions.write(&alice()).is_err());
    assert!(sessions.clear().is_err());
}
