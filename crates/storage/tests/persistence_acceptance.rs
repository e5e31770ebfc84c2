use std::sync::Arc;

use shared::domain::{ScoreRecord, TiePolicy};
use storage::{
    open_backend, BackendKind, PreferencesScoreBackend, ScoreBackend, ScoreStore,
    SqliteScoreBackend,
};

#[tokio::test]
async fn sqlite_record_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("nested").join("records.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    {
        let backend = open_backend(BackendKind::Sqlite, &database_url, None)
            .await
            .expect("open");
        let store = ScoreStore::open(backend, TiePolicy::StrictlyGreater).await;
        assert!(store.try_save_as(4, Some("ana")).await);
        assert!(store.try_save(7).await);
    }

    assert!(db_path.exists(), "database file should exist: {}", db_path.display());

    let reopened = SqliteScoreBackend::connect(&database_url)
        .await
        .expect("reopen");
    let store = ScoreStore::open(Arc::new(reopened), TiePolicy::StrictlyGreater).await;
    assert_eq!(store.best_score().await, 7);
    assert!(!store.try_save(6).await);
    assert_eq!(store.history(10).await.len(), 2);
}

#[tokio::test]
async fn preferences_file_keeps_a_single_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("prefs").join("simon.json");

    let backend = Arc::new(PreferencesScoreBackend::new(&path));
    let store = ScoreStore::open(backend.clone(), TiePolicy::StrictlyGreater).await;
    assert!(store.try_save(3).await);
    assert!(store.try_save_as(5, Some("luis")).await);

    let raw = std::fs::read_to_string(&path).expect("prefs written");
    assert!(raw.contains("\"record_score\": 5"), "unexpected file: {raw}");

    let history = store.history(10).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].player_name.as_deref(), Some("luis"));

    let fresh = ScoreStore::open(backend, TiePolicy::StrictlyGreater).await;
    assert_eq!(fresh.best_score().await, 5);
}

#[tokio::test]
async fn malformed_preferences_mean_no_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("simon.json");
    std::fs::write(&path, "{ not json").expect("write garbage");

    let backend = PreferencesScoreBackend::new(&path);
    assert_eq!(backend.load_best().await.expect("load"), None);

    std::fs::write(&path, r#"{"record_score": -3, "record_timestamp": 1}"#).expect("write");
    assert_eq!(backend.load_best().await.expect("load"), None);

    let store = ScoreStore::open(Arc::new(backend), TiePolicy::StrictlyGreater).await;
    assert!(store.try_save(1).await, "malformed data must not block a first record");
}

#[tokio::test]
async fn clearing_preferences_removes_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("simon.json");
    let backend = PreferencesScoreBackend::new(&path);

    backend
        .insert(&ScoreRecord::new(2, None))
        .await
        .expect("insert");
    assert!(path.exists());
    backend.clear().await.expect("clear");
    backend.clear().await.expect("clearing twice is fine");
    assert!(!path.exists());
}
