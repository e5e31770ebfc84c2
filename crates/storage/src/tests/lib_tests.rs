use super::*;
use anyhow::anyhow;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};

struct BrokenBackend {
    fail_reads: AtomicBool,
    fail_writes: bool,
    inner: MemoryScoreBackend,
}

impl BrokenBackend {
    fn reads_and_writes() -> Self {
        Self {
            fail_reads: AtomicBool::new(true),
            fail_writes: true,
            inner: MemoryScoreBackend::new(),
        }
    }

    fn reads_only(records: Vec<ScoreRecord>) -> Self {
        Self {
            fail_reads: AtomicBool::new(false),
            fail_writes: false,
            inner: MemoryScoreBackend::with_records(records),
        }
    }
}

#[async_trait]
impl ScoreBackend for BrokenBackend {
    async fn load_best(&self) -> Result<Option<ScoreRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("disk unavailable"));
        }
        self.inner.load_best().await
    }

    async fn insert(&self, record: &ScoreRecord) -> Result<()> {
        if self.fail_writes {
            return Err(anyhow!("disk full"));
        }
        self.inner.insert(record).await
    }

    async fn list(&self, limit: usize) -> Result<Vec<ScoreRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("disk unavailable"));
        }
        self.inner.list(limit).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}

fn record(score: u32, timestamp_millis: i64) -> ScoreRecord {
    ScoreRecord {
        score,
        timestamp_millis,
        player_name: None,
    }
}

#[tokio::test]
async fn saves_only_scores_above_the_current_best() {
    let store = ScoreStore::in_memory(TiePolicy::StrictlyGreater).await;
    assert_eq!(store.get_best().await, None);

    assert!(store.try_save(3).await);
    assert!(!store.try_save(3).await, "tie must not replace the record");
    assert!(!store.try_save(2).await);
    assert!(store.try_save_as(5, Some("ana")).await);

    let best = store.get_best().await.expect("best");
    assert_eq!(best.score, 5);
    assert_eq!(best.player_name.as_deref(), Some("ana"));
    assert_eq!(store.best_score().await, 5);
}

#[tokio::test]
async fn allow_equal_policy_accepts_ties() {
    let store = ScoreStore::in_memory(TiePolicy::AllowEqual).await;
    assert!(store.try_save(4).await);
    assert!(store.try_save_as(4, Some("second")).await);
    assert!(!store.try_save(3).await);
    assert_eq!(store.history(10).await.len(), 2);
}

#[tokio::test]
async fn zero_score_is_never_saved() {
    let store = ScoreStore::in_memory(TiePolicy::AllowEqual).await;
    assert!(!store.try_save(0).await);
    assert!(store.history(10).await.is_empty());
}

#[tokio::test]
async fn observe_yields_current_record_then_updates() {
    let store = ScoreStore::in_memory(TiePolicy::StrictlyGreater).await;
    let mut updates = store.observe();

    assert_eq!(updates.next().await, Some(None));
    assert!(store.try_save(2).await);
    let latest = updates.next().await.expect("update").expect("record");
    assert_eq!(latest.score, 2);

    assert!(store.clear().await);
    assert_eq!(updates.next().await, Some(None));
}

#[tokio::test]
async fn read_failures_degrade_to_no_record() {
    let store = ScoreStore::open(
        Arc::new(BrokenBackend::reads_and_writes()),
        TiePolicy::StrictlyGreater,
    )
    .await;

    assert_eq!(store.get_best().await, None);
    assert!(store.history(5).await.is_empty());
    assert!(!store.try_save(9).await, "write failure reports not saved");
    assert_eq!(*store.subscribe().borrow(), None);
}

#[tokio::test]
async fn failed_read_before_save_compares_against_last_known_record() {
    let backend = Arc::new(BrokenBackend::reads_only(vec![record(6, 10)]));
    let store = ScoreStore::open(backend.clone(), TiePolicy::StrictlyGreater).await;
    assert_eq!(store.subscribe().borrow().as_ref().map(|r| r.score), Some(6));

    backend.fail_reads.store(true, Ordering::SeqCst);
    assert!(!store.try_save(4).await);
    assert!(store.try_save(7).await);

    backend.fail_reads.store(false, Ordering::SeqCst);
    assert_eq!(store.best_score().await, 7);
}

#[tokio::test]
async fn memory_backend_ranks_best_first_and_newest_among_ties() {
    let backend = MemoryScoreBackend::with_records(vec![record(2, 1), record(5, 2), record(5, 3)]);
    let listed = backend.list(10).await.expect("list");
    let keys: Vec<_> = listed.iter().map(|r| (r.score, r.timestamp_millis)).collect();
    assert_eq!(keys, vec![(5, 3), (5, 2), (2, 1)]);
    assert_eq!(backend.load_best().await.expect("best"), Some(record(5, 3)));
}

#[tokio::test]
async fn sqlite_backend_keeps_history_ordered_by_score() {
    let backend = SqliteScoreBackend::connect("sqlite::memory:")
        .await
        .expect("db");
    backend.health_check().await.expect("health check");

    backend.insert(&record(3, 100)).await.expect("insert");
    backend.insert(&record(8, 200)).await.expect("insert");
    backend.insert(&record(5, 300)).await.expect("insert");

    let best = backend.load_best().await.expect("best").expect("some");
    assert_eq!(best.score, 8);
    let scores: Vec<_> = backend
        .list(2)
        .await
        .expect("list")
        .into_iter()
        .map(|r| r.score)
        .collect();
    assert_eq!(scores, vec![8, 5]);

    backend.clear().await.expect("clear");
    assert_eq!(backend.load_best().await.expect("best"), None);
}

#[tokio::test]
async fn sqlite_backend_prunes_to_retention_limit() {
    let backend = SqliteScoreBackend::connect("sqlite::memory:")
        .await
        .expect("db")
        .with_retention(Some(2));

    for (score, at) in [(1, 1), (4, 2), (2, 3), (6, 4)] {
        backend.insert(&record(score, at)).await.expect("insert");
    }

    let scores: Vec<_> = backend
        .list(10)
        .await
        .expect("list")
        .into_iter()
        .map(|r| r.score)
        .collect();
    assert_eq!(scores, vec![6, 4]);
}

#[tokio::test]
async fn sqlite_backend_skips_negative_scores() {
    let backend = SqliteScoreBackend::connect("sqlite::memory:")
        .await
        .expect("db");
    sqlx::query("INSERT INTO records (score, timestamp_millis) VALUES (-4, 1)")
        .execute(backend.pool())
        .await
        .expect("raw insert");

    assert_eq!(backend.load_best().await.expect("best"), None);
    backend.insert(&record(2, 5)).await.expect("insert");
    assert_eq!(
        backend.load_best().await.expect("best").map(|r| r.score),
        Some(2)
    );
}

#[tokio::test]
async fn sqlite_best_ignores_scores_beyond_round_range() {
    let backend = SqliteScoreBackend::connect("sqlite::memory:")
        .await
        .expect("db");
    sqlx::query("INSERT INTO records (score, timestamp_millis) VALUES (5000000000, 9)")
        .execute(backend.pool())
        .await
        .expect("raw insert");
    backend.insert(&record(3, 1)).await.expect("insert");
    backend.insert(&record(6, 2)).await.expect("insert");

    let best = backend.load_best().await.expect("best").expect("a record");
    assert_eq!(best.score, 6);
    assert_eq!(best.timestamp_millis, 2);
}

#[test]
fn parses_backend_names() {
    assert_eq!("SQLite".parse::<BackendKind>().expect("sqlite"), BackendKind::Sqlite);
    assert_eq!(
        "prefs".parse::<BackendKind>().expect("prefs"),
        BackendKind::Preferences
    );
    assert!("redis".parse::<BackendKind>().is_err());
    assert_eq!(BackendKind::Memory.to_string(), "memory");
}

#[test]
fn default_locations_match_backend_kind() {
    assert_eq!(BackendKind::Sqlite.default_location(), DEFAULT_DATABASE_URL);
    assert_eq!(
        BackendKind::Preferences.default_location(),
        DEFAULT_PREFERENCES_PATH
    );
    assert!(!DEFAULT_PREFERENCES_PATH.contains("://"));
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/simon.db"),
        "sqlite://./data/simon.db"
    );
    assert_eq!(
        normalize_database_url("sqlite:scores.db"),
        "sqlite://scores.db"
    );
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(normalize_database_url("  "), DEFAULT_DATABASE_URL);
}
