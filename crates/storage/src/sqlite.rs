use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use shared::domain::ScoreRecord;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use tracing::warn;

use crate::ScoreBackend;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://./data/simon.db";

/// Record history kept in a SQLite `records` table.
#[derive(Clone)]
pub struct SqliteScoreBackend {
    pool: Pool<Sqlite>,
    retention: Option<usize>,
}

impl SqliteScoreBackend {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let database_url = normalize_database_url(database_url);
        let database_url = database_url.as_str();
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new().max_connections(4);
        if is_memory_url(database_url) {
            // Every connection to `sqlite::memory:` opens its own database.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply records migration")?;
        Ok(Self {
            pool,
            retention: None,
        })
    }

    /// Keep only the `limit` best records after every insert.
    pub fn with_retention(mut self, limit: Option<usize>) -> Self {
        self.retention = limit.filter(|limit| *limit > 0);
        self
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn prune(&self, keep: usize) -> Result<()> {
        let keep = i64::try_from(keep).unwrap_or(i64::MAX);
        let pruned = sqlx::query(
            "DELETE FROM records WHERE id NOT IN (
                 SELECT id FROM records
                 ORDER BY score DESC, timestamp_millis DESC, id DESC
                 LIMIT ?
             )",
        )
        .bind(keep)
        .execute(&self.pool)
        .await
        .context("failed to prune record history")?
        .rows_affected();
        if pruned > 0 {
            tracing::debug!(pruned, keep, "storage: pruned record history");
        }
        Ok(())
    }
}

#[async_trait]
impl ScoreBackend for SqliteScoreBackend {
    async fn load_best(&self) -> Result<Option<ScoreRecord>> {
        let row = sqlx::query(
            "SELECT score, timestamp_millis, player_name
             FROM records
             WHERE score BETWEEN 0 AND 4294967295
             ORDER BY score DESC, timestamp_millis DESC, id DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("failed to query best record")?;
        Ok(row.as_ref().and_then(decode_record))
    }

    async fn insert(&self, record: &ScoreRecord) -> Result<()> {
        sqlx::query("INSERT INTO records (score, timestamp_millis, player_name) VALUES (?, ?, ?)")
            .bind(i64::from(record.score))
            .bind(record.timestamp_millis)
            .bind(record.player_name.as_deref())
            .execute(&self.pool)
            .await
            .context("failed to insert record")?;
        if let Some(keep) = self.retention {
            self.prune(keep).await?;
        }
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<ScoreRecord>> {
        let rows = sqlx::query(
            "SELECT score, timestamp_millis, player_name
             FROM records
             ORDER BY score DESC, timestamp_millis DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list records")?;
        Ok(rows.iter().filter_map(decode_record).take(limit).collect())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM records")
            .execute(&self.pool)
            .await
            .context("failed to delete records")?;
        Ok(())
    }
}

/// Rows whose score does not fit a round count are skipped as malformed.
fn decode_record(row: &SqliteRow) -> Option<ScoreRecord> {
    let score = match row.try_get::<i64, _>("score") {
        Ok(score) => score,
        Err(error) => {
            warn!(%error, "storage: skipping record with unreadable score");
            return None;
        }
    };
    let Ok(score) = u32::try_from(score) else {
        warn!(score, "storage: skipping record with out-of-range score");
        return None;
    };
    Some(ScoreRecord {
        score,
        timestamp_millis: row.try_get::<i64, _>("timestamp_millis").unwrap_or_default(),
        player_name: row
            .try_get::<Option<String>, _>("player_name")
            .ok()
            .flatten(),
    })
}

/// Accepts what a player would type for `--database-url`: a bare path such
/// as `./data/simon.db`, `sqlite:scores.db`, or a full url. Blank input
/// selects the default records database.
pub fn normalize_database_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return DEFAULT_DATABASE_URL.to_string();
    }
    if raw.contains("://") || raw.starts_with("sqlite::memory:") {
        return raw.to_string();
    }
    let path = raw.strip_prefix("sqlite:").unwrap_or(raw);
    format!("sqlite://{}", path.replace('\\', "/"))
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

/// Creates the directory the records file will live in.
fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(dir) = records_file(database_url)
        .as_deref()
        .and_then(Path::parent)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
    else {
        return Ok(());
    };
    fs::create_dir_all(&dir).with_context(|| {
        format!("cannot create records directory '{}'", dir.display())
    })
}

/// On-disk file behind a sqlite url; `None` for in-memory databases.
fn records_file(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) {
        return None;
    }
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or_default();
    (!path.is_empty()).then(|| PathBuf::from(path))
}
