//! Durable best-score record behind a degrading facade.
//!
//! Backends report failures through `anyhow::Result`; [`ScoreStore`] catches
//! them, logs, and falls back to "no record" so a broken disk never stops a
//! game.

use std::{fmt, str::FromStr, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::domain::{ScoreRecord, TiePolicy};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

mod memory;
mod preferences;
mod sqlite;

pub use memory::MemoryScoreBackend;
pub use preferences::{PreferencesScoreBackend, DEFAULT_PREFERENCES_PATH};
pub use sqlite::{normalize_database_url, SqliteScoreBackend, DEFAULT_DATABASE_URL};

#[async_trait]
pub trait ScoreBackend: Send + Sync {
    /// Highest stored record, newest first among equal scores.
    async fn load_best(&self) -> Result<Option<ScoreRecord>>;
    async fn insert(&self, record: &ScoreRecord) -> Result<()>;
    /// Records ordered best first.
    async fn list(&self, limit: usize) -> Result<Vec<ScoreRecord>>;
    async fn clear(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Preferences,
    Memory,
}

#[derive(Debug, Error)]
#[error("unknown score backend '{0}'; expected sqlite, preferences or memory")]
pub struct ParseBackendError(String);

impl FromStr for BackendKind {
    type Err = ParseBackendError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "db" => Ok(BackendKind::Sqlite),
            "preferences" | "prefs" | "file" => Ok(BackendKind::Preferences),
            "memory" | "mem" => Ok(BackendKind::Memory),
            other => Err(ParseBackendError(other.to_string())),
        }
    }
}

impl BackendKind {
    /// Where records live when no location is configured.
    pub fn default_location(self) -> &'static str {
        match self {
            BackendKind::Sqlite => DEFAULT_DATABASE_URL,
            BackendKind::Preferences => DEFAULT_PREFERENCES_PATH,
            BackendKind::Memory => "",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Sqlite => "sqlite",
            BackendKind::Preferences => "preferences",
            BackendKind::Memory => "memory",
        })
    }
}

/// `location` is a database url for sqlite and a file path for preferences;
/// memory ignores it.
pub async fn open_backend(
    kind: BackendKind,
    location: &str,
    retention: Option<usize>,
) -> Result<Arc<dyn ScoreBackend>> {
    Ok(match kind {
        BackendKind::Sqlite => Arc::new(
            SqliteScoreBackend::connect(location)
                .await?
                .with_retention(retention),
        ),
        BackendKind::Preferences => Arc::new(PreferencesScoreBackend::new(location)),
        BackendKind::Memory => Arc::new(MemoryScoreBackend::new()),
    })
}

pub struct ScoreStore {
    backend: Arc<dyn ScoreBackend>,
    policy: TiePolicy,
    best: watch::Sender<Option<ScoreRecord>>,
    write_lock: Mutex<()>,
}

impl ScoreStore {
    pub async fn open(backend: Arc<dyn ScoreBackend>, policy: TiePolicy) -> Self {
        let initial = match backend.load_best().await {
            Ok(best) => best,
            Err(error) => {
                warn!(%error, "storage: could not load record; starting without one");
                None
            }
        };
        let (best, _) = watch::channel(initial);
        Self {
            backend,
            policy,
            best,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn in_memory(policy: TiePolicy) -> Self {
        Self::open(Arc::new(MemoryScoreBackend::new()), policy).await
    }

    pub fn policy(&self) -> TiePolicy {
        self.policy
    }

    pub async fn get_best(&self) -> Option<ScoreRecord> {
        match self.backend.load_best().await {
            Ok(best) => {
                self.publish(best.clone());
                best
            }
            Err(error) => {
                warn!(%error, "storage: failed to read record");
                None
            }
        }
    }

    pub async fn best_score(&self) -> u32 {
        self.get_best().await.map_or(0, |record| record.score)
    }

    pub async fn try_save(&self, score: u32) -> bool {
        self.try_save_as(score, None).await
    }

    /// Saves `score` iff it beats the current best under the tie policy.
    pub async fn try_save_as(&self, score: u32, player_name: Option<&str>) -> bool {
        let _guard = self.write_lock.lock().await;

        let baseline = match self.backend.load_best().await {
            Ok(best) => best,
            Err(error) => {
                warn!(%error, score, "storage: failed to read record before save; using last known");
                self.best.borrow().clone()
            }
        };
        let best_score = baseline.as_ref().map(|record| record.score);
        if !self.policy.admits(score, best_score) {
            debug!(score, ?best_score, "storage: score does not beat the record");
            return false;
        }

        let record = ScoreRecord::new(score, player_name.map(str::to_owned));
        match self.backend.insert(&record).await {
            Ok(()) => {
                info!(score, ?best_score, "storage: new record saved");
                self.publish(Some(record));
                true
            }
            Err(error) => {
                warn!(%error, score, "storage: failed to save record");
                false
            }
        }
    }

    /// Current record first, then every change.
    pub fn observe(&self) -> WatchStream<Option<ScoreRecord>> {
        WatchStream::new(self.best.subscribe())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ScoreRecord>> {
        self.best.subscribe()
    }

    pub async fn history(&self, limit: usize) -> Vec<ScoreRecord> {
        self.backend.list(limit).await.unwrap_or_else(|error| {
            warn!(%error, "storage: failed to list records");
            Vec::new()
        })
    }

    pub async fn clear(&self) -> bool {
        let _guard = self.write_lock.lock().await;
        match self.backend.clear().await {
            Ok(()) => {
                info!("storage: records cleared");
                self.publish(None);
                true
            }
            Err(error) => {
                warn!(%error, "storage: failed to clear records");
                false
            }
        }
    }

    fn publish(&self, best: Option<ScoreRecord>) {
        self.best.send_if_modified(|current| {
            if *current == best {
                false
            } else {
                *current = best;
                true
            }
        });
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
