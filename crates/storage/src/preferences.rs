use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::domain::ScoreRecord;
use tokio::fs;
use tracing::warn;

use crate::ScoreBackend;

pub const DEFAULT_PREFERENCES_PATH: &str = "./data/simon_prefs.json";

/// Single-record key-value file; keeps no history.
#[derive(Debug, Clone)]
pub struct PreferencesScoreBackend {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct PreferencesFile {
    #[serde(default)]
    record_score: i64,
    #[serde(default)]
    record_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    player_name: Option<String>,
}

impl PreferencesScoreBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ScoreBackend for PreferencesScoreBackend {
    async fn load_best(&self) -> Result<Option<ScoreRecord>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(error).with_context(|| {
                    format!("failed to read preferences '{}'", self.path.display())
                })
            }
        };

        let file = match serde_json::from_str::<PreferencesFile>(&raw) {
            Ok(file) => file,
            Err(error) => {
                warn!(
                    path = %self.path.display(),
                    %error,
                    "storage: ignoring malformed preferences file"
                );
                return Ok(None);
            }
        };

        // A zero score is the "never played" default.
        match u32::try_from(file.record_score) {
            Ok(0) => Ok(None),
            Ok(score) => Ok(Some(ScoreRecord {
                score,
                timestamp_millis: file.record_timestamp,
                player_name: file.player_name,
            })),
            Err(_) => {
                warn!(
                    path = %self.path.display(),
                    score = file.record_score,
                    "storage: ignoring out-of-range preferences score"
                );
                Ok(None)
            }
        }
    }

    async fn insert(&self, record: &ScoreRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create preferences directory '{}'", parent.display())
            })?;
        }

        let body = serde_json::to_vec_pretty(&PreferencesFile {
            record_score: i64::from(record.score),
            record_timestamp: record.timestamp_millis,
            player_name: record.player_name.clone(),
        })?;
        let temp_path = self.temp_path();
        fs::write(&temp_path, body)
            .await
            .with_context(|| format!("failed to write '{}'", temp_path.display()))?;
        fs::rename(&temp_path, &self.path)
            .await
            .with_context(|| format!("failed to replace '{}'", self.path.display()))?;
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<ScoreRecord>> {
        Ok(self.load_best().await?.into_iter().take(limit).collect())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error)
                .with_context(|| format!("failed to remove '{}'", self.path.display())),
        }
    }
}
