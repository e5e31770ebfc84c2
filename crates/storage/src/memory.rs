use anyhow::Result;
use async_trait::async_trait;
use shared::domain::ScoreRecord;
use tokio::sync::Mutex;

use crate::ScoreBackend;

/// Process-local history; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryScoreBackend {
    records: Mutex<Vec<ScoreRecord>>,
}

impl MemoryScoreBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<ScoreRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

fn ranked(records: &[ScoreRecord]) -> Vec<ScoreRecord> {
    let mut ranked = records.to_vec();
    // Stable sort keeps insertion order among equal keys; newest wins ties.
    ranked.reverse();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.timestamp_millis.cmp(&a.timestamp_millis))
    });
    ranked
}

#[async_trait]
impl ScoreBackend for MemoryScoreBackend {
    async fn load_best(&self) -> Result<Option<ScoreRecord>> {
        let records = self.records.lock().await;
        Ok(ranked(&records).into_iter().next())
    }

    async fn insert(&self, record: &ScoreRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<ScoreRecord>> {
        let records = self.records.lock().await;
        Ok(ranked(&records).into_iter().take(limit).collect())
    }

    async fn clear(&self) -> Result<()> {
        self.records.lock().await.clear();
        Ok(())
    }
}
