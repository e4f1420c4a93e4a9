use std::{collections::BTreeMap, sync::Arc};

use crate::{
    dao::storage::{KEY_USER_LEVEL_STATS, KeyValueStore, StorageResult, read_json, write_json},
    state::game::{AggregateStats, Level},
};

/// Local mirror of the server-owned stats of the signed-in user, one entry per level.
///
/// The server stays authoritative: entries are overwritten with whatever the last
/// submit returned and are never recomputed locally.
#[derive(Clone)]
pub struct LevelStatsCache {
    store: Arc<dyn KeyValueStore>,
}

impl LevelStatsCache {
    /// Wrap the device store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn load(&self) -> StorageResult<BTreeMap<String, AggregateStats>> {
        Ok(read_json(self.store.as_ref(), KEY_USER_LEVEL_STATS)
            .await?
            .unwrap_or_default())
    }

    /// Last mirrored stats for `level`.
    pub async fn get(&self, level: Level) -> StorageResult<Option<AggregateStats>> {
        let mut all = self.load().await?;
        Ok(all.remove(&level.to_string()))
    }

    /// Overwrite the mirror for `level` with the server's values.
    pub async fn record(&self, level: Level, stats: &AggregateStats) -> StorageResult<()> {
        let mut all = self.load().await?;
        all.insert(level.to_string(), stats.clone());
        write_json(self.store.as_ref(), KEY_USER_LEVEL_STATS, &all).await
    }

    /// Drop every mirrored entry.
    pub async fn clear(&self) -> StorageResult<()> {
        self.store.remove(KEY_USER_LEVEL_STATS).await
    }
}
