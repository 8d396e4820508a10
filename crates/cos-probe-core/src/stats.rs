//! Storage usage statistics for a sync user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::validate_user_id;
use crate::error::StorageError;
use crate::probe::DataCategory;
use crate::storage::{ObjectEntry, StorageBackend};
use crate::{Error, Result};

/// File count and byte total for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryUsage {
    pub files: u64,
    pub bytes: u64,
}

impl CategoryUsage {
    fn add(&mut self, size: u64) {
        self.files += 1;
        self.bytes += size;
    }
}

/// Aggregated usage under `{user_id}/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub total: CategoryUsage,
    pub oplog: CategoryUsage,
    pub snapshots: CategoryUsage,
    pub data: CategoryUsage,
    /// Objects outside the known category directories
    pub other: CategoryUsage,
}

impl StorageStats {
    /// Aggregate a listing of a user's objects.
    pub fn from_entries<'a>(user_id: &str, entries: impl IntoIterator<Item = &'a ObjectEntry>) -> Self {
        let mut stats = Self::default();
        for entry in entries {
            stats.total.add(entry.size);
            match classify(user_id, &entry.key) {
                Some(DataCategory::Oplog) => stats.oplog.add(entry.size),
                Some(DataCategory::Snapshots) => stats.snapshots.add(entry.size),
                Some(DataCategory::Data) => stats.data.add(entry.size),
                None => stats.other.add(entry.size),
            }
        }
        stats
    }

    pub fn usage(&self, category: DataCategory) -> CategoryUsage {
        match category {
            DataCategory::Oplog => self.oplog,
            DataCategory::Snapshots => self.snapshots,
            DataCategory::Data => self.data,
        }
    }
}

/// Category of a key under the user's prefix, if it belongs to one.
pub fn classify(user_id: &str, key: &str) -> Option<DataCategory> {
    let rest = key.strip_prefix(user_id)?.strip_prefix('/')?;
    let segment = rest.split('/').next()?;
    [DataCategory::Oplog, DataCategory::Snapshots, DataCategory::Data]
        .into_iter()
        .find(|c| c.segment() == segment)
}

/// Pointer the sync client keeps at `{user_id}/snapshots/latest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestSnapshot {
    /// Key of the most recent snapshot object
    pub snapshot_path: String,
    /// When the snapshot was taken
    pub timestamp: DateTime<Utc>,
}

/// Key of the latest-snapshot pointer for a user.
pub fn latest_snapshot_key(user_id: &str) -> String {
    format!("{}latest.json", DataCategory::Snapshots.prefix(user_id))
}

/// Usage statistics plus the latest-snapshot pointer.
#[derive(Debug)]
pub struct UserStorageReport {
    pub user_id: String,
    pub stats: StorageStats,
    /// `Ok(None)` when no pointer exists; `Err` when it cannot be read or parsed
    pub latest_snapshot: Result<Option<LatestSnapshot>>,
}

impl UserStorageReport {
    pub fn to_json(&self) -> serde_json::Value {
        let latest = match &self.latest_snapshot {
            Ok(pointer) => serde_json::json!({ "pointer": pointer }),
            Err(e) => serde_json::json!({
                "error": { "kind": e.kind(), "message": e.to_string() }
            }),
        };
        serde_json::json!({
            "user_id": self.user_id,
            "stats": self.stats,
            "latest_snapshot": latest,
        })
    }
}

/// Collect usage statistics for a user. Listing failures abort; a broken
/// latest-snapshot pointer is reported alongside the stats.
pub async fn collect_user_stats(
    backend: &dyn StorageBackend,
    user_id: &str,
) -> Result<UserStorageReport> {
    validate_user_id(user_id)?;
    let user_prefix = format!("{}/", user_id);
    info!("Collecting storage stats under {}", user_prefix);

    let entries = backend.list(&user_prefix, None).await?;
    let stats = StorageStats::from_entries(user_id, &entries);
    debug!(
        "Stats for {}: {} files, {} bytes",
        user_id, stats.total.files, stats.total.bytes
    );

    let latest_snapshot = read_latest_snapshot(backend, user_id).await;

    Ok(UserStorageReport {
        user_id: user_id.to_string(),
        stats,
        latest_snapshot,
    })
}

/// Read the latest-snapshot pointer, treating a missing object as `None`.
pub async fn read_latest_snapshot(
    backend: &dyn StorageBackend,
    user_id: &str,
) -> Result<Option<LatestSnapshot>> {
    let key = latest_snapshot_key(user_id);
    match backend.get(&key).await {
        Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
        Err(Error::Storage(StorageError::NotFound(_))) => Ok(None),
        Err(e) => Err(e),
    }
}
