//! Storage backend trait definition.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::Result;

/// A single object returned by a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    /// Full object key
    pub key: String,
    /// Size in bytes
    pub size: u64,
    /// Last modified timestamp (epoch milliseconds)
    pub last_modified: i64,
}

/// Trait for storage backends
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the bucket this backend is bound to
    fn bucket(&self) -> &str;

    /// Confirm the bucket exists and the credentials can reach it
    async fn check_bucket(&self) -> Result<()>;

    /// List objects under a prefix, stopping after `max_keys` entries if given
    async fn list(&self, prefix: &str, max_keys: Option<usize>) -> Result<Vec<ObjectEntry>>;

    /// Read data from a key
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Write data to a key
    async fn put(&self, key: &str, data: Bytes) -> Result<()>;
}
