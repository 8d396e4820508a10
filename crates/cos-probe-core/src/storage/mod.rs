//! Storage backend abstraction and implementations.
//!
//! - **COS**: Tencent Cloud Object Storage through its S3-compatible API
//! - **Memory**: In-memory storage (for testing)

mod backend;
mod cos;
mod memory;

pub use backend::{ObjectEntry, StorageBackend};
pub use cos::{bucket_endpoint, CosBackend, CosConfig};
pub use memory::MemoryBackend;

use futures::StreamExt;
use object_store::path::Path;
use object_store::ObjectStore;
use serde::Serialize;
use std::sync::Arc;

use crate::config::StorageConfigFile;
use crate::error::StorageError;
use crate::region::derive_region;
use crate::{Error, Result};

/// Where a probe connects: everything about the session except credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTarget {
    /// Bucket name
    pub bucket: String,
    /// Region used for signing
    pub region: String,
    /// Endpoint as written in the configuration file
    pub endpoint: String,
}

impl ConnectionTarget {
    /// Resolve the target for a loaded configuration.
    ///
    /// An explicit `backend.region` wins; otherwise the region is derived
    /// from the endpoint, falling back to `fallback_region`.
    pub fn from_config(config: &StorageConfigFile, fallback_region: &str) -> Self {
        let backend = &config.backend;
        let region = backend
            .region
            .clone()
            .unwrap_or_else(|| derive_region(&backend.endpoint, fallback_region));

        Self {
            bucket: backend.bucket.clone(),
            region,
            endpoint: backend.endpoint.clone(),
        }
    }
}

/// Create a COS backend for a loaded configuration and resolved target.
pub fn create_backend(
    config: &StorageConfigFile,
    target: &ConnectionTarget,
) -> Result<Arc<dyn StorageBackend>> {
    let cos_config = CosConfig {
        bucket: target.bucket.clone(),
        region: target.region.clone(),
        endpoint: target.endpoint.clone(),
        secret_id: config.backend.secret_id.clone(),
        secret_key: config.backend.secret_key.clone(),
        path_style: config.backend.path_style,
        allow_http: config.backend.allows_http(),
        timeout: config.timeout(),
    };
    Ok(Arc::new(CosBackend::new(cos_config)?))
}

/// Drain an object_store listing into entries, stopping after `max_keys`.
///
/// Prefixes match whole path segments: `user/oplog/` does not match
/// `user/oplog_old/x`. An empty prefix lists the whole store.
pub(crate) async fn collect_listing(
    store: &dyn ObjectStore,
    prefix: &str,
    max_keys: Option<usize>,
) -> Result<Vec<ObjectEntry>> {
    let prefix_path = Path::from(prefix);
    let mut stream = if prefix_path.parts().next().is_none() {
        store.list(None)
    } else {
        store.list(Some(&prefix_path))
    };

    let mut entries = Vec::new();
    loop {
        if max_keys.is_some_and(|max| entries.len() >= max) {
            break;
        }
        let Some(result) = stream.next().await else {
            break;
        };
        match result {
            Ok(meta) => entries.push(ObjectEntry {
                key: meta.location.to_string(),
                size: meta.size as u64,
                last_modified: meta.last_modified.timestamp_millis(),
            }),
            Err(e) => {
                return Err(Error::Storage(StorageError::Listing {
                    prefix: prefix.to_string(),
                    message: e.to_string(),
                }));
            }
        }
    }

    Ok(entries)
}
