//! Configuration structures for the storage probe.
//!
//! Two layers live here: [`StorageConfigFile`], the JSON document the sync
//! client writes to its data directory, and [`ProbeOptions`], the caller-side
//! knobs (which file to read, which user to inspect, how many keys to list).

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::Result;

/// Region used when the endpoint carries no `.`-separated region token.
pub const DEFAULT_REGION: &str = "ap-chengdu";

/// User whose sync prefixes are probed unless told otherwise.
pub const DEFAULT_USER_ID: &str = "default_user";

/// Upper bound on keys returned per prefix listing.
pub const DEFAULT_MAX_KEYS: usize = 10;

/// Location of the storage config relative to the user's home directory.
const CONFIG_RELATIVE_PATH: &str = "Library/Application Support/clippy/storage_config.json";

/// Storage configuration file as written by the sync client.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfigFile {
    /// Backend connection settings
    pub backend: CosBackendConfig,

    /// Retry budget recorded by the sync client (not used by the probe)
    #[serde(default)]
    pub retry_attempts: Option<usize>,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl StorageConfigFile {
    /// Request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

/// Tencent COS connection settings.
#[derive(Clone, Deserialize)]
pub struct CosBackendConfig {
    /// Bucket name, including the APPID suffix (e.g. `clippy-1250000000`)
    pub bucket: String,
    /// Service endpoint, e.g. `https://cos.ap-chengdu.myqcloud.com`
    pub endpoint: String,
    /// SecretId credential
    pub secret_id: String,
    /// SecretKey credential
    pub secret_key: String,
    /// Explicit region; derived from `endpoint` when absent
    #[serde(default)]
    pub region: Option<String>,
    /// Address the bucket as a path segment instead of a subdomain
    #[serde(default)]
    pub path_style: bool,
    /// Allow HTTP (insecure) connections; implied by an `http://` endpoint
    #[serde(default)]
    pub allow_http: bool,
}

impl CosBackendConfig {
    /// Whether plain HTTP must be permitted for this endpoint.
    pub fn allows_http(&self) -> bool {
        self.allow_http || self.endpoint.starts_with("http://")
    }
}

// Credentials stay out of logs and panic messages.
impl fmt::Debug for CosBackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CosBackendConfig")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("secret_id", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("path_style", &self.path_style)
            .field("allow_http", &self.allow_http)
            .finish()
    }
}

/// Caller-supplied probe settings.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Path of the storage configuration file
    pub config_path: PathBuf,
    /// Sync user whose prefixes are inspected
    pub user_id: String,
    /// Maximum keys returned per listing
    pub max_keys: usize,
    /// Region used when none can be derived from the endpoint
    pub fallback_region: String,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            config_path: default_config_path(),
            user_id: DEFAULT_USER_ID.to_string(),
            max_keys: DEFAULT_MAX_KEYS,
            fallback_region: DEFAULT_REGION.to_string(),
        }
    }
}

impl ProbeOptions {
    /// Start from defaults, reading the given config file.
    pub fn with_config_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Default::default()
        }
    }

    /// Reject options that would probe something other than
    /// `{user_id}/oplog/` and `{user_id}/snapshots/`.
    pub fn validate(&self) -> Result<()> {
        validate_user_id(&self.user_id)
    }
}

/// Characters the object store client percent-encodes inside a path segment.
/// A user id containing one would be listed under a different key prefix.
const ESCAPED_KEY_CHARS: &[char] = &[
    '/', '\\', '{', '}', '^', '%', '`', '[', ']', '"', '<', '>', '~', '#', '|',
];

/// Check that `user_id` maps to exactly one unescaped key segment.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    let reason = if user_id.is_empty() {
        Some("must not be empty".to_string())
    } else if user_id == "." || user_id == ".." {
        Some("must not be a relative path segment".to_string())
    } else {
        user_id
            .chars()
            .find(|c| c.is_ascii_control() || ESCAPED_KEY_CHARS.contains(c))
            .map(|c| format!("unsupported character {:?}", c))
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidUserId {
            user_id: user_id.to_string(),
            reason,
        }
        .into()),
        None => Ok(()),
    }
}

/// Default storage config location inside the sync client's data directory.
pub fn default_config_path() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(CONFIG_RELATIVE_PATH),
        None => PathBuf::from("storage_config.json"),
    }
}

/// Read and parse a storage configuration file.
///
/// Absent files, invalid JSON and missing fields are reported as distinct
/// [`ConfigError`] variants. Nothing here touches the network.
pub async fn load_storage_config(path: &Path) -> Result<StorageConfigFile> {
    info!("Loading storage configuration from: {}", path.display());

    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            }
            .into());
        }
    };

    parse_storage_config(path, &content)
}

/// Parse config file content; `path` is only used for error context.
pub fn parse_storage_config(path: &Path, content: &str) -> Result<StorageConfigFile> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let config: StorageConfigFile =
        serde_json::from_value(value).map_err(|e| ConfigError::Incomplete {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    debug!(
        "Parsed storage config: bucket={}, endpoint={}",
        config.backend.bucket, config.backend.endpoint
    );

    Ok(config)
}
