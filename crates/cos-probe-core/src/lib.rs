//! COS Probe Core Library
//!
//! Connectivity and layout checks for the clipboard sync client's object
//! storage: config loading, region derivation, storage backends, the
//! bucket/prefix probe and per-user usage statistics.

pub mod config;
pub mod error;
pub mod probe;
pub mod region;
pub mod stats;
pub mod storage;

pub use config::{
    default_config_path, load_storage_config, validate_user_id, CosBackendConfig, ProbeOptions,
    StorageConfigFile, DEFAULT_MAX_KEYS, DEFAULT_REGION, DEFAULT_USER_ID,
};
pub use error::{ConfigError, Error, ErrorKind, Result, StorageError};
pub use probe::{
    Connector, CosConnector, DataCategory, PrefixListing, Probe, ProbeOutcome, ProbeReport,
    ProbeStage,
};
pub use region::derive_region;
pub use stats::{collect_user_stats, CategoryUsage, LatestSnapshot, StorageStats, UserStorageReport};
pub use storage::{ConnectionTarget, ObjectEntry, StorageBackend};
