//! Connectivity probe for a sync user's bucket layout.
//!
//! The probe runs three stages strictly in order: load the storage config,
//! connect and check the bucket, then list the `oplog` and `snapshots`
//! prefixes. Every outcome, failures included, is captured in a
//! [`ProbeReport`]; nothing is printed here.

use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{load_storage_config, ProbeOptions, StorageConfigFile};
use crate::storage::{create_backend, ConnectionTarget, ObjectEntry, StorageBackend};
use crate::{Error, Result};

/// Category of sync data stored under a user prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataCategory {
    /// Incremental operation log records
    Oplog,
    /// Full point-in-time captures
    Snapshots,
    /// Blob payloads referenced by oplog entries
    Data,
}

impl DataCategory {
    /// Categories whose presence the probe checks, in listing order.
    pub const PROBED: [DataCategory; 2] = [DataCategory::Oplog, DataCategory::Snapshots];

    /// Directory segment used under the user prefix.
    pub fn segment(&self) -> &'static str {
        match self {
            DataCategory::Oplog => "oplog",
            DataCategory::Snapshots => "snapshots",
            DataCategory::Data => "data",
        }
    }

    /// Key prefix for this category: `{user_id}/{segment}/`.
    pub fn prefix(&self, user_id: &str) -> String {
        format!("{}/{}/", user_id, self.segment())
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Probe progress. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStage {
    Start,
    ConfigLoaded,
    Connected,
    BucketChecked,
    Done,
    Failed,
}

/// Opens a storage session for a loaded configuration.
///
/// The default [`CosConnector`] builds a real COS client; tests substitute
/// closures returning in-memory or fault-injecting backends.
pub trait Connector {
    fn connect(
        &self,
        config: &StorageConfigFile,
        target: &ConnectionTarget,
    ) -> Result<Arc<dyn StorageBackend>>;
}

impl<F> Connector for F
where
    F: Fn(&StorageConfigFile, &ConnectionTarget) -> Result<Arc<dyn StorageBackend>>,
{
    fn connect(
        &self,
        config: &StorageConfigFile,
        target: &ConnectionTarget,
    ) -> Result<Arc<dyn StorageBackend>> {
        self(config, target)
    }
}

/// Connector for Tencent COS.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosConnector;

impl Connector for CosConnector {
    fn connect(
        &self,
        config: &StorageConfigFile,
        target: &ConnectionTarget,
    ) -> Result<Arc<dyn StorageBackend>> {
        create_backend(config, target)
    }
}

/// Result of listing one category prefix.
#[derive(Debug)]
pub struct PrefixListing {
    pub category: DataCategory,
    pub prefix: String,
    pub result: Result<Vec<ObjectEntry>>,
}

impl PrefixListing {
    /// True when the listing succeeded and returned nothing.
    pub fn is_empty(&self) -> bool {
        matches!(&self.result, Ok(entries) if entries.is_empty())
    }

    pub fn is_failed(&self) -> bool {
        self.result.is_err()
    }
}

/// How far the probe got.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The options or the config file were rejected; no connection was attempted
    ConfigFailed(Error),
    /// The client could not be built or the bucket check failed; no listings
    ConnectionFailed(Error),
    /// The bucket was reachable; one listing per probed category
    Completed(Vec<PrefixListing>),
}

/// Everything the probe observed.
#[derive(Debug)]
pub struct ProbeReport {
    /// Config file that was read
    pub config_path: PathBuf,
    /// Resolved connection target, once the config has loaded
    pub target: Option<ConnectionTarget>,
    pub outcome: ProbeOutcome,
}

impl ProbeReport {
    /// Last stage reached.
    pub fn stage(&self) -> ProbeStage {
        match self.outcome {
            ProbeOutcome::ConfigFailed(_) | ProbeOutcome::ConnectionFailed(_) => ProbeStage::Failed,
            ProbeOutcome::Completed(_) => ProbeStage::Done,
        }
    }

    /// True when every stage and every listing succeeded. Empty prefixes
    /// count as success.
    pub fn is_success(&self) -> bool {
        match &self.outcome {
            ProbeOutcome::Completed(listings) => listings.iter().all(|l| !l.is_failed()),
            _ => false,
        }
    }

    /// Listings performed, empty unless the bucket check passed.
    pub fn listings(&self) -> &[PrefixListing] {
        match &self.outcome {
            ProbeOutcome::Completed(listings) => listings,
            _ => &[],
        }
    }

    /// Structured form of the report for JSON/YAML output.
    pub fn to_json(&self) -> serde_json::Value {
        let (status, error) = match &self.outcome {
            ProbeOutcome::ConfigFailed(e) => ("config_failed", Some(error_json(e))),
            ProbeOutcome::ConnectionFailed(e) => ("connection_failed", Some(error_json(e))),
            ProbeOutcome::Completed(_) => ("completed", None),
        };

        let listings: Vec<serde_json::Value> = self
            .listings()
            .iter()
            .map(|listing| match &listing.result {
                Ok(entries) => json!({
                    "category": listing.category,
                    "prefix": listing.prefix,
                    "found": !entries.is_empty(),
                    "count": entries.len(),
                    "objects": entries,
                }),
                Err(e) => json!({
                    "category": listing.category,
                    "prefix": listing.prefix,
                    "error": error_json(e),
                }),
            })
            .collect();

        json!({
            "config_path": self.config_path,
            "target": self.target,
            "stage": self.stage(),
            "status": status,
            "success": self.is_success(),
            "error": error,
            "listings": listings,
        })
    }
}

fn error_json(err: &Error) -> serde_json::Value {
    json!({
        "kind": err.kind(),
        "message": err.to_string(),
    })
}

/// Sequential storage probe.
pub struct Probe<C = CosConnector> {
    options: ProbeOptions,
    connector: C,
}

impl Probe<CosConnector> {
    /// Probe against Tencent COS.
    pub fn new(options: ProbeOptions) -> Self {
        Self::with_connector(options, CosConnector)
    }
}

impl<C: Connector> Probe<C> {
    /// Probe using a custom connector.
    pub fn with_connector(options: ProbeOptions, connector: C) -> Self {
        Self { options, connector }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run all stages and collect the report.
    pub async fn run(&self) -> ProbeReport {
        let config_path = self.options.config_path.clone();
        debug!("Probe stage: {:?}", ProbeStage::Start);

        if let Err(e) = self.options.validate() {
            debug!("Rejected probe options: {}", e);
            return ProbeReport {
                config_path,
                target: None,
                outcome: ProbeOutcome::ConfigFailed(e),
            };
        }

        let config = match load_storage_config(&config_path).await {
            Ok(config) => config,
            Err(e) => {
                debug!("Failed to load storage config: {}", e);
                return ProbeReport {
                    config_path,
                    target: None,
                    outcome: ProbeOutcome::ConfigFailed(e),
                };
            }
        };
        debug!("Probe stage: {:?}", ProbeStage::ConfigLoaded);

        let target = ConnectionTarget::from_config(&config, &self.options.fallback_region);
        info!(
            "Probing bucket {} in region {} via {}",
            target.bucket, target.region, target.endpoint
        );

        let backend = match self.connector.connect(&config, &target) {
            Ok(backend) => backend,
            Err(e) => {
                debug!("Failed to create storage client: {}", e);
                return ProbeReport {
                    config_path,
                    target: Some(target),
                    outcome: ProbeOutcome::ConnectionFailed(e),
                };
            }
        };
        debug!("Probe stage: {:?}", ProbeStage::Connected);

        if let Err(e) = backend.check_bucket().await {
            debug!("Bucket check failed: {}", e);
            return ProbeReport {
                config_path,
                target: Some(target),
                outcome: ProbeOutcome::ConnectionFailed(e),
            };
        }
        debug!("Probe stage: {:?}", ProbeStage::BucketChecked);

        let mut listings = Vec::with_capacity(DataCategory::PROBED.len());
        for category in DataCategory::PROBED {
            listings.push(self.list_category(backend.as_ref(), category).await);
        }
        debug!("Probe stage: {:?}", ProbeStage::Done);

        ProbeReport {
            config_path,
            target: Some(target),
            outcome: ProbeOutcome::Completed(listings),
        }
    }

    async fn list_category(
        &self,
        backend: &dyn StorageBackend,
        category: DataCategory,
    ) -> PrefixListing {
        let prefix = category.prefix(&self.options.user_id);
        let result = backend.list(&prefix, Some(self.options.max_keys)).await;

        match &result {
            Ok(entries) => info!("Found {} {} objects under {}", entries.len(), category, prefix),
            Err(e) => debug!("Listing {} failed: {}", prefix, e),
        }

        PrefixListing {
            category,
            prefix,
            result,
        }
    }
}
