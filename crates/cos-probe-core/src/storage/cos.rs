//! Tencent COS backend over its S3-compatible API, using object_store.

use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{ClientOptions, ObjectStore, PutPayload, RetryConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::{collect_listing, ObjectEntry, StorageBackend};
use crate::error::StorageError;
use crate::{Error, Result};

/// COS storage backend configuration
#[derive(Clone)]
pub struct CosConfig {
    /// Bucket name, including the APPID suffix
    pub bucket: String,
    /// COS region (e.g. "ap-chengdu")
    pub region: String,
    /// Service endpoint (e.g. "https://cos.ap-chengdu.myqcloud.com")
    pub endpoint: String,
    /// SecretId
    pub secret_id: String,
    /// SecretKey
    pub secret_key: String,
    /// Address the bucket as a path segment instead of a subdomain
    pub path_style: bool,
    /// Allow HTTP (insecure) connections
    pub allow_http: bool,
    /// Per-request timeout
    pub timeout: Option<Duration>,
}

/// COS storage backend
pub struct CosBackend {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl CosBackend {
    /// Create a new COS backend.
    ///
    /// No request is sent here; bad credentials or an unknown bucket only
    /// show up on the first call.
    pub fn new(config: CosConfig) -> Result<Self> {
        let endpoint = if config.path_style {
            config.endpoint.clone()
        } else {
            bucket_endpoint(&config.endpoint, &config.bucket)?
        };

        let mut client_options = ClientOptions::new();
        if let Some(timeout) = config.timeout {
            client_options = client_options.with_timeout(timeout);
        }

        // Each call is attempted once; failures are reported, not retried.
        let retry = RetryConfig {
            max_retries: 0,
            ..Default::default()
        };

        let store = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_endpoint(&endpoint)
            .with_virtual_hosted_style_request(!config.path_style)
            .with_access_key_id(&config.secret_id)
            .with_secret_access_key(&config.secret_key)
            .with_allow_http(config.allow_http)
            .with_client_options(client_options)
            .with_retry(retry)
            .build()
            .map_err(|e| {
                Error::Storage(StorageError::Client(format!(
                    "Failed to create COS client: {}",
                    e
                )))
            })?;

        info!(
            "Created COS backend for bucket: {}, region: {}, endpoint: {}",
            config.bucket, config.region, endpoint
        );

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket,
        })
    }
}

/// Rewrite a service endpoint into the bucket's virtual-hosted endpoint.
///
/// `https://cos.ap-chengdu.myqcloud.com` with bucket `b-1250000000` becomes
/// `https://b-1250000000.cos.ap-chengdu.myqcloud.com`. Endpoints that already
/// start with the bucket name are kept. A missing scheme defaults to https.
pub fn bucket_endpoint(endpoint: &str, bucket: &str) -> Result<String> {
    let with_scheme = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };

    let invalid = |message: String| {
        Error::Storage(StorageError::Client(format!(
            "Invalid endpoint {}: {}",
            endpoint, message
        )))
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| invalid("missing host".to_string()))?
        .to_string();

    if !host.starts_with(&format!("{}.", bucket)) {
        url.set_host(Some(&format!("{}.{}", bucket, host)))
            .map_err(|e| invalid(e.to_string()))?;
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[async_trait]
impl StorageBackend for CosBackend {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn check_bucket(&self) -> Result<()> {
        debug!("COS HEAD BUCKET: {}", self.bucket);

        // A delimited listing of the bucket root is one round trip and fails
        // with NoSuchBucket/AccessDenied exactly where HEAD Bucket would.
        self.store.list_with_delimiter(None).await.map_err(|e| {
            Error::Storage(StorageError::BucketCheck {
                bucket: self.bucket.clone(),
                message: e.to_string(),
            })
        })?;

        Ok(())
    }

    async fn list(&self, prefix: &str, max_keys: Option<usize>) -> Result<Vec<ObjectEntry>> {
        debug!("COS LIST: {} (max_keys={:?})", prefix, max_keys);
        collect_listing(self.store.as_ref(), prefix, max_keys).await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = Path::from(key);
        debug!("COS GET: {}", path);

        let result = self.store.get(&path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => {
                Error::Storage(StorageError::NotFound(key.to_string()))
            }
            _ => Error::Storage(StorageError::Backend(format!("COS GET failed: {}", e))),
        })?;

        result.bytes().await.map_err(|e| {
            Error::Storage(StorageError::Backend(format!(
                "Failed to read COS response: {}",
                e
            )))
        })
    }

    async fn put(&self, key: &str, data: Bytes) -> Result<()> {
        let path = Path::from(key);
        debug!("COS PUT: {}", path);

        self.store
            .put(&path, PutPayload::from_bytes(data))
            .await
            .map_err(|e| Error::Storage(StorageError::Backend(format!("COS PUT failed: {}", e))))?;

        Ok(())
    }
}
