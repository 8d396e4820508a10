//! Probe stage sequencing and failure isolation.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use cos_probe_core::storage::MemoryBackend;
use cos_probe_core::{
    ConnectionTarget, DataCategory, Error, ErrorKind, Probe, ProbeOutcome, ProbeStage, Result,
    StorageBackend, StorageConfigFile, StorageError,
};

use super::helpers::{
    options_for, seeded_backend, write_config, FaultyBackend, RecordingConnector, VALID_CONFIG,
};

#[tokio::test]
async fn test_healthy_bucket_lists_both_prefixes() {
    let (_dir, path) = write_config(VALID_CONFIG);
    let backend = seeded_backend(&[
        ("default_user/oplog/op-1.json", 120),
        ("default_user/oplog/op-2.json", 80),
    ])
    .await;
    let connector = RecordingConnector::new(Arc::new(backend));

    let probe = Probe::with_connector(options_for(path), connector);
    let report = probe.run().await;

    assert_eq!(probe.connector().call_count(), 1);
    assert_eq!(report.stage(), ProbeStage::Done);
    assert!(report.is_success());

    let target = report.target.as_ref().unwrap();
    assert_eq!(target.bucket, "clippy-1250000000");
    assert_eq!(target.region, "ap-chengdu");

    let listings = report.listings();
    assert_eq!(listings.len(), 2);

    assert_eq!(listings[0].category, DataCategory::Oplog);
    assert_eq!(listings[0].prefix, "default_user/oplog/");
    let oplog = listings[0].result.as_ref().unwrap();
    assert_eq!(oplog.len(), 2);
    assert_eq!(oplog[0].key, "default_user/oplog/op-1.json");
    assert_eq!(oplog[0].size, 120);

    // Snapshots exist nowhere: reported as empty, never as both found and empty.
    assert_eq!(listings[1].category, DataCategory::Snapshots);
    assert!(listings[1].is_empty());
    assert!(!listings[1].is_failed());
}

#[tokio::test]
async fn test_listing_capped_at_max_keys() {
    let (_dir, path) = write_config(VALID_CONFIG);
    let objects: Vec<(String, usize)> = (0..25)
        .map(|i| (format!("default_user/snapshots/{:03}_snapshot.json", i), 10))
        .collect();
    let refs: Vec<(&str, usize)> = objects.iter().map(|(k, s)| (k.as_str(), *s)).collect();
    let backend = seeded_backend(&refs).await;

    let probe = Probe::with_connector(options_for(path), RecordingConnector::new(Arc::new(backend)));
    let report = probe.run().await;

    let snapshots = report.listings()[1].result.as_ref().unwrap();
    assert_eq!(snapshots.len(), 10);
}

#[tokio::test]
async fn test_custom_user_id() {
    let (_dir, path) = write_config(VALID_CONFIG);
    let backend = seeded_backend(&[
        ("alice/snapshots/latest.json", 64),
        ("default_user/snapshots/latest.json", 64),
    ])
    .await;

    let mut options = options_for(path);
    options.user_id = "alice".to_string();
    let probe = Probe::with_connector(options, RecordingConnector::new(Arc::new(backend)));
    let report = probe.run().await;

    let listings = report.listings();
    assert_eq!(listings[0].prefix, "alice/oplog/");
    assert_eq!(listings[1].prefix, "alice/snapshots/");
    let snapshots = listings[1].result.as_ref().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].key, "alice/snapshots/latest.json");
}

#[tokio::test]
async fn test_escaped_user_id_rejected_before_connecting() {
    let (_dir, path) = write_config(VALID_CONFIG);
    let connector = RecordingConnector::new(Arc::new(MemoryBackend::new()));

    let mut options = options_for(path);
    options.user_id = "bob~work".to_string();
    let probe = Probe::with_connector(options, connector);
    let report = probe.run().await;

    assert_eq!(probe.connector().call_count(), 0);
    assert!(report.listings().is_empty());
    match &report.outcome {
        ProbeOutcome::ConfigFailed(e) => assert_eq!(e.kind(), ErrorKind::InvalidUserId),
        other => panic!("Expected invalid user id, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_config_never_connects() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("storage_config.json");
    let connector = RecordingConnector::new(Arc::new(MemoryBackend::new()));

    let probe = Probe::with_connector(options_for(path.clone()), connector);
    let report = probe.run().await;

    assert_eq!(probe.connector().call_count(), 0);
    assert_eq!(report.stage(), ProbeStage::Failed);
    assert!(report.target.is_none());
    match &report.outcome {
        ProbeOutcome::ConfigFailed(e) => {
            assert_eq!(e.kind(), ErrorKind::ConfigNotFound);
            assert!(e.to_string().contains(&path.display().to_string()));
        }
        other => panic!("Expected config failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_config_never_connects() {
    let (_dir, path) = write_config("{ \"backend\": ");
    let connector = RecordingConnector::new(Arc::new(MemoryBackend::new()));

    let probe = Probe::with_connector(options_for(path), connector);
    let report = probe.run().await;

    assert_eq!(probe.connector().call_count(), 0);
    match &report.outcome {
        ProbeOutcome::ConfigFailed(e) => assert_eq!(e.kind(), ErrorKind::ConfigMalformed),
        other => panic!("Expected config failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_incomplete_config_never_connects() {
    let (_dir, path) = write_config(
        r#"{"backend": {"bucket": "b", "endpoint": "https://cos.ap-chengdu.myqcloud.com"}}"#,
    );
    let connector = RecordingConnector::new(Arc::new(MemoryBackend::new()));

    let probe = Probe::with_connector(options_for(path), connector);
    let report = probe.run().await;

    assert_eq!(probe.connector().call_count(), 0);
    match &report.outcome {
        ProbeOutcome::ConfigFailed(e) => assert_eq!(e.kind(), ErrorKind::ConfigIncomplete),
        other => panic!("Expected config failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_bucket_check_failure_skips_listings() {
    let (_dir, path) = write_config(VALID_CONFIG);
    let backend = Arc::new(
        FaultyBackend::new(seeded_backend(&[("default_user/oplog/op-1.json", 1)]).await)
            .failing_bucket_check(),
    );
    let connector = RecordingConnector::new(backend.clone());

    let probe = Probe::with_connector(options_for(path), connector);
    let report = probe.run().await;

    assert_eq!(report.stage(), ProbeStage::Failed);
    assert!(!report.is_success());
    assert!(report.listings().is_empty());
    assert_eq!(backend.list_calls.load(Ordering::SeqCst), 0);
    match &report.outcome {
        ProbeOutcome::ConnectionFailed(e) => assert_eq!(e.kind(), ErrorKind::BucketCheckFailed),
        other => panic!("Expected connection failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oplog_failure_does_not_block_snapshots() {
    let (_dir, path) = write_config(VALID_CONFIG);
    let backend = Arc::new(
        FaultyBackend::new(
            seeded_backend(&[("default_user/snapshots/20240101_snapshot.json", 4096)]).await,
        )
        .failing_prefix("default_user/oplog/"),
    );
    let connector = RecordingConnector::new(backend.clone());

    let probe = Probe::with_connector(options_for(path), connector);
    let report = probe.run().await;

    assert_eq!(report.stage(), ProbeStage::Done);
    assert!(!report.is_success());
    assert_eq!(backend.list_calls.load(Ordering::SeqCst), 2);

    let listings = report.listings();
    assert!(listings[0].is_failed());
    assert_eq!(
        listings[0].result.as_ref().unwrap_err().kind(),
        ErrorKind::ListingFailed
    );

    let snapshots = listings[1].result.as_ref().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].size, 4096);
}

#[tokio::test]
async fn test_client_construction_failure_is_connection_failure() {
    let (_dir, path) = write_config(VALID_CONFIG);
    let connector = |_config: &StorageConfigFile,
                     target: &ConnectionTarget|
     -> Result<Arc<dyn StorageBackend>> {
        Err(Error::Storage(StorageError::Client(format!(
            "Invalid endpoint {}",
            target.endpoint
        ))))
    };

    let report = Probe::with_connector(options_for(path), connector).run().await;

    assert!(report.target.is_some());
    match &report.outcome {
        ProbeOutcome::ConnectionFailed(e) => assert_eq!(e.kind(), ErrorKind::ClientConstruction),
        other => panic!("Expected connection failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_region_falls_back_for_dotless_endpoint() {
    let (_dir, path) = write_config(
        r#"{"backend": {"bucket": "b", "endpoint": "localhost",
            "secret_id": "id", "secret_key": "key"}}"#,
    );
    let connector = |_config: &StorageConfigFile,
                     target: &ConnectionTarget|
     -> Result<Arc<dyn StorageBackend>> {
        assert_eq!(target.region, "ap-chengdu");
        Ok(Arc::new(MemoryBackend::with_bucket(target.bucket.clone())))
    };

    let report = Probe::with_connector(options_for(path), connector).run().await;
    assert_eq!(report.target.unwrap().region, "ap-chengdu");
}

#[tokio::test]
async fn test_report_json_shape() {
    let (_dir, path) = write_config(VALID_CONFIG);
    let backend = seeded_backend(&[("default_user/oplog/op-1.json", 7)]).await;

    let report = Probe::with_connector(options_for(path), RecordingConnector::new(Arc::new(backend)))
        .run()
        .await;
    let json = report.to_json();

    assert_eq!(json["status"], "completed");
    assert_eq!(json["stage"], "done");
    assert_eq!(json["success"], true);
    assert_eq!(json["target"]["region"], "ap-chengdu");
    assert_eq!(json["listings"][0]["category"], "oplog");
    assert_eq!(json["listings"][0]["count"], 1);
    assert_eq!(json["listings"][0]["objects"][0]["size"], 7);
    assert_eq!(json["listings"][1]["found"], false);
    assert!(!json.to_string().contains("AKIDexample"));
}
