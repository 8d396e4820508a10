//! Usage statistics over a sync user's prefix.

use cos_probe_core::{collect_user_stats, DataCategory, ErrorKind, StorageBackend};

use super::helpers::{seeded_backend, FaultyBackend};

#[tokio::test]
async fn test_stats_split_by_category() {
    let backend = seeded_backend(&[
        ("default_user/oplog/op-1.json", 100),
        ("default_user/oplog/op-2.json", 50),
        ("default_user/snapshots/20240101_120000_snapshot.json", 2048),
        ("default_user/data/blob-1", 10),
        ("default_user/oplog//.keep", 0),
        ("someone_else/oplog/op-1.json", 999),
    ])
    .await;

    let report = collect_user_stats(&backend, "default_user").await.unwrap();
    let stats = &report.stats;

    assert_eq!(stats.total.files, 5);
    assert_eq!(stats.total.bytes, 2208);
    assert_eq!(stats.usage(DataCategory::Oplog).files, 3);
    assert_eq!(stats.usage(DataCategory::Oplog).bytes, 150);
    assert_eq!(stats.usage(DataCategory::Snapshots).bytes, 2048);
    assert_eq!(stats.usage(DataCategory::Data).files, 1);
    assert_eq!(stats.other.files, 0);
    assert!(report.latest_snapshot.as_ref().unwrap().is_none());
}

#[tokio::test]
async fn test_stats_listing_is_not_capped() {
    let keys: Vec<String> = (0..40)
        .map(|i| format!("default_user/oplog/{:03}.json", i))
        .collect();
    let objects: Vec<(&str, usize)> = keys.iter().map(|k| (k.as_str(), 1)).collect();
    let backend = seeded_backend(&objects).await;

    let report = collect_user_stats(&backend, "default_user").await.unwrap();
    assert_eq!(report.stats.oplog.files, 40);
}

#[tokio::test]
async fn test_stats_listing_failure_propagates() {
    let backend = FaultyBackend::new(seeded_backend(&[]).await).failing_prefix("default_user/");

    let err = collect_user_stats(&backend, "default_user").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ListingFailed);
}

#[tokio::test]
async fn test_stats_rejects_nested_user_id() {
    let backend = FaultyBackend::new(seeded_backend(&[]).await);

    let err = collect_user_stats(&backend, "team/alice").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUserId);
    assert_eq!(backend.list_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stats_json_includes_pointer() {
    let backend = seeded_backend(&[]).await;
    backend
        .put(
            "default_user/snapshots/latest.json",
            bytes::Bytes::from(
                r#"{"snapshot_path": "default_user/snapshots/a.json", "timestamp": "2024-05-01T08:30:00Z"}"#,
            ),
        )
        .await
        .unwrap();

    let report = collect_user_stats(&backend, "default_user").await.unwrap();
    let json = report.to_json();
    assert_eq!(json["user_id"], "default_user");
    assert_eq!(
        json["latest_snapshot"]["pointer"]["snapshot_path"],
        "default_user/snapshots/a.json"
    );
    assert_eq!(json["stats"]["snapshots"]["files"], 1);
}
