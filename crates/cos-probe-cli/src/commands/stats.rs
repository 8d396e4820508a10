use anyhow::Result;
use cos_probe_core::storage::create_backend;
use cos_probe_core::{
    collect_user_stats, load_storage_config, CategoryUsage, ConnectionTarget, ProbeOptions,
    UserStorageReport,
};
use std::path::PathBuf;
use tracing::info;

use super::{print_structured, OutputFormat};

pub async fn run(config: Option<PathBuf>, user_id: &str, format: OutputFormat) -> Result<bool> {
    let mut options = ProbeOptions::default();
    if let Some(path) = config {
        options.config_path = path;
    }

    let storage_config = load_storage_config(&options.config_path).await?;
    let target = ConnectionTarget::from_config(&storage_config, &options.fallback_region);
    let backend = create_backend(&storage_config, &target)?;

    info!("Collecting stats for {} in bucket {}", user_id, target.bucket);
    let report = collect_user_stats(backend.as_ref(), user_id).await?;

    if !print_structured(&report.to_json(), format)? {
        print_text(&report);
    }

    Ok(report.latest_snapshot.is_ok())
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn usage_line(name: &str, usage: CategoryUsage) -> String {
    format!(
        "  {:<10} {:>6} files  {:>10}",
        name,
        usage.files,
        format_bytes(usage.bytes)
    )
}

fn print_text(report: &UserStorageReport) {
    let stats = &report.stats;
    println!("Storage usage for {}:", report.user_id);
    println!("{}", usage_line("oplog", stats.oplog));
    println!("{}", usage_line("snapshots", stats.snapshots));
    println!("{}", usage_line("data", stats.data));
    println!("{}", usage_line("other", stats.other));
    println!("{}", usage_line("total", stats.total));
    println!();

    match &report.latest_snapshot {
        Ok(Some(pointer)) => println!(
            "Latest snapshot: {} ({})",
            pointer.snapshot_path,
            pointer.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        Ok(None) => println!("Latest snapshot: none"),
        Err(e) => println!("❌ Failed to read latest snapshot pointer: {}", e),
    }
}
