use anyhow::Result;
use cos_probe_core::{
    ConfigError, DataCategory, Error, Probe, ProbeOptions, ProbeOutcome, ProbeReport,
};
use std::path::PathBuf;
use tracing::info;

use super::{print_structured, OutputFormat};

/// Run the probe and print its report. Returns whether every stage passed.
pub async fn run(
    config: Option<PathBuf>,
    user_id: &str,
    max_keys: usize,
    format: OutputFormat,
) -> Result<bool> {
    let mut options = ProbeOptions::default();
    if let Some(path) = config {
        options.config_path = path;
    }
    options.user_id = user_id.to_string();
    options.max_keys = max_keys;

    info!(
        "Checking storage for user {} using {}",
        options.user_id,
        options.config_path.display()
    );

    let report = Probe::new(options).run().await;

    if !print_structured(&report.to_json(), format)? {
        for line in render_text(&report) {
            println!("{}", line);
        }
    }

    Ok(report.is_success())
}

fn category_label(category: DataCategory) -> &'static str {
    match category {
        DataCategory::Oplog => "oplog",
        DataCategory::Snapshots => "snapshot",
        DataCategory::Data => "data",
    }
}

/// Human-readable report lines.
pub fn render_text(report: &ProbeReport) -> Vec<String> {
    let mut lines = Vec::new();

    if let ProbeOutcome::ConfigFailed(e) = &report.outcome {
        let path = report.config_path.display();
        lines.push(match e {
            Error::Config(ConfigError::NotFound { .. }) => {
                format!("❌ Config file not found: {}", path)
            }
            Error::Config(ConfigError::Malformed { .. }) => {
                format!("❌ Config file is malformed: {}", path)
            }
            Error::Config(ConfigError::InvalidUserId { .. }) => format!("❌ {}", e),
            _ => format!("❌ Failed to read config: {}", e),
        });
        return lines;
    }

    if let Some(target) = &report.target {
        lines.push("Testing COS connection:".to_string());
        lines.push(format!("Bucket:   {}", target.bucket));
        lines.push(format!("Region:   {}", target.region));
        lines.push(format!("Endpoint: {}", target.endpoint));
        lines.push(String::new());
    }

    let listings = match &report.outcome {
        ProbeOutcome::ConnectionFailed(e) => {
            lines.push(format!("❌ COS connection failed: {}", e));
            return lines;
        }
        ProbeOutcome::Completed(listings) => listings,
        ProbeOutcome::ConfigFailed(_) => return lines,
    };

    lines.push("✅ COS connection succeeded!".to_string());
    lines.push(String::new());

    for (i, listing) in listings.iter().enumerate() {
        let label = category_label(listing.category);
        if i > 0 {
            lines.push(String::new());
        }
        lines.push(format!("Checking {} prefix: {}", label, listing.prefix));

        match &listing.result {
            Ok(entries) if entries.is_empty() => {
                lines.push(format!("❌ No {} files found", label));
            }
            Ok(entries) => {
                lines.push(format!("✅ Found {} {} files:", entries.len(), label));
                for entry in entries {
                    lines.push(format!("  - {} (size: {} bytes)", entry.key, entry.size));
                }
            }
            Err(e) => {
                lines.push(format!("❌ Failed to list {} files: {}", label, e));
            }
        }
    }

    lines
}
