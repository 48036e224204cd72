use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use diun_tracker_lib::{sorted_updates, summarize, UpdateMap, UpdateRecord};
use tracing::info;

use crate::server::store::{FileStore, UpdateStore};

async fn load(path: &Path) -> anyhow::Result<UpdateMap> {
    FileStore::new(path)
        .load()
        .await
        .with_context(|| format!("cannot read updates from {}", path.display()))
}

/// One line per record: detection time, status, image.
pub fn format_record(record: &UpdateRecord) -> String {
    let detected = DateTime::<Utc>::from_timestamp_millis(record.detected_at)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| record.detected_at.to_string());
    format!(
        "{}  {:<8} {}",
        detected,
        record.status.as_deref().unwrap_or("-"),
        record.image.as_deref().unwrap_or("-")
    )
}

pub async fn run_list(path: &Path) -> anyhow::Result<()> {
    let updates = load(path).await?;
    if updates.is_empty() {
        println!("No updates available");
        return Ok(());
    }
    for record in sorted_updates(&updates) {
        println!("{}", format_record(record));
    }
    Ok(())
}

pub async fn run_summary(path: &Path) -> anyhow::Result<()> {
    let updates = load(path).await?;
    let summary = serde_json::to_string_pretty(&summarize(&updates))?;
    println!("{}", summary);
    Ok(())
}

pub async fn run_clear(path: &Path) -> anyhow::Result<()> {
    let store = FileStore::new(path);
    store
        .save(&UpdateMap::new())
        .await
        .with_context(|| format!("cannot clear {}", path.display()))?;
    info!(path = %path.display(), "cleared all updates");
    Ok(())
}
