use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::classify::{classify_ms, parse_cell_timestamp};
use crate::logging::{log_normalized, ProfileScope};

mod entity;

pub use entity::{
    format_number, Cell, Entity, EntityId, Item, KNOWN_FIELDS, LOCATION_NAME, NEEDED, PHONE,
    SURPLUS,
};

/// Header row followed by positional data rows, as served.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFeed {
    pub rows: Vec<Vec<Value>>,
}

impl RawFeed {
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self { rows }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn data_rows(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub rows: u64,
    pub short_rows: u64,
    pub long_rows: u64,
    pub unparseable_timestamps: u64,
    pub stale: u64,
    pub warnings: Vec<String>,
}

/// Zip every data row against the header and classify it.
pub fn normalize(feed: &RawFeed, now_ms: i64, stale_threshold_ms: u64) -> Vec<Entity> {
    normalize_with_report(feed, now_ms, stale_threshold_ms).0
}

pub fn normalize_with_report(
    feed: &RawFeed,
    now_ms: i64,
    stale_threshold_ms: u64,
) -> (Vec<Entity>, NormalizeReport) {
    let mut report = NormalizeReport::default();
    if feed.rows.len() < 2 {
        return (Vec::new(), report);
    }
    let _scope = ProfileScope::with_context("normalize", &[("rows", feed.data_rows().into())]);

    let header: Arc<[String]> = feed.rows[0].iter().map(header_name).collect();
    let mut entities = Vec::with_capacity(feed.data_rows());

    for (idx, row) in feed.rows[1..].iter().enumerate() {
        report.rows += 1;
        if row.len() < header.len() {
            report.short_rows += 1;
            report.warnings.push(format!(
                "short_row: row={} expected={} got={}",
                idx + 1,
                header.len(),
                row.len()
            ));
        } else if row.len() > header.len() {
            report.long_rows += 1;
            report.warnings.push(format!(
                "long_row: row={} expected={} got={}",
                idx + 1,
                header.len(),
                row.len()
            ));
        }

        let values: Vec<Option<Cell>> = (0..header.len())
            .map(|col| row.get(col).map(Cell::from_json))
            .collect();

        let entity = Entity::new(
            EntityId(idx),
            Arc::clone(&header),
            values,
            Default::default(),
        );
        let updated_ms = entity.updated_at().and_then(parse_cell_timestamp);
        if updated_ms.is_none() && entity.updated_at().is_some() {
            report.unparseable_timestamps += 1;
            report.warnings.push(format!("bad_timestamp: row={}", idx + 1));
        }
        let freshness = classify_ms(updated_ms, entity.status(), now_ms, stale_threshold_ms);
        if freshness.is_stale {
            report.stale += 1;
        }
        entities.push(entity.with_freshness(freshness));
    }

    log_normalized(
        entities.len(),
        report.short_rows as usize,
        report.unparseable_timestamps as usize,
        report.stale as usize,
    );
    (entities, report)
}

fn header_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedManifest {
    pub path: String,
    pub hash_sha256: String,
    pub columns: Vec<String>,
    pub stale_threshold_ms: u64,
    pub generated_at_ms: i64,
    pub report: NormalizeReport,
}

/// Offline quality check of a feed file.
pub fn analyze_feed_file(
    path: &Path,
    now_ms: i64,
    stale_threshold_ms: u64,
) -> Result<FeedManifest, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    let hash = hex::encode(Sha256::digest(&bytes));
    let feed = RawFeed::from_slice(&bytes).map_err(|e| format!("bad feed json: {}", e))?;
    let columns = feed
        .rows
        .first()
        .map(|h| h.iter().map(header_name).collect())
        .unwrap_or_default();
    let (_, mut report) = normalize_with_report(&feed, now_ms, stale_threshold_ms);
    if feed.rows.is_empty() {
        report.warnings.push("missing_header".to_string());
    }
    Ok(FeedManifest {
        path: path.display().to_string(),
        hash_sha256: hash,
        columns,
        stale_threshold_ms,
        generated_at_ms: now_ms,
        report,
    })
}

pub fn file_sha256(path: &Path) -> Result<String, String> {
    let mut file = File::open(path).map_err(|e| e.to_string())?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
