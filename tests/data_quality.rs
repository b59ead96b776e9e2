use helpkart::classify::parse_timestamp;
use helpkart::data::{analyze_feed_file, file_sha256};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HOUR_MS: u64 = 60 * 60 * 1000;

fn write_feed(path: &Path, rows: serde_json::Value) {
    fs::write(path, serde_json::to_vec(&rows).unwrap()).unwrap();
}

#[test]
fn clean_feed_has_no_findings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rations.json");
    write_feed(
        &path,
        json!([
            ["id", "lat", "lng", "status", "updated_at"],
            [1, 10.0, 76.3, "critical", "2024-01-01T00:00:00Z"],
            [2, 10.1, 76.4, "surplus", "2024-01-01T00:30:00Z"]
        ]),
    );
    let now = parse_timestamp("2024-01-01T01:00:00Z").unwrap();
    let manifest = analyze_feed_file(&path, now, 4 * HOUR_MS).unwrap();
    assert_eq!(manifest.columns, ["id", "lat", "lng", "status", "updated_at"]);
    assert_eq!(manifest.report.rows, 2);
    assert_eq!(manifest.report.short_rows, 0);
    assert_eq!(manifest.report.long_rows, 0);
    assert_eq!(manifest.report.unparseable_timestamps, 0);
    assert_eq!(manifest.report.stale, 0);
    assert_eq!(manifest.hash_sha256, file_sha256(&path).unwrap());
    assert_eq!(manifest.hash_sha256.len(), 64);
}

#[test]
fn detects_ragged_rows_and_bad_timestamps() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ragged.json");
    write_feed(
        &path,
        json!([
            ["id", "status", "updated_at"],
            [1, "critical"],
            [2, "surplus", "yesterday-ish"],
            [3, "", "2024-01-01T00:00:00Z", "extra"]
        ]),
    );
    let now = parse_timestamp("2024-01-01T01:00:00Z").unwrap();
    let manifest = analyze_feed_file(&path, now, 4 * HOUR_MS).unwrap();
    assert_eq!(manifest.report.rows, 3);
    assert_eq!(manifest.report.short_rows, 1);
    assert_eq!(manifest.report.long_rows, 1);
    assert_eq!(manifest.report.unparseable_timestamps, 1);
    // missing and unparseable timestamps both count as stale
    assert_eq!(manifest.report.stale, 2);
}

#[test]
fn rejects_non_feed_json() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("object.json");
    fs::write(&path, r#"{"rows": []}"#).unwrap();
    assert!(analyze_feed_file(&path, 0, HOUR_MS).is_err());
    assert!(analyze_feed_file(&dir.path().join("missing.json"), 0, HOUR_MS).is_err());
}

#[test]
fn empty_feed_warns_missing_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.json");
    fs::write(&path, "[]").unwrap();
    let manifest = analyze_feed_file(&path, 0, HOUR_MS).unwrap();
    assert!(manifest.columns.is_empty());
    assert_eq!(manifest.report.rows, 0);
    assert!(manifest.report.warnings.iter().any(|w| w == "missing_header"));
}
