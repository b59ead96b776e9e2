//! Offline data-quality report for a feed file.
//!
//! Usage: feed_report [path] (defaults to DATA_URL, then rations.json)

use helpkart::data::analyze_feed_file;
use helpkart::state::{now_ms, Config};
use serde_json::json;
use std::env;
use std::path::PathBuf;

fn main() {
    let cfg = Config::from_env();
    let path = env::args().nth(1).unwrap_or_else(|| cfg.data_url.clone());

    let manifest = match analyze_feed_file(
        PathBuf::from(&path).as_path(),
        now_ms(),
        cfg.stale_threshold_ms,
    ) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("analysis failed: {}", err);
            std::process::exit(3);
        }
    };

    let healthy = manifest.report.short_rows == 0
        && manifest.report.long_rows == 0
        && manifest.report.unparseable_timestamps == 0;
    let payload = json!({
        "manifest": manifest,
        "healthy": healthy,
    });
    match serde_json::to_string_pretty(&payload) {
        Ok(out) => println!("{}", out),
        Err(err) => {
            eprintln!("failed to encode report: {}", err);
            std::process::exit(4);
        }
    }
}
