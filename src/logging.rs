//! Structured JSON-lines logging for the feed pipeline.
//!
//! Every record carries a run id, a monotonically increasing sequence number
//! and a domain so that a load cycle can be followed from fetch through
//! normalization to the final view sync. Records go to stderr (stdout is
//! reserved for command output) and, when `LOG_DIR` is set, to
//! `<LOG_DIR>/<run_id>/events.jsonl`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            Ok("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Feed,      // Fetching the feed and metadata
    Normalize, // Row zipping, classification
    Filter,    // Filter spec changes
    View,      // Sink synchronization, parity
    System,    // Startup, config
    Profile,   // Timing scopes
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Feed => "feed",
            Domain::Normalize => "normalize",
            Domain::Filter => "filter",
            Domain::View => "view",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS is a comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let events = std::env::var("LOG_DIR").ok().and_then(|base| {
            let mut run_dir = PathBuf::from(base);
            run_dir.push(&run_id);
            if let Err(err) = create_dir_all(&run_dir) {
                eprintln!("[log] failed to create run dir: {}", err);
                return None;
            }
            match File::create(run_dir.join("events.jsonl")) {
                Ok(file) => Some(Mutex::new(BufWriter::new(file))),
                Err(err) => {
                    eprintln!("[log] failed to create events log: {}", err);
                    None
                }
            }
        });
        RunContext { run_id, events }
    })
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["entity_id", "source", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Mutex<BufWriter<File>>, line: &str) {
    if let Ok(mut w) = writer.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds
pub fn ts_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }

    emit_record(level, domain.as_str(), event, fields);
}

fn emit_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));

    let line = Value::Object(entry).to_string();
    if let Some(events) = &ctx.events {
        write_line(events, &line);
    }
    eprintln!("{}", line);
}

// =============================================================================
// Pipeline logs
// =============================================================================

/// A load cycle started against `source`.
pub fn log_load_start(source: &str) {
    log(
        Level::Info,
        Domain::Feed,
        "load_start",
        obj(&[("source", v_str(source))]),
    );
}

/// The primary feed could not be fetched; the cycle is abandoned.
pub fn log_load_failed(source: &str, err: &str) {
    log(
        Level::Error,
        Domain::Feed,
        "load_failed",
        obj(&[
            ("source", v_str(source)),
            ("msg", v_str("Failed to load data")),
            ("error", v_str(err)),
        ]),
    );
}

/// Metadata fetch failed and the default was substituted.
pub fn log_metadata_fallback(source: &str, err: &str) {
    log(
        Level::Warn,
        Domain::Feed,
        "metadata_fallback",
        obj(&[("source", v_str(source)), ("error", v_str(err))]),
    );
}

/// Summary of one normalization pass.
pub fn log_normalized(rows: usize, short_rows: usize, unparseable: usize, stale: usize) {
    log(
        Level::Info,
        Domain::Normalize,
        "normalized",
        obj(&[
            ("rows", json!(rows)),
            ("short_rows", json!(short_rows)),
            ("unparseable_timestamps", json!(unparseable)),
            ("stale", json!(stale)),
        ]),
    );
}

/// A new filter spec was applied.
pub fn log_filter(summary: Value, visible: usize, total: usize) {
    log(
        Level::Debug,
        Domain::Filter,
        "filter_applied",
        obj(&[
            ("spec", summary),
            ("visible", json!(visible)),
            ("total", json!(total)),
        ]),
    );
}

/// Sinks disagree about what is visible.
pub fn log_parity_violation(msg: &str) {
    log(
        Level::Error,
        Domain::View,
        "parity_violation",
        obj(&[("msg", v_str(msg))]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Profiling scope that emits structured timing on drop.
pub struct ProfileScope {
    label: &'static str,
    context: Option<Map<String, Value>>,
    started: Instant,
}

impl ProfileScope {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            context: None,
            started: Instant::now(),
        }
    }

    pub fn with_context(label: &'static str, fields: &[(&str, Value)]) -> Self {
        Self {
            label,
            context: Some(obj(fields)),
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let mut fields = self.context.take().unwrap_or_default();
        fields.insert("label".to_string(), v_str(self.label));
        fields.insert("elapsed_ms".to_string(), v_num(elapsed_ms));
        log(Level::Trace, Domain::Profile, "profile", fields);
    }
}
