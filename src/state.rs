use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::Entity;
use crate::feed::Metadata;
use crate::filter::FilterSpec;

pub const DEFAULT_STALE_THRESHOLD_MS: u64 = 24 * 60 * 60 * 1000;

/// Field names shown nowhere in generic detail listings.
pub const DEFAULT_SYSTEM_COLUMNS: [&str; 5] = ["id", "lat", "lng", "status", "updated_at"];

/// Known fields a detail renderer already shows in its header/actions.
pub const HEADER_COLUMNS: [&str; 2] = ["Location Name", "Phone"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub data_url: String,
    pub metadata_url: Option<String>,
    pub stale_threshold_ms: u64,
    pub system_columns: Vec<String>,
    pub fetch_timeout_secs: u64,
    /// Quiet period before a burst of filter edits is applied
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_url: "rations.json".to_string(),
            metadata_url: Some("metadata.json".to_string()),
            stale_threshold_ms: DEFAULT_STALE_THRESHOLD_MS,
            system_columns: DEFAULT_SYSTEM_COLUMNS.iter().map(|s| s.to_string()).collect(),
            fetch_timeout_secs: 10,
            debounce_ms: 150,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            data_url: std::env::var("DATA_URL").unwrap_or(d.data_url),
            metadata_url: match std::env::var("METADATA_URL") {
                Ok(v) if v.trim().is_empty() || v == "none" => None,
                Ok(v) => Some(v),
                Err(_) => d.metadata_url,
            },
            stale_threshold_ms: std::env::var("STALE_THRESHOLD_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.stale_threshold_ms),
            system_columns: std::env::var("SYSTEM_COLUMNS")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(d.system_columns),
            fetch_timeout_secs: std::env::var("FETCH_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.fetch_timeout_secs),
            debounce_ms: std::env::var("DEBOUNCE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.debounce_ms),
        }
    }

    /// Parse a JSON config object; missing keys take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Names a detail renderer must not list as generic rows.
    pub fn hidden_detail_columns(&self) -> Vec<String> {
        self.system_columns
            .iter()
            .cloned()
            .chain(HEADER_COLUMNS.iter().map(|s| s.to_string()))
            .collect()
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loaded { entities: usize },
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Map,
    List,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Map => ViewMode::List,
            ViewMode::List => ViewMode::Map,
        }
    }
}

/// Everything the orchestrating layer owns between interactions.
///
/// The entity collection is only ever replaced as a whole; nothing downstream
/// holds on to it between calls.
#[derive(Debug, Default)]
pub struct AppState {
    pub entities: Vec<Entity>,
    pub spec: FilterSpec,
    pub status: LoadStatus,
    pub metadata: Metadata,
    pub view_mode: ViewMode,
    pub last_check: Option<DateTime<Utc>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_entities(&mut self, entities: Vec<Entity>) {
        self.status = LoadStatus::Loaded {
            entities: entities.len(),
        };
        self.entities = entities;
    }

    pub fn toggle_view(&mut self) -> ViewMode {
        self.view_mode = self.view_mode.toggle();
        self.view_mode
    }

    /// Text for the status banner.
    pub fn banner(&self) -> String {
        match &self.status {
            LoadStatus::Failed(msg) => msg.clone(),
            _ => match self.last_check {
                Some(ts) => format!("Last Check: {}", ts.format("%H:%M")),
                None => "Last Check: --:--".to_string(),
            },
        }
    }

    pub fn last_refresh_label(&self) -> String {
        self.metadata
            .last_updated
            .clone()
            .unwrap_or_else(|| "Unknown".to_string())
    }
}
