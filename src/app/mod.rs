//! Load cycle and interaction handling.
//!
//! `App` is the single owner of the entity collection. A load replaces the
//! collection wholesale and resets both sinks; a filter change re-runs the
//! synchronizer over the full collection. Fetching is the only await point.

use anyhow::{Context, Result};

use crate::classify::to_datetime;
use crate::data::normalize;
use crate::feed::{fetch_metadata_or_default, source_for, FeedSource};
use crate::filter::FilterSpec;
use crate::logging::{log_load_failed, log_load_start, ProfileScope};
use crate::sink::{CardList, MarkerLayer};
use crate::state::{AppState, Config, LoadStatus, ViewMode};
use crate::view::{ParityViolation, SyncSummary, ViewSynchronizer};

mod debounce;

pub use debounce::{debounced_filters, FilterSender, SettledFilters};

pub const LOAD_ERROR: &str = "Error loading data.";

pub struct App {
    cfg: Config,
    source: Box<dyn FeedSource + Send + Sync>,
    state: AppState,
    view: ViewSynchronizer<MarkerLayer, CardList>,
}

impl App {
    pub fn new(cfg: Config, source: Box<dyn FeedSource + Send + Sync>) -> Self {
        let list = CardList::new(cfg.hidden_detail_columns());
        Self {
            cfg,
            source,
            state: AppState::new(),
            view: ViewSynchronizer::new(MarkerLayer::new(), list),
        }
    }

    pub fn from_config(cfg: Config) -> Result<Self> {
        let source = source_for(&cfg)?;
        Ok(Self::new(cfg, source))
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> &ViewSynchronizer<MarkerLayer, CardList> {
        &self.view
    }

    /// Fetch, normalize and display a fresh collection.
    ///
    /// On a feed failure the previous collection stays as it was and the
    /// status reports the error; metadata failures only reset the refresh
    /// label.
    pub async fn load(&mut self, now_ms: i64) -> Result<SyncSummary> {
        let _scope = ProfileScope::new("load");
        self.state.last_check = to_datetime(now_ms);
        let origin = self.source.describe();
        log_load_start(&origin);

        let (feed, metadata) = tokio::join!(
            self.source.fetch_feed(),
            fetch_metadata_or_default(self.source.as_ref()),
        );
        self.state.metadata = metadata;

        let feed = match feed {
            Ok(feed) => feed,
            Err(e) => {
                log_load_failed(&origin, &format!("{:#}", e));
                self.state.status = LoadStatus::Failed(LOAD_ERROR.to_string());
                return Err(e.context(format!("load feed from {}", origin)));
            }
        };

        let entities = normalize(&feed, now_ms, self.cfg.stale_threshold_ms);
        self.state.replace_entities(entities);
        self.view
            .reload(&self.state.entities, &self.state.spec)
            .context("sync after load")
    }

    pub fn set_filter(&mut self, spec: FilterSpec) -> Result<SyncSummary, ParityViolation> {
        self.state.spec = spec;
        self.view.apply(&self.state.entities, &self.state.spec)
    }

    /// Apply settled specs until the sender side goes away, reporting each
    /// resync to `on_sync`.
    pub async fn follow_filters<F>(
        &mut self,
        settled: &mut SettledFilters,
        mut on_sync: F,
    ) -> Result<()>
    where
        F: FnMut(&AppState, SyncSummary),
    {
        while let Some(spec) = settled.next().await {
            let summary = self.set_filter(spec)?;
            on_sync(&self.state, summary);
        }
        Ok(())
    }

    pub fn toggle_view(&mut self) -> ViewMode {
        self.state.toggle_view()
    }
}
