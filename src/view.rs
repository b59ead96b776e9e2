//! Filtered view shared by the spatial and list sinks.
//!
//! Every call recomputes the partition from the full entity collection and
//! hands the same visible slice to both sinks. Nothing is cached between
//! calls, so the sinks cannot drift apart through a stale partial result.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::data::{Entity, EntityId};
use crate::filter::{matches, FilterSpec};
use crate::logging::{log_filter, log_parity_violation, ProfileScope};

/// Entities split by the active filter. Order follows the input collection.
#[derive(Debug, Clone, Default)]
pub struct Partition<'a> {
    pub visible: Vec<&'a Entity>,
    pub hidden: Vec<&'a Entity>,
}

impl<'a> Partition<'a> {
    pub fn visible_ids(&self) -> BTreeSet<EntityId> {
        self.visible.iter().map(|e| e.entity_id()).collect()
    }

    pub fn len(&self) -> usize {
        self.visible.len() + self.hidden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn sync<'a>(entities: &'a [Entity], spec: &FilterSpec) -> Partition<'a> {
    let (visible, hidden) = entities.iter().partition(|e| matches(e, spec));
    Partition { visible, hidden }
}

/// A surface that renders the current visible set.
pub trait PresentationSink {
    fn name(&self) -> &'static str;

    /// Called once per load with the full replacement collection.
    fn reset(&mut self, _entities: &[Entity]) {}

    fn render_visible(&mut self, visible: &[&Entity]);

    /// What the sink currently shows.
    fn visible_ids(&self) -> BTreeSet<EntityId>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParityViolation {
    pub msg: String,
}

impl fmt::Display for ParityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "visibility parity violated: {}", self.msg)
    }
}

impl std::error::Error for ParityViolation {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub visible: usize,
    pub hidden: usize,
}

/// Drives a spatial sink and a list sink from one partition.
#[derive(Debug)]
pub struct ViewSynchronizer<M, L> {
    spatial: M,
    list: L,
}

impl<M: PresentationSink, L: PresentationSink> ViewSynchronizer<M, L> {
    pub fn new(spatial: M, list: L) -> Self {
        Self { spatial, list }
    }

    pub fn spatial(&self) -> &M {
        &self.spatial
    }

    pub fn list(&self) -> &L {
        &self.list
    }

    /// New collection: reset both sinks, then apply `spec`.
    pub fn reload(
        &mut self,
        entities: &[Entity],
        spec: &FilterSpec,
    ) -> Result<SyncSummary, ParityViolation> {
        self.spatial.reset(entities);
        self.list.reset(entities);
        self.apply(entities, spec)
    }

    pub fn apply(
        &mut self,
        entities: &[Entity],
        spec: &FilterSpec,
    ) -> Result<SyncSummary, ParityViolation> {
        let _scope = ProfileScope::with_context("view_sync", &[("entities", entities.len().into())]);
        let partition = sync(entities, spec);
        self.spatial.render_visible(&partition.visible);
        self.list.render_visible(&partition.visible);
        log_filter(spec.summary(), partition.visible.len(), entities.len());

        let expected = partition.visible_ids();
        self.check_parity_against(&expected)?;
        Ok(SyncSummary {
            visible: partition.visible.len(),
            hidden: partition.hidden.len(),
        })
    }

    /// Both sinks show the same entities.
    pub fn check_parity(&self) -> Result<(), ParityViolation> {
        let spatial = self.spatial.visible_ids();
        let list = self.list.visible_ids();
        if spatial != list {
            let violation = ParityViolation {
                msg: format!(
                    "{} shows {} entities, {} shows {}",
                    self.spatial.name(),
                    spatial.len(),
                    self.list.name(),
                    list.len()
                ),
            };
            log_parity_violation(&violation.msg);
            return Err(violation);
        }
        Ok(())
    }

    fn check_parity_against(&self, expected: &BTreeSet<EntityId>) -> Result<(), ParityViolation> {
        self.check_parity()?;
        if &self.list.visible_ids() != expected {
            let violation = ParityViolation {
                msg: format!("sinks disagree with the filtered set of {}", expected.len()),
            };
            log_parity_violation(&violation.msg);
            return Err(violation);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{normalize, RawFeed};
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        shown: BTreeSet<EntityId>,
        drop_first: bool,
    }

    impl PresentationSink for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn render_visible(&mut self, visible: &[&Entity]) {
            let skip = usize::from(self.drop_first);
            self.shown = visible.iter().skip(skip).map(|e| e.entity_id()).collect();
        }

        fn visible_ids(&self) -> BTreeSet<EntityId> {
            self.shown.clone()
        }
    }

    fn entities() -> Vec<Entity> {
        let feed: RawFeed = serde_json::from_value(json!([
            ["id", "Location Name", "updated_at"],
            [1, "Alpha", "2024-01-01T00:00:00Z"],
            [2, "Beta", "2024-01-01T00:00:00Z"],
            [1, "Alpha", "2024-01-01T00:00:00Z"]
        ]))
        .unwrap();
        normalize(&feed, 0, u64::MAX)
    }

    #[test]
    fn test_sync_partitions_in_order() {
        let es = entities();
        let p = sync(&es, &FilterSpec::query("alpha"));
        assert_eq!(p.visible.len(), 2);
        assert_eq!(p.hidden.len(), 1);
        assert_eq!(p.len(), es.len());
        // identical rows stay distinct members
        assert_eq!(p.visible_ids(), [EntityId(0), EntityId(2)].into_iter().collect());
    }

    #[test]
    fn test_apply_reports_summary() {
        let es = entities();
        let mut view = ViewSynchronizer::new(Recorder::default(), Recorder::default());
        let summary = view.reload(&es, &FilterSpec::query("beta")).unwrap();
        assert_eq!(summary, SyncSummary { visible: 1, hidden: 2 });
        assert_eq!(view.spatial().visible_ids(), view.list().visible_ids());
    }

    #[test]
    fn test_faulty_sink_is_detected() {
        let es = entities();
        let faulty = Recorder {
            drop_first: true,
            ..Default::default()
        };
        let mut view = ViewSynchronizer::new(faulty, Recorder::default());
        let err = view.apply(&es, &FilterSpec::default()).unwrap_err();
        assert!(err.msg.contains("recorder"));
    }
}
