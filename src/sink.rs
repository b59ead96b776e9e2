use serde::Serialize;
use std::collections::BTreeSet;

use crate::data::{Cell, Entity, EntityId};
use crate::style::{resolve_style, MarkerStyle};
use crate::view::PresentationSink;

pub const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const EMPTY_STATE: &str = "No results found.";

// =============================================================================
// Spatial sink
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Marker {
    pub entity_id: EntityId,
    pub lat: f64,
    pub lng: f64,
    pub title: String,
    pub style: MarkerStyle,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    fn point(lat: f64, lng: f64) -> Self {
        Self {
            south: lat,
            west: lng,
            north: lat,
            east: lng,
        }
    }

    fn extend(&mut self, lat: f64, lng: f64) {
        self.south = self.south.min(lat);
        self.north = self.north.max(lat);
        self.west = self.west.min(lng);
        self.east = self.east.max(lng);
    }
}

/// One marker per entity with usable coordinates, styled once at load.
///
/// Entities without coordinates are still part of the visible set the layer
/// was handed; they simply have nothing to draw.
#[derive(Debug, Default)]
pub struct MarkerLayer {
    markers: Vec<Marker>,
    shown: BTreeSet<EntityId>,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn visible_markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter().filter(|m| m.visible)
    }

    /// Visible entities that could not be placed.
    pub fn unplaced(&self) -> Vec<EntityId> {
        let placed: BTreeSet<EntityId> = self.markers.iter().map(|m| m.entity_id).collect();
        self.shown.difference(&placed).copied().collect()
    }

    /// Extent of every placed marker, for fitting the viewport after a load.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut iter = self.markers.iter();
        let first = iter.next()?;
        let mut b = Bounds::point(first.lat, first.lng);
        for m in iter {
            b.extend(m.lat, m.lng);
        }
        Some(b)
    }
}

impl PresentationSink for MarkerLayer {
    fn name(&self) -> &'static str {
        "map"
    }

    fn reset(&mut self, entities: &[Entity]) {
        self.shown.clear();
        self.markers = entities
            .iter()
            .filter_map(|e| {
                let (lat, lng) = e.coordinates()?;
                Some(Marker {
                    entity_id: e.entity_id(),
                    lat,
                    lng,
                    title: title_of(e),
                    style: resolve_style(e.display_status()),
                    visible: false,
                })
            })
            .collect();
    }

    fn render_visible(&mut self, visible: &[&Entity]) {
        self.shown = visible.iter().map(|e| e.entity_id()).collect();
        for m in &mut self.markers {
            m.visible = self.shown.contains(&m.entity_id);
        }
    }

    fn visible_ids(&self) -> BTreeSet<EntityId> {
        self.shown.clone()
    }
}

// =============================================================================
// List sink
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DetailRow {
    pub name: String,
    pub value: Cell,
}

#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub entity_id: EntityId,
    pub title: String,
    pub status_class: String,
    pub is_stale: bool,
    pub updated_at: Option<String>,
    pub phone: Option<String>,
    pub coordinates: Option<(f64, f64)>,
    pub details: Vec<DetailRow>,
}

/// Ordered cards for the visible set, rebuilt on every render.
#[derive(Debug, Default)]
pub struct CardList {
    hidden_columns: Vec<String>,
    cards: Vec<Card>,
}

impl CardList {
    pub fn new(hidden_columns: Vec<String>) -> Self {
        Self {
            hidden_columns,
            cards: Vec::new(),
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn is_empty_state(&self) -> bool {
        self.cards.is_empty()
    }

    fn card(&self, e: &Entity) -> Card {
        Card {
            entity_id: e.entity_id(),
            title: title_of(e),
            status_class: format!("status-{}", e.display_status()),
            is_stale: e.is_stale(),
            updated_at: e
                .updated_at()
                .and_then(|c| c.search_text().map(|s| s.into_owned())),
            phone: e.phone(),
            coordinates: e.coordinates(),
            details: e
                .detail_fields(&self.hidden_columns)
                .into_iter()
                .map(|(name, value)| DetailRow {
                    name: name.to_string(),
                    value: value.clone(),
                })
                .collect(),
        }
    }
}

impl PresentationSink for CardList {
    fn name(&self) -> &'static str {
        "list"
    }

    fn render_visible(&mut self, visible: &[&Entity]) {
        self.cards = visible.iter().map(|e| self.card(e)).collect();
    }

    fn visible_ids(&self) -> BTreeSet<EntityId> {
        self.cards.iter().map(|c| c.entity_id).collect()
    }
}

fn title_of(e: &Entity) -> String {
    match e.location_name() {
        "" => UNKNOWN_LOCATION.to_string(),
        name => name.to_string(),
    }
}
