use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

use crate::classify::{parse_cell_timestamp, Freshness};

/// Fields with a typed accessor on [`Entity`]. Everything else is an extra.
pub const KNOWN_FIELDS: [&str; 9] = [
    "id",
    "lat",
    "lng",
    "status",
    "updated_at",
    "Location Name",
    "Phone",
    "needed",
    "surplus",
];

pub const LOCATION_NAME: &str = "Location Name";
pub const PHONE: &str = "Phone";
pub const NEEDED: &str = "needed";
pub const SURPLUS: &str = "surplus";

/// Row position assigned at normalization. Distinguishes structurally
/// identical records within one load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub usize);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item: String,
    pub amount: String,
}

impl Item {
    pub fn new(item: &str, amount: &str) -> Self {
        Self {
            item: item.to_string(),
            amount: amount.to_string(),
        }
    }
}

/// One field value as it came off the feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Items(Vec<Item>),
    Other(Value),
}

impl Cell {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Null,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Null),
            Value::String(s) => Cell::Text(s.clone()),
            Value::Array(values) => Cell::Items(values.iter().filter_map(item_from_json).collect()),
            Value::Object(_) => Cell::Other(value.clone()),
        }
    }

    /// Text the free-text search scans. Booleans, nulls and nested objects
    /// are not searchable.
    pub fn search_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Cell::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Cell::Number(n) => Some(Cow::Owned(format_number(*n))),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        let v = match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        v.filter(|n| n.is_finite())
    }

    pub fn items(&self) -> Option<&[Item]> {
        match self {
            Cell::Items(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

fn item_from_json(value: &Value) -> Option<Item> {
    match value {
        Value::Object(map) => Some(Item {
            item: map.get("item").map(scalar_string).unwrap_or_default(),
            amount: map.get("amount").map(scalar_string).unwrap_or_default(),
        }),
        Value::String(s) => Some(Item::new(s, "")),
        _ => None,
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_default(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Integral values print without a fraction, so `10.0` searches as "10".
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

/// A normalized relief-site record.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    header: Arc<[String]>,
    /// Positional values; `None` where the source row was too short.
    values: Vec<Option<Cell>>,
    is_stale: bool,
    display_status: String,
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        header: Arc<[String]>,
        values: Vec<Option<Cell>>,
        freshness: Freshness,
    ) -> Self {
        Self {
            id,
            header,
            values,
            is_stale: freshness.is_stale,
            display_status: freshness.display_status,
        }
    }

    pub(crate) fn with_freshness(mut self, freshness: Freshness) -> Self {
        self.is_stale = freshness.is_stale;
        self.display_status = freshness.display_status;
        self
    }

    pub fn entity_id(&self) -> EntityId {
        self.id
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale
    }

    pub fn display_status(&self) -> &str {
        &self.display_status
    }

    /// Value of `name`. A duplicated header name resolves to its last column.
    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.header
            .iter()
            .rposition(|h| h == name)
            .and_then(|idx| self.values.get(idx))
            .and_then(|v| v.as_ref())
    }

    pub fn id(&self) -> Option<&Cell> {
        self.get("id")
    }

    pub fn lat(&self) -> Option<f64> {
        self.get("lat").and_then(Cell::as_f64)
    }

    pub fn lng(&self) -> Option<f64> {
        self.get("lng").and_then(Cell::as_f64)
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat()?, self.lng()?))
    }

    pub fn status(&self) -> Option<&str> {
        self.get("status").and_then(Cell::as_str)
    }

    pub fn updated_at(&self) -> Option<&Cell> {
        self.get("updated_at")
    }

    pub fn updated_at_ms(&self) -> Option<i64> {
        self.updated_at().and_then(parse_cell_timestamp)
    }

    /// Empty string when the field is missing.
    pub fn location_name(&self) -> &str {
        self.get(LOCATION_NAME).and_then(Cell::as_str).unwrap_or("")
    }

    pub fn phone(&self) -> Option<String> {
        self.get(PHONE)
            .and_then(|c| c.search_text().map(|s| s.into_owned()))
            .filter(|s| !s.trim().is_empty())
    }

    /// Item list under `name`; empty when missing or not a list.
    pub fn items(&self, name: &str) -> &[Item] {
        self.get(name).and_then(Cell::items).unwrap_or(&[])
    }

    pub fn needed(&self) -> &[Item] {
        self.items(NEEDED)
    }

    pub fn surplus(&self) -> &[Item] {
        self.items(SURPLUS)
    }

    /// Present fields in header order, one entry per distinct name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Cell)> + '_ {
        self.header.iter().enumerate().filter_map(move |(idx, name)| {
            let last = self.header.iter().rposition(|h| h == name)?;
            if last != idx {
                return None;
            }
            self.values
                .get(idx)
                .and_then(|v| v.as_ref())
                .map(|cell| (name.as_str(), cell))
        })
    }

    /// Fields without a typed accessor, as a generic key/value list.
    pub fn extras(&self) -> Vec<(&str, &Cell)> {
        self.fields()
            .filter(|(name, _)| !KNOWN_FIELDS.contains(name))
            .collect()
    }

    /// Rows a detail renderer lists: not hidden, not internal (`_` prefix),
    /// and not an empty item list.
    pub fn detail_fields<S: AsRef<str>>(&self, hidden: &[S]) -> Vec<(&str, &Cell)> {
        self.fields()
            .filter(|(name, _)| !hidden.iter().any(|h| h.as_ref() == *name))
            .filter(|(name, _)| !name.starts_with('_'))
            .filter(|(_, cell)| !matches!(cell, Cell::Items(items) if items.is_empty()))
            .collect()
    }
}
