//! Multi-criterion entity filter.
//!
//! A [`FilterSpec`] is an immutable conjunction of predicates. [`matches`]
//! evaluates them in a fixed order and stops at the first failure; the order
//! is an optimization only, every permutation yields the same answer (see
//! [`matches_in_order`]).
//!
//! All text comparisons are case-insensitive substring matches. Missing
//! fields read as empty values and never raise.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::data::{Cell, Entity};

/// Type keyword that matches every location.
pub const TYPE_WILDCARD: &str = "other";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    query: String,
    since_ms: Option<i64>,
    keywords: Vec<String>,
    location: Option<String>,
    urgency: BTreeSet<String>,
    types: BTreeSet<String>,
    has_needs: bool,
    has_surplus: bool,
}

impl FilterSpec {
    pub fn builder() -> FilterSpecBuilder {
        FilterSpecBuilder::default()
    }

    /// Free-text query only.
    pub fn query(q: &str) -> Self {
        Self::builder().query(q).build()
    }

    pub fn query_text(&self) -> &str {
        &self.query
    }

    pub fn since_ms(&self) -> Option<i64> {
        self.since_ms
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn urgency(&self) -> &BTreeSet<String> {
        &self.urgency
    }

    pub fn types(&self) -> &BTreeSet<String> {
        &self.types
    }

    pub fn has_needs(&self) -> bool {
        self.has_needs
    }

    pub fn has_surplus(&self) -> bool {
        self.has_surplus
    }

    /// True when no criterion is active.
    pub fn is_empty(&self) -> bool {
        *self == FilterSpec::default()
    }

    pub fn summary(&self) -> Value {
        json!({
            "query": self.query,
            "since_ms": self.since_ms,
            "keywords": self.keywords,
            "location": self.location,
            "urgency": self.urgency,
            "types": self.types,
            "has_needs": self.has_needs,
            "has_surplus": self.has_surplus,
        })
    }
}

/// Collects raw control values; trims and lowercases text, drops blanks.
#[derive(Debug, Clone, Default)]
pub struct FilterSpecBuilder {
    spec: FilterSpec,
}

impl FilterSpecBuilder {
    pub fn query(mut self, q: &str) -> Self {
        self.spec.query = q.to_lowercase();
        self
    }

    pub fn since(mut self, bound: DateTime<Utc>) -> Self {
        self.spec.since_ms = Some(bound.timestamp_millis());
        self
    }

    pub fn since_ms(mut self, bound: Option<i64>) -> Self {
        self.spec.since_ms = bound;
        self
    }

    pub fn keyword(mut self, kw: &str) -> Self {
        if let Some(kw) = normalized(kw) {
            self.spec.keywords.push(kw);
        }
        self
    }

    pub fn keywords<I, S>(self, kws: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        kws.into_iter().fold(self, |b, kw| b.keyword(kw.as_ref()))
    }

    pub fn location(mut self, loc: &str) -> Self {
        self.spec.location = normalized(loc);
        self
    }

    pub fn urgency(mut self, label: &str) -> Self {
        if let Some(label) = normalized(label) {
            self.spec.urgency.insert(label);
        }
        self
    }

    pub fn type_keyword(mut self, kw: &str) -> Self {
        if let Some(kw) = normalized(kw) {
            self.spec.types.insert(kw);
        }
        self
    }

    pub fn has_needs(mut self, on: bool) -> Self {
        self.spec.has_needs = on;
        self
    }

    pub fn has_surplus(mut self, on: bool) -> Self {
        self.spec.has_surplus = on;
        self
    }

    pub fn build(self) -> FilterSpec {
        self.spec
    }
}

fn normalized(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_lowercase())
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// One clause of the conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    Query,
    Since,
    Location,
    Urgency,
    Types,
    ItemPresence,
    Keywords,
}

impl Predicate {
    /// Evaluation order used by [`matches`].
    pub const ALL: [Predicate; 7] = [
        Predicate::Query,
        Predicate::Since,
        Predicate::Location,
        Predicate::Urgency,
        Predicate::Types,
        Predicate::ItemPresence,
        Predicate::Keywords,
    ];

    pub fn eval(self, entity: &Entity, spec: &FilterSpec) -> bool {
        match self {
            Predicate::Query => query_matches(entity, &spec.query),
            Predicate::Since => match spec.since_ms {
                None => true,
                Some(bound) => entity.updated_at_ms().is_some_and(|ts| ts >= bound),
            },
            Predicate::Location => match &spec.location {
                None => true,
                Some(loc) => contains_ci(entity.location_name(), loc),
            },
            Predicate::Urgency => {
                if spec.urgency.is_empty() {
                    return true;
                }
                let raw = entity.status().map(str::to_lowercase);
                raw.is_some_and(|s| spec.urgency.contains(&s))
                    || spec.urgency.contains(&entity.display_status().to_lowercase())
            }
            Predicate::Types => {
                if spec.types.is_empty() || spec.types.contains(TYPE_WILDCARD) {
                    return true;
                }
                let location = entity.location_name().to_lowercase();
                spec.types.iter().any(|kw| location.contains(kw.as_str()))
            }
            Predicate::ItemPresence => {
                (!spec.has_needs || !entity.needed().is_empty())
                    && (!spec.has_surplus || !entity.surplus().is_empty())
            }
            Predicate::Keywords => {
                if spec.keywords.is_empty() {
                    return true;
                }
                let haystack = keyword_haystack(entity);
                spec.keywords.iter().any(|kw| haystack.contains(kw.as_str()))
            }
        }
    }
}

/// Scalar fields, the display status, and every item's name and amount.
fn query_matches(entity: &Entity, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    if contains_ci(entity.display_status(), query) {
        return true;
    }
    entity.fields().any(|(_, cell)| match cell {
        Cell::Items(items) => items
            .iter()
            .any(|i| contains_ci(&i.item, query) || contains_ci(&i.amount, query)),
        other => other
            .search_text()
            .is_some_and(|text| contains_ci(&text, query)),
    })
}

fn keyword_haystack(entity: &Entity) -> String {
    let mut parts: Vec<&str> = entity
        .needed()
        .iter()
        .chain(entity.surplus())
        .map(|i| i.item.as_str())
        .collect();
    parts.push(entity.location_name());
    parts.join(" ").to_lowercase()
}

/// Does `entity` satisfy every clause of `spec`?
pub fn matches(entity: &Entity, spec: &FilterSpec) -> bool {
    matches_in_order(entity, spec, &Predicate::ALL)
}

/// Evaluate the clauses in a caller-chosen order. With a permutation of
/// [`Predicate::ALL`] the result equals [`matches`].
pub fn matches_in_order(entity: &Entity, spec: &FilterSpec, order: &[Predicate]) -> bool {
    order.iter().all(|p| p.eval(entity, spec))
}
