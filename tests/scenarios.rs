//! End-to-end checks of normalization, classification and filtering on
//! small hand-built feeds.

use helpkart::classify::{classify, parse_timestamp};
use helpkart::data::{normalize, normalize_with_report, Entity, RawFeed};
use helpkart::filter::{matches, matches_in_order, FilterSpec, Predicate};
use helpkart::view::sync;
use serde_json::{json, Value};

const HOUR_MS: u64 = 60 * 60 * 1000;

fn feed(v: Value) -> RawFeed {
    serde_json::from_value(v).unwrap()
}

fn ts(s: &str) -> i64 {
    parse_timestamp(s).unwrap()
}

fn scenario_row() -> RawFeed {
    feed(json!([
        ["id", "lat", "lng", "status", "updated_at"],
        [1, 10.0, 76.3, "critical", "2024-01-01T00:00:00Z"]
    ]))
}

fn sample_entities() -> Vec<Entity> {
    let f = feed(json!([
        ["id", "lat", "lng", "status", "updated_at", "Location Name", "Phone", "needed", "surplus", "Notes"],
        [1, 10.0, 76.3, "critical", "2024-01-01T00:00:00Z", "St. Mary School", "555-0101",
            [{"item": "Rice", "amount": "10kg"}, {"item": "Water", "amount": "200L"}], [], "night access"],
        [2, 10.1, 76.4, "surplus", "2024-01-01T00:30:00Z", "Town Hall", "555-0102",
            [], [{"item": "Blankets", "amount": "40"}], ""],
        [3, 10.2, 76.5, "", "2023-12-20T00:00:00Z", "Temple Kitchen", "",
            [{"item": "Dal", "amount": "5kg"}], [{"item": "Rice", "amount": "2kg"}], "closed sundays"],
        [4, "", "", "Critical", "garbage", "Community Church"],
        [5, 10.3, 76.6]
    ]));
    normalize(&f, ts("2024-01-01T01:00:00Z"), 4 * HOUR_MS)
}

fn sample_specs() -> Vec<FilterSpec> {
    vec![
        FilterSpec::default(),
        FilterSpec::query("rice"),
        FilterSpec::query("555"),
        FilterSpec::builder().urgency("critical").build(),
        FilterSpec::builder().urgency("stale").urgency("surplus").build(),
        FilterSpec::builder().type_keyword("school").type_keyword("church").build(),
        FilterSpec::builder().type_keyword("other").build(),
        FilterSpec::builder().has_needs(true).has_surplus(true).build(),
        FilterSpec::builder().keywords(["blanket", "kitchen"]).build(),
        FilterSpec::builder().location("hall").query("blank").build(),
        FilterSpec::builder()
            .since_ms(Some(ts("2024-01-01T00:15:00Z")))
            .build(),
        FilterSpec::builder()
            .query("a")
            .urgency("critical")
            .has_needs(true)
            .keyword("rice")
            .type_keyword("school")
            .location("st")
            .since_ms(Some(ts("2023-01-01T00:00:00Z")))
            .build(),
    ]
}

#[test]
fn scenario_a_old_record_is_stale() {
    let entities = normalize(&scenario_row(), ts("2024-01-02T00:00:00Z"), 4 * HOUR_MS);
    assert_eq!(entities.len(), 1);
    assert!(entities[0].is_stale());
    assert_eq!(entities[0].display_status(), "stale");
}

#[test]
fn scenario_b_recent_record_keeps_status() {
    let entities = normalize(&scenario_row(), ts("2024-01-01T00:01:00Z"), 4 * HOUR_MS);
    assert!(!entities[0].is_stale());
    assert_eq!(entities[0].display_status(), "critical");
}

#[test]
fn scenario_c_keyword_matches_item_case_insensitively() {
    let f = feed(json!([
        ["id", "updated_at", "needed"],
        [1, "2024-01-01T00:00:00Z", [{"item": "Rice", "amount": "10kg"}]]
    ]));
    let entities = normalize(&f, ts("2024-01-01T00:00:00Z"), HOUR_MS);
    let spec = FilterSpec::builder().keyword("rice").build();
    assert!(matches(&entities[0], &spec));
}

#[test]
fn scenario_d_empty_surplus_is_excluded() {
    let f = feed(json!([
        ["id", "updated_at", "surplus"],
        [1, "2024-01-01T00:00:00Z", []]
    ]));
    let entities = normalize(&f, ts("2024-01-01T00:00:00Z"), HOUR_MS);
    let spec = FilterSpec::builder().has_surplus(true).build();
    assert!(!matches(&entities[0], &spec));
}

#[test]
fn scenario_e_short_row_is_tolerated() {
    let f = feed(json!([
        ["id", "lat", "lng", "status", "updated_at", "Location Name", "needed", "surplus"],
        [1, 10.0, 76.3]
    ]));
    let (entities, report) = normalize_with_report(&f, ts("2024-01-01T00:00:00Z"), HOUR_MS);
    assert_eq!(entities.len(), 1);
    assert_eq!(report.short_rows, 1);

    let e = &entities[0];
    assert!(e.get("status").is_none());
    assert!(e.get("Location Name").is_none());
    assert!(e.get("needed").is_none());

    let requiring = [
        FilterSpec::builder().has_needs(true).build(),
        FilterSpec::builder().has_surplus(true).build(),
        FilterSpec::builder().location("camp").build(),
        FilterSpec::builder().keyword("rice").build(),
        FilterSpec::builder().type_keyword("school").build(),
        FilterSpec::builder().since_ms(Some(0)).build(),
        FilterSpec::builder().urgency("critical").build(),
    ];
    for spec in &requiring {
        assert!(!matches(e, spec), "{:?}", spec);
    }
}

#[test]
fn empty_spec_matches_everything() {
    for e in &sample_entities() {
        assert!(matches(e, &FilterSpec::default()));
    }
}

#[test]
fn partition_is_complete_and_disjoint() {
    let entities = sample_entities();
    for spec in sample_specs() {
        let p = sync(&entities, &spec);
        assert_eq!(p.visible.len() + p.hidden.len(), entities.len());
        let visible = p.visible_ids();
        for h in &p.hidden {
            assert!(!visible.contains(&h.entity_id()));
        }
        for v in &p.visible {
            assert!(matches(v, &spec));
        }
    }
}

fn permutations(items: &[Predicate]) -> Vec<Vec<Predicate>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

#[test]
fn predicate_order_never_changes_result() {
    let entities = sample_entities();
    let orders = permutations(&Predicate::ALL);
    assert_eq!(orders.len(), 5040);
    for spec in sample_specs() {
        for e in &entities {
            let expected = matches(e, &spec);
            for order in &orders {
                assert_eq!(matches_in_order(e, &spec, order), expected);
            }
        }
    }
}

#[test]
fn raising_threshold_never_makes_records_stale() {
    let now = ts("2024-01-10T00:00:00Z");
    let stamps = [
        "2024-01-09T23:59:00Z",
        "2024-01-09T00:00:00Z",
        "2023-06-01T00:00:00Z",
        "2024-02-01T00:00:00Z",
        "not a date",
    ];
    let thresholds = [0, 1, HOUR_MS, 24 * HOUR_MS, 365 * 24 * HOUR_MS, u64::MAX];
    for stamp in stamps {
        let mut was_fresh = false;
        for t in thresholds {
            let stale = classify(Some(stamp), Some("critical"), now, t).is_stale;
            assert!(!(was_fresh && stale), "{} went stale at threshold {}", stamp, t);
            was_fresh |= !stale;
        }
    }
}

#[test]
fn normalization_is_deterministic() {
    let f = feed(json!([
        ["id", "status", "updated_at"],
        [1, "critical", "2024-01-01T00:00:00Z"],
        [2, "", "2023-01-01T00:00:00Z"],
        [3, "surplus"]
    ]));
    let now = ts("2024-01-01T02:00:00Z");
    let a = normalize(&f, now, HOUR_MS * 4);
    let b = normalize(&f, now, HOUR_MS * 4);
    let view = |es: &[Entity]| {
        es.iter()
            .map(|e| (e.entity_id(), e.is_stale(), e.display_status().to_string()))
            .collect::<Vec<_>>()
    };
    assert_eq!(view(&a), view(&b));
}

#[test]
fn unparseable_timestamp_is_stale_but_keeps_raw_status() {
    let entities = sample_entities();
    let garbage = &entities[3];
    assert!(garbage.is_stale());
    assert_eq!(garbage.display_status(), "stale");
    // the raw status is still reachable through the urgency filter
    assert!(matches(garbage, &FilterSpec::builder().urgency("critical").build()));
}

#[test]
fn zoned_minute_timestamps_stay_fresh_and_pass_since() {
    let f = feed(json!([
        ["id", "status", "updated_at"],
        [1, "critical", "2024-01-01T10:30Z"],
        [2, "critical", "2024-01-01T16:00+05:30"],
        [3, "critical", "2024-01-01T16:00:00+0530"]
    ]));
    let (entities, report) = normalize_with_report(&f, ts("2024-01-01T10:35:00Z"), 4 * HOUR_MS);
    assert_eq!(report.unparseable_timestamps, 0);
    let since = FilterSpec::builder()
        .since_ms(Some(ts("2024-01-01T10:00:00Z")))
        .build();
    for e in &entities {
        assert!(!e.is_stale());
        assert_eq!(e.display_status(), "critical");
        assert!(matches(e, &since));
    }
}
