//! Property-based tests using proptest
//!
//! These tests check the page and metric derivations over randomized
//! collections, filters and page sizes.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{json, Value};
use washpro::core::{aggregate_at, paginate, PageWindow, RecordFilter};
use washpro::resource::{get_resource, Record, ResourceKind};

const WARDS: [&str; 4] = ["Kudan", "Likoro", "Hunkuyi", "Zabi"];
const STATUSES: [&str; 3] = ["Maintained", "Unmaintained", "High Risk"];

/// Generate gutter records with unique ids
fn arb_gutters() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec((0..WARDS.len(), 0..STATUSES.len(), any::<bool>()), 0..60).prop_map(
        |rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (ward, status, discharge))| {
                    json!({
                        "_id": format!("g-{i}"),
                        "ward": WARDS[ward],
                        "village": "Hunkuyi",
                        "hamlet": format!("Hamlet {i}"),
                        "condition": "Constructed with Block",
                        "status": STATUSES[status],
                        "dischargePoint": if discharge { "yes" } else { "no" }
                    })
                })
                .collect()
        },
    )
}

fn decode(values: Vec<Value>) -> Vec<Record> {
    values
        .into_iter()
        .map(|v| Record::decode(ResourceKind::Gutters, v).unwrap())
        .collect()
}

fn search_fields() -> Vec<String> {
    get_resource(ResourceKind::Gutters)
        .unwrap()
        .search_fields
        .clone()
}

fn arb_filter_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("kudan".to_string()),
        Just("HAMLET 1".to_string()),
        "[a-z]{0,3}",
    ]
}

proptest! {
    /// Walking every page yields exactly the filtered records, in order
    #[test]
    fn pages_reconstruct_filtered_subset(
        values in arb_gutters(),
        text in arb_filter_text(),
        page_size in 1usize..12,
    ) {
        let records = decode(values);
        let fields = search_fields();
        let filter = RecordFilter { text, category: None };

        let expected: Vec<&str> = records
            .iter()
            .filter(|r| filter.matches(r, &fields))
            .map(|r| r.id().as_str())
            .collect();

        let mut window = PageWindow::new(page_size).unwrap();
        let first = paginate(&records, &filter, &fields, window);
        prop_assert_eq!(first.total_matching, expected.len());
        prop_assert_eq!(first.total_pages, expected.len().div_ceil(page_size));

        let mut seen = Vec::new();
        for page in 1..=first.total_pages {
            window.set_page(page, first.total_pages);
            let view = paginate(&records, &filter, &fields, window);
            prop_assert_eq!(view.page, Some(page));
            prop_assert!(view.rows.len() <= page_size);
            for row in &view.rows {
                prop_assert_eq!(row.number, seen.len() + 1);
                seen.push(row.record.id().as_str());
            }
        }
        prop_assert_eq!(seen, expected);
    }

    /// No matches means no pages and no current page
    #[test]
    fn zero_matches_has_no_pages(values in arb_gutters(), page_size in 1usize..12) {
        let records = decode(values);
        let filter = RecordFilter { text: "no such ward anywhere".to_string(), category: None };
        let view = paginate(&records, &filter, &search_fields(), PageWindow::new(page_size).unwrap());
        prop_assert_eq!(view.total_pages, 0);
        prop_assert_eq!(view.page, None);
        prop_assert!(view.rows.is_empty());
    }

    /// Requested pages past the end land on the last page
    #[test]
    fn page_is_clamped(values in arb_gutters(), page_size in 1usize..12, extra in 1usize..5) {
        let records = decode(values);
        let fields = search_fields();
        let filter = RecordFilter::default();
        let mut window = PageWindow::new(page_size).unwrap();
        let pages = paginate(&records, &filter, &fields, window).total_pages;

        window.set_page(pages + extra, pages);
        let view = paginate(&records, &filter, &fields, window);
        if pages == 0 {
            prop_assert_eq!(view.page, None);
        } else {
            prop_assert_eq!(view.page, Some(pages));
        }
    }

    /// Metric cards never depend on the page or the filter
    #[test]
    fn metrics_cover_full_collection(
        values in arb_gutters(),
        text in arb_filter_text(),
        page_size in 1usize..12,
    ) {
        let records = decode(values);
        let def = get_resource(ResourceKind::Gutters).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();

        let metrics = aggregate_at(&records, &def.metrics, now);
        let maintained = records.iter().filter(|r| r.field("status") == "Maintained").count();
        prop_assert_eq!(metrics.get("total").unwrap().count, records.len());
        prop_assert_eq!(metrics.get("maintained").unwrap().count, maintained);

        // paging and filtering read the same slice without changing it
        let filter = RecordFilter { text, category: None };
        let _ = paginate(&records, &filter, &def.search_fields, PageWindow::new(page_size).unwrap());
        prop_assert_eq!(aggregate_at(&records, &def.metrics, now), metrics);
    }
}
