use parking_lot::RwLock;
use stac_static::query::{SearchParams, telemetry};
use stac_static::{Item, ItemTable, SearchConfig, search};
use std::sync::Arc;

fn table() -> ItemTable {
    let dt = chrono::DateTime::parse_from_rfc3339("2021-05-05T00:00:00Z").unwrap().to_utc();
    ItemTable::from_items(vec![
        Item::new("telemetry-a", serde_json::Value::Null, dt).with_collection("telemetry"),
        Item::new("telemetry-b", serde_json::Value::Null, dt).with_collection("telemetry"),
    ])
    .unwrap()
}

#[test]
fn search_lines_reach_the_sink_and_metrics() {
    let sink = Arc::new(RwLock::new(Vec::new()));
    telemetry::set_search_sink_for_tests(sink.clone());
    let s = search(table(), &SearchParams::new().ids("telemetry-b")).unwrap();
    assert_eq!(s.matched().unwrap(), 1);
    let _ = s.matched().unwrap();
    let ok_line = sink
        .read()
        .iter()
        .filter(|l| l.contains("telemetry-b"))
        .cloned()
        .collect::<Vec<_>>();
    assert_eq!(ok_line.len(), 1);
    let v: serde_json::Value = serde_json::from_str(&ok_line[0]).unwrap();
    assert_eq!(v["scanned"], 2);
    assert_eq!(v["matched"], 1);
    assert_eq!(v["ok"], true);
    assert_eq!(v["parameters"]["ids"], serde_json::json!(["telemetry-b"]));

    let s = search(table(), &SearchParams::new().ids("telemetry-a").filter("nope = 1")).unwrap();
    assert!(s.matched().is_err());
    let err_line = sink
        .read()
        .iter()
        .find(|l| l.contains("telemetry-a"))
        .cloned()
        .unwrap();
    let v: serde_json::Value = serde_json::from_str(&err_line).unwrap();
    assert_eq!(v["ok"], false);
    assert!(v["matched"].is_null());

    // zero threshold marks every search slow
    let cfg = SearchConfig { slow_search_ms: 0, ..SearchConfig::default() };
    let s = stac_static::ItemSearch::with_config(
        table(),
        &SearchParams::new().collections("telemetry-slow"),
        cfg,
    )
    .unwrap();
    assert_eq!(s.matched().unwrap(), 0);
    let line = sink.read().iter().find(|l| l.contains("telemetry-slow")).cloned().unwrap();
    let v: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(v["slow"], true);
    telemetry::clear_search_sink();

    let text = telemetry::metrics_text();
    let value = |name: &str| -> u64 {
        text.lines()
            .find_map(|l| l.strip_prefix(name).map(|v| v.trim().parse().unwrap()))
            .unwrap()
    };
    assert!(value("stac_static_searches_total ") >= 2);
    assert!(value("stac_static_search_errors_total ") >= 1);
    assert!(value("stac_static_records_matched_total ") >= 1);
    assert!(value("stac_static_searches_slow_total ") >= 1);
}
