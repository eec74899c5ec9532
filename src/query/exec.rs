use crate::config::SearchConfig;
use crate::errors::Result;
use crate::geometry;
use crate::table::ItemTable;
use std::collections::HashSet;

use super::eval::{Evaluator, check_attributes};
use super::functions::FunctionRegistry;
use super::parse::parse_filter;
use super::telemetry;
use super::types::Parameters;

/// Runs every active filter as a narrowing pass over row indices, in fixed order:
/// ids, collections, bbox, intersects, filter, datetime.
fn narrow(
    table: &ItemTable,
    params: &Parameters,
    functions: &FunctionRegistry,
    cfg: &SearchConfig,
) -> Result<Vec<usize>> {
    let records = table.records();
    let mut rows: Vec<usize> = (0..records.len()).collect();

    if let Some(ids) = &params.ids {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        rows.retain(|&i| wanted.contains(records[i].id.as_str()));
        log::debug!("ids pass: {} rows remain", rows.len());
    }

    if let Some(collections) = &params.collections {
        let wanted: HashSet<&str> = collections.iter().map(String::as_str).collect();
        rows.retain(|&i| records[i].collection.as_deref().is_some_and(|c| wanted.contains(c)));
        log::debug!("collections pass: {} rows remain", rows.len());
    }

    if let Some(bbox) = &params.bbox {
        let rect = geometry::bbox_geometry(bbox)?;
        rows.retain(|&i| records[i].geometry.as_ref().is_some_and(|g| geometry::intersects(g, &rect)));
        log::debug!("bbox pass: {} rows remain", rows.len());
    }

    if let Some(intersects) = &params.intersects {
        let shape = geometry::from_geojson(intersects)?;
        rows.retain(|&i| {
            records[i].geometry.as_ref().is_some_and(|g| geometry::intersects(g, &shape))
        });
        log::debug!("intersects pass: {} rows remain", rows.len());
    }

    if let Some(filter) = &params.filter {
        let expr = parse_filter(filter, params.filter_lang.as_deref())?;
        check_attributes(&expr, table, cfg.strict_attributes)?;
        let evaluator = Evaluator::new(functions);
        let mut kept = Vec::with_capacity(rows.len());
        for i in rows {
            if evaluator.matches(&expr, &records[i])? {
                kept.push(i);
            }
        }
        rows = kept;
        log::debug!("filter pass: {} rows remain", rows.len());
    }

    if let Some((start, end)) = &params.datetime {
        rows.retain(|&i| {
            let dt = records[i].datetime;
            start.is_none_or(|s| dt >= s) && end.is_none_or(|e| dt <= e)
        });
        log::debug!("datetime pass: {} rows remain", rows.len());
    }

    Ok(rows)
}

/// Evaluates the parameters against the table and returns the matching subset.
///
/// # Errors
/// Returns the first error raised by any pass; no partial result is produced.
pub fn execute(
    table: &ItemTable,
    params: &Parameters,
    functions: &FunctionRegistry,
    cfg: &SearchConfig,
) -> Result<ItemTable> {
    let bench_start = std::time::Instant::now();
    let outcome = narrow(table, params, functions, cfg);
    let duration_ms = bench_start.elapsed().as_millis();
    let result_count = outcome.as_ref().ok().map(Vec::len);
    // Emit a developer-benchmark log line for deterministic capture in tests
    crate::dev6!(
        "{{\"bench\":\"search\",\"op\":\"evaluate\",\"duration_ms\":{},\"scanned\":{},\"result_count\":{},\"ok\":{}}}",
        crate::utils::num::u128_to_u64_saturating(duration_ms),
        crate::utils::num::usize_to_u64(table.len()),
        crate::utils::num::usize_to_u64(result_count.unwrap_or(0)),
        outcome.is_ok()
    );
    telemetry::log_search(&telemetry::SearchRecord {
        parameters: &params.to_map(),
        duration_ms,
        scanned: table.len(),
        matched: result_count,
        slow_threshold_ms: cfg.slow_search_ms,
    });
    if let Err(e) = &outcome {
        log::debug!("search evaluation failed: {e}");
    }
    Ok(table.select(&outcome?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchError;
    use crate::item::Item;
    use crate::query::types::SearchParams;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn table() -> ItemTable {
        let square = |x: f64| {
            json!({"type": "Polygon", "coordinates": [[[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]]]})
        };
        ItemTable::from_items(vec![
            Item::new("a", square(0.0), Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap())
                .with_collection("c1"),
            Item::new("b", square(10.0), Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
                .with_collection("c1"),
            Item::new("c", square(20.0), Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap())
                .with_collection("c2"),
            Item::new("d", serde_json::Value::Null, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()),
        ])
        .unwrap()
    }

    fn run(p: SearchParams) -> Result<Vec<String>> {
        let params = Parameters::from_params(&p)?;
        let out = execute(&table(), &params, &FunctionRegistry::default(), &SearchConfig::default())?;
        Ok(out.ids().into_iter().map(str::to_string).collect())
    }

    #[test]
    fn passes_narrow_in_order() {
        assert_eq!(run(SearchParams::new().ids("b,c,d").collections("c1")).unwrap(), vec!["b"]);
        assert_eq!(run(SearchParams::new().bbox([9.5, 0.0, 20.5, 1.0])).unwrap(), vec!["b", "c"]);
        assert_eq!(run(SearchParams::new().datetime("2020/..")).unwrap(), vec!["b", "c", "d"]);
        assert_eq!(run(SearchParams::new().filter("id <> 'a'").datetime("../2020")).unwrap(), vec!["b"]);
    }

    #[test]
    fn null_geometry_never_matches_spatially() {
        let ids = run(SearchParams::new().bbox([-180.0, -90.0, 180.0, 90.0])).unwrap();
        assert!(!ids.contains(&"d".to_string()));
    }

    #[test]
    fn bad_bbox_count_is_geometry_error() {
        assert!(matches!(run(SearchParams::new().bbox([1.0, 2.0, 3.0])), Err(SearchError::Geometry(_))));
    }

    #[test]
    fn unknown_language_fails_even_after_empty_narrowing() {
        let err = run(SearchParams::new().ids("zzz").filter("id = 'a'").filter_lang("sql")).unwrap_err();
        assert!(matches!(err, SearchError::UnsupportedFilterLanguage(_)));
    }

    #[test]
    fn emits_one_bench_line() {
        let cap = crate::utils::devlog::capture();
        run(SearchParams::new().collections("c2")).unwrap();
        let lines = cap.bench_lines("evaluate");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["result_count"], 1);
        assert_eq!(lines[0]["ok"], true);
    }
}
