use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Metrics {
    pub searches_total: AtomicU64,
    pub searches_slow_total: AtomicU64,
    pub search_errors_total: AtomicU64,
    pub records_scanned_total: AtomicU64,
    pub records_matched_total: AtomicU64,
}

#[derive(Default)]
pub struct Telemetry {
    pub metrics: Metrics,
    // For tests we can capture search lines in-memory
    search_sink: RwLock<Option<Arc<RwLock<Vec<String>>>>>,
}

pub(crate) static TELEMETRY: std::sync::LazyLock<Telemetry> =
    std::sync::LazyLock::new(Telemetry::default);

pub fn set_search_sink_for_tests(sink: Arc<RwLock<Vec<String>>>) {
    *TELEMETRY.search_sink.write() = Some(sink);
}

pub fn clear_search_sink() {
    *TELEMETRY.search_sink.write() = None;
}

/// Outcome of one evaluation, as recorded on the metrics target.
#[derive(Debug, Clone)]
pub struct SearchRecord<'a> {
    pub parameters: &'a serde_json::Map<String, serde_json::Value>,
    pub duration_ms: u128,
    pub scanned: usize,
    pub matched: Option<usize>,
    pub slow_threshold_ms: u64,
}

pub fn log_search(rec: &SearchRecord<'_>) {
    let m = &TELEMETRY.metrics;
    m.searches_total.fetch_add(1, Ordering::Relaxed);
    m.records_scanned_total
        .fetch_add(crate::utils::num::usize_to_u64(rec.scanned), Ordering::Relaxed);
    match rec.matched {
        Some(n) => {
            m.records_matched_total.fetch_add(crate::utils::num::usize_to_u64(n), Ordering::Relaxed);
        }
        None => {
            m.search_errors_total.fetch_add(1, Ordering::Relaxed);
        }
    }
    let duration_ms = crate::utils::num::u128_to_u64_saturating(rec.duration_ms);
    let slow = duration_ms >= rec.slow_threshold_ms;
    if slow {
        m.searches_slow_total.fetch_add(1, Ordering::Relaxed);
        log::warn!(
            "slow search: {duration_ms} ms over {} records (threshold {} ms)",
            rec.scanned,
            rec.slow_threshold_ms
        );
    }
    let line = serde_json::json!({
        "parameters": rec.parameters,
        "duration_ms": duration_ms,
        "scanned": rec.scanned,
        "matched": rec.matched,
        "ok": rec.matched.is_some(),
        "slow": slow,
    })
    .to_string();
    log::info!(target: "stac_static::metrics", "{line}");
    let sink = TELEMETRY.search_sink.read().clone();
    if let Some(sink) = sink {
        sink.write().push(line);
    }
}

#[must_use]
pub fn metrics_text() -> String {
    // OpenMetrics/Prometheus exposition format (no types/HELP for brevity)
    let m = &TELEMETRY.metrics;
    format!(
        "stac_static_searches_total {}\n\
         stac_static_searches_slow_total {}\n\
         stac_static_search_errors_total {}\n\
         stac_static_records_scanned_total {}\n\
         stac_static_records_matched_total {}\n",
        m.searches_total.load(Ordering::Relaxed),
        m.searches_slow_total.load(Ordering::Relaxed),
        m.search_errors_total.load(Ordering::Relaxed),
        m.records_scanned_total.load(Ordering::Relaxed),
        m.records_matched_total.load(Ordering::Relaxed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_and_text() {
        let params = serde_json::Map::new();
        let before = TELEMETRY.metrics.searches_total.load(Ordering::Relaxed);
        log_search(&SearchRecord {
            parameters: &params,
            duration_ms: 1,
            scanned: 3,
            matched: Some(1),
            slow_threshold_ms: u64::MAX,
        });
        assert!(TELEMETRY.metrics.searches_total.load(Ordering::Relaxed) > before);
        let text = metrics_text();
        assert!(text.contains("stac_static_searches_total"));
        assert!(text.contains("stac_static_search_errors_total"));
    }
}
