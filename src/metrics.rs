//! Parser run metrics
//!
//! Counters go through the `metrics` facade and are no-ops until
//! [`init_metrics`] installs the Prometheus recorder. Short-lived runs render
//! the registry to a file at exit instead of serving it.

use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

use crate::error::Result;
use crate::types::Measurement;

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

pub const RECORDS_PROCESSED: &str = "rt_parser_records_processed_total";
pub const RECORDS_FAILED: &str = "rt_parser_records_failed_total";
pub const RECORDS_EMPTY: &str = "rt_parser_records_empty_total";
pub const POINTS_EMITTED: &str = "rt_parser_points_emitted_total";
pub const POINTS_WRITTEN: &str = "rt_parser_points_written_total";
pub const LOOKUP_CACHE_HITS: &str = "rt_parser_lookup_cache_hits_total";
pub const LOOKUP_CACHE_MISSES: &str = "rt_parser_lookup_cache_misses_total";
pub const RUN_DURATION: &str = "rt_parser_run_duration_seconds";

/// Installs the Prometheus recorder. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| {
        match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("METRICS: handle already set");
                }
                ParserMetrics::register_metrics();
                info!("Prometheus recorder installed");
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

/// Prometheus text exposition of everything recorded so far
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// Writes the rendered registry to `path`, for node-exporter textfile pickup
pub fn write_to_file(path: &Path) -> Result<()> {
    let text = render().unwrap_or_default();
    std::fs::write(path, text)?;
    info!("Wrote metrics to {}", path.display());
    Ok(())
}

pub struct ParserMetrics;

impl ParserMetrics {
    pub fn record_processed(record_type: &'static str, points: usize) {
        ::metrics::counter!(RECORDS_PROCESSED, "type" => record_type).increment(1);
        if points == 0 {
            ::metrics::counter!(RECORDS_EMPTY, "type" => record_type).increment(1);
        }
    }

    pub fn record_failed(record_type: &'static str) {
        ::metrics::counter!(RECORDS_FAILED, "type" => record_type).increment(1);
    }

    pub fn record_point(measurement: Measurement) {
        ::metrics::counter!(POINTS_EMITTED, "measurement" => measurement.as_str()).increment(1);
    }

    pub fn record_written(points: usize) {
        ::metrics::counter!(POINTS_WRITTEN).increment(points as u64);
    }

    pub fn record_cache_hit() {
        ::metrics::counter!(LOOKUP_CACHE_HITS).increment(1);
    }

    pub fn record_cache_miss() {
        ::metrics::counter!(LOOKUP_CACHE_MISSES).increment(1);
    }

    pub fn record_run_duration(duration_secs: f64) {
        ::metrics::histogram!(RUN_DURATION).record(duration_secs);
    }

    fn register_metrics() {
        use ::metrics::{counter, histogram};

        // Pre-register so an idle run still exposes zeroed series
        let _ = counter!(POINTS_WRITTEN);
        let _ = counter!(LOOKUP_CACHE_HITS);
        let _ = counter!(LOOKUP_CACHE_MISSES);
        let _ = histogram!(RUN_DURATION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        ParserMetrics::record_processed("api", 0);
        ParserMetrics::record_failed("api");
        ParserMetrics::record_point(Measurement::ApiCalls);
        ParserMetrics::record_cache_hit();
    }

    #[test]
    fn test_metric_names_are_prefixed() {
        for name in [
            RECORDS_PROCESSED,
            RECORDS_FAILED,
            RECORDS_EMPTY,
            POINTS_EMITTED,
            POINTS_WRITTEN,
            LOOKUP_CACHE_HITS,
            LOOKUP_CACHE_MISSES,
            RUN_DURATION,
        ] {
            assert!(name.starts_with("rt_parser_"));
        }
    }
}
