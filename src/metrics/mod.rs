//! Centralized metrics for the MTL pipeline
//!
//! Each pipeline phase defines its own metrics in a dedicated submodule, ensuring
//! clear ownership and preventing naming conflicts. The recorder is in-process only:
//! a run renders the snapshot to a file when it finishes.

pub mod converter;
pub mod enricher;
pub mod parser;
pub mod registry;

pub use converter::ConverterMetrics;
pub use enricher::EnricherMetrics;
pub use parser::ParserMetrics;

use std::fs;
use std::path::Path;
use std::sync::{Once, OnceLock};
use tracing::{info, warn};

use crate::error::Result;

static INIT: Once = Once::new();
static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Initialize the global metrics recorder
///
/// Idempotent. Installs a Prometheus recorder without an HTTP listener and registers
/// all phase metrics so naming conflicts show up at startup.
pub fn init_metrics() {
    INIT.call_once(|| {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();

        match builder.install_recorder() {
            Ok(handle) => {
                if HANDLE.set(handle).is_err() {
                    warn!("Metrics handle was already set");
                }
                registry::register_all_metrics();
                info!("Prometheus recorder installed");
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
            }
        }
    });
}

/// Current snapshot in Prometheus text format, `None` before [`init_metrics`].
pub fn render() -> Option<String> {
    HANDLE.get().map(|handle| handle.render())
}

/// Write the current snapshot to `path`. Returns false when no recorder is installed.
pub fn write_snapshot(path: &Path) -> Result<bool> {
    let Some(snapshot) = render() else {
        return Ok(false);
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, snapshot)?;
    info!("Metrics snapshot written to {}", path.display());
    Ok(true)
}

/// Trait for phase-specific metrics collections
///
/// Each pipeline phase implements this trait to provide:
/// - Metric registration at startup
/// - Consistent naming conventions
/// - Documentation of what each metric measures
pub trait PhaseMetrics {
    /// Register all metrics for this phase
    fn register_metrics();

    /// Get the phase name for prefixing metrics
    fn phase_name() -> &'static str;

    /// Get documentation for all metrics in this phase
    fn metrics_documentation() -> Vec<MetricDoc>;
}

/// Documentation for a single metric
#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
    pub labels: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Macro to create phase-specific metric names with consistent naming
///
/// This ensures all metrics follow the naming convention:
/// mtl_{phase}_{metric_name}_{type}
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("mtl_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("mtl_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("mtl_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_naming_convention() {
        assert_eq!(
            phase_metric!(counter, "parser", "records_extracted"),
            "mtl_parser_records_extracted_total"
        );
        assert_eq!(
            phase_metric!(histogram, "converter", "duration_seconds"),
            "mtl_converter_duration_seconds"
        );
        assert_eq!(
            phase_metric!(gauge, "enricher", "fill_ratio"),
            "mtl_enricher_fill_ratio"
        );
    }

    #[test]
    fn test_snapshot_after_init() {
        init_metrics();
        ParserMetrics::record_parse_success("CPA", 3, 0.01);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.prom");
        assert!(write_snapshot(&path).unwrap());
        assert!(path.exists());
    }
}
