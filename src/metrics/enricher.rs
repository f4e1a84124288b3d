//! Enricher Phase Metrics
//!
//! Fragments produced per enrichment source, fragments that matched no record, and
//! the merge that folds them into the record set.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

/// Metrics collection for the Enricher phase
pub struct EnricherMetrics;

impl EnricherMetrics {
    /// Record the output of one enricher
    pub fn record_source(source: &str, fragments: usize, unmatched: usize) {
        ::metrics::counter!(
            phase_metric!(counter, "enricher", "fragments_produced"),
            "source" => source.to_string()
        )
        .increment(fragments as u64);
        ::metrics::counter!(
            phase_metric!(counter, "enricher", "fragments_unmatched"),
            "source" => source.to_string()
        )
        .increment(unmatched as u64);
    }

    /// Record the merge step
    pub fn record_merge(records: usize, with_description: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "enricher", "records_merged"))
            .increment(records as u64);
        ::metrics::counter!(phase_metric!(counter, "enricher", "descriptions_filled"))
            .increment(with_description as u64);
        ::metrics::histogram!(phase_metric!(histogram, "enricher", "duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_filtered(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "enricher", "records_filtered"))
            .increment(count as u64);
    }
}

impl PhaseMetrics for EnricherMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "enricher", "fragments_produced"));
        let _ = counter!(phase_metric!(counter, "enricher", "fragments_unmatched"));
        let _ = counter!(phase_metric!(counter, "enricher", "records_merged"));
        let _ = counter!(phase_metric!(counter, "enricher", "descriptions_filled"));
        let _ = counter!(phase_metric!(counter, "enricher", "records_filtered"));
        let _ = histogram!(phase_metric!(histogram, "enricher", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "enricher"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "enricher", "fragments_produced"),
                metric_type: MetricType::Counter,
                help: "Enrichment fragments produced across all sources",
                labels: vec!["source"],
            },
            MetricDoc {
                name: phase_metric!(counter, "enricher", "fragments_unmatched"),
                metric_type: MetricType::Counter,
                help: "Source entries whose address matched no extracted record",
                labels: vec!["source"],
            },
            MetricDoc {
                name: phase_metric!(counter, "enricher", "records_merged"),
                metric_type: MetricType::Counter,
                help: "Records produced by the merge",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "enricher", "descriptions_filled"),
                metric_type: MetricType::Counter,
                help: "Merged records that ended up with a description",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "enricher", "records_filtered"),
                metric_type: MetricType::Counter,
                help: "Records dropped by the unused-I/O filter",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "enricher", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent enriching and merging",
                labels: vec![],
            },
        ]
    }
}
