//! Converter Phase Metrics
//!
//! Classification and MTL assembly.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

/// Metrics collection for the Converter phase
pub struct ConverterMetrics;

impl ConverterMetrics {
    pub fn record_conversion(
        rows: usize,
        unclassified: usize,
        alarms_remapped: usize,
        collisions: usize,
        duration_secs: f64,
    ) {
        ::metrics::counter!(phase_metric!(counter, "converter", "rows_built"))
            .increment(rows as u64);
        ::metrics::counter!(phase_metric!(counter, "converter", "unclassified"))
            .increment(unclassified as u64);
        ::metrics::counter!(phase_metric!(counter, "converter", "alarms_remapped"))
            .increment(alarms_remapped as u64);
        ::metrics::counter!(phase_metric!(counter, "converter", "target_id_collisions"))
            .increment(collisions as u64);
        ::metrics::histogram!(phase_metric!(histogram, "converter", "duration_seconds"))
            .record(duration_secs);
    }
}

impl PhaseMetrics for ConverterMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "converter", "rows_built"));
        let _ = counter!(phase_metric!(counter, "converter", "unclassified"));
        let _ = counter!(phase_metric!(counter, "converter", "alarms_remapped"));
        let _ = counter!(phase_metric!(counter, "converter", "target_id_collisions"));
        let _ = histogram!(phase_metric!(histogram, "converter", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "converter"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "converter", "rows_built"),
                metric_type: MetricType::Counter,
                help: "Master Tag List rows produced",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "converter", "unclassified"),
                metric_type: MetricType::Counter,
                help: "Rows no classification rule matched",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "converter", "alarms_remapped"),
                metric_type: MetricType::Counter,
                help: "Alarm tags folded into their primary measurement tag",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "converter", "target_id_collisions"),
                metric_type: MetricType::Counter,
                help: "Rows renamed because their target id was already taken",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "converter", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent classifying and building the tag list",
                labels: vec![],
            },
        ]
    }
}
