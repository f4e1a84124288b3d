//! Parser Phase Metrics
//!
//! Metrics for the extraction step: records produced per project, duplicate and
//! skipped records, unresolved text references and fatal container failures.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

/// Metrics collection for the Parser phase
pub struct ParserMetrics;

impl ParserMetrics {
    /// Record a successful parse of one project container
    pub fn record_parse_success(_hmi_type: &str, records_extracted: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "parser", "projects_parsed")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "parser", "records_extracted"))
            .increment(records_extracted as u64);
        ::metrics::histogram!(phase_metric!(histogram, "parser", "duration_seconds"))
            .record(duration_secs);
    }

    /// Record a container that could not be parsed at all
    pub fn record_parse_error(_hmi_type: &str) {
        ::metrics::counter!(phase_metric!(counter, "parser", "errors")).increment(1);
    }

    pub fn record_duplicates(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "parser", "duplicate_addresses"))
            .increment(count as u64);
    }

    pub fn record_skipped(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "parser", "records_skipped"))
            .increment(count as u64);
    }

    pub fn record_missing_text(count: usize) {
        ::metrics::counter!(phase_metric!(counter, "parser", "missing_text_refs"))
            .increment(count as u64);
    }
}

impl PhaseMetrics for ParserMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "parser", "projects_parsed"));
        let _ = counter!(phase_metric!(counter, "parser", "records_extracted"));
        let _ = counter!(phase_metric!(counter, "parser", "errors"));
        let _ = counter!(phase_metric!(counter, "parser", "duplicate_addresses"));
        let _ = counter!(phase_metric!(counter, "parser", "records_skipped"));
        let _ = counter!(phase_metric!(counter, "parser", "missing_text_refs"));
        let _ = histogram!(phase_metric!(histogram, "parser", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "parser"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "parser", "projects_parsed"),
                metric_type: MetricType::Counter,
                help: "Total number of project containers parsed",
                labels: vec!["hmi_type"],
            },
            MetricDoc {
                name: phase_metric!(counter, "parser", "records_extracted"),
                metric_type: MetricType::Counter,
                help: "Total number of I/O records extracted",
                labels: vec!["hmi_type"],
            },
            MetricDoc {
                name: phase_metric!(counter, "parser", "errors"),
                metric_type: MetricType::Counter,
                help: "Project containers that could not be opened",
                labels: vec!["hmi_type"],
            },
            MetricDoc {
                name: phase_metric!(counter, "parser", "duplicate_addresses"),
                metric_type: MetricType::Counter,
                help: "Records dropped because their normalized address was already seen",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "parser", "records_skipped"),
                metric_type: MetricType::Counter,
                help: "Malformed sub-sections skipped while parsing",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(counter, "parser", "missing_text_refs"),
                metric_type: MetricType::Counter,
                help: "Text references with no entry in the project text library",
                labels: vec![],
            },
            MetricDoc {
                name: phase_metric!(histogram, "parser", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Time spent parsing one project container",
                labels: vec!["hmi_type"],
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_metrics_documentation() {
        let docs = ParserMetrics::metrics_documentation();
        assert!(!docs.is_empty());
        assert_eq!(ParserMetrics::phase_name(), "parser");

        for doc in docs {
            assert!(doc.name.starts_with("mtl_parser_"));
            assert!(!doc.help.is_empty());
        }
    }
}
