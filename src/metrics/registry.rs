//! Catalog of every metric the three pipeline phases publish.
//!
//! Registration happens once at startup. The catalog also checks each name against the
//! `mtl_<phase>_...` convention, so a misnamed or duplicated metric is reported in the log
//! before any run writes a snapshot.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::{ConverterMetrics, EnricherMetrics, MetricDoc, MetricType, ParserMetrics, PhaseMetrics};

/// A metric name that breaks the naming convention or is declared twice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProblem {
    pub phase: &'static str,
    pub name: &'static str,
    pub reason: String,
}

/// Metric documentation keyed by name, with the phase that owns each entry
#[derive(Debug, Default)]
pub struct MetricCatalog {
    entries: BTreeMap<&'static str, (&'static str, MetricDoc)>,
    problems: Vec<CatalogProblem>,
}

impl MetricCatalog {
    /// Add one phase's metrics; registration with the recorder is left to the caller.
    pub fn add_phase<T: PhaseMetrics>(&mut self) {
        let phase = T::phase_name();
        let docs = T::metrics_documentation();
        debug!("Cataloguing {} {} metrics", docs.len(), phase);

        for doc in docs {
            if let Some(reason) = naming_problem(phase, &doc) {
                self.problems.push(CatalogProblem {
                    phase,
                    name: doc.name,
                    reason,
                });
            }
            if let Some((owner, _)) = self.entries.get(doc.name) {
                self.problems.push(CatalogProblem {
                    phase,
                    name: doc.name,
                    reason: format!("already declared by the {owner} phase"),
                });
                continue;
            }
            self.entries.insert(doc.name, (phase, doc));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn problems(&self) -> &[CatalogProblem] {
        &self.problems
    }

    /// Metric names owned by `phase`, sorted
    pub fn names_for(&self, phase: &str) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(_, (owner, _))| *owner == phase)
            .map(|(name, _)| *name)
            .collect()
    }
}

fn naming_problem(phase: &str, doc: &MetricDoc) -> Option<String> {
    let prefix = format!("mtl_{phase}_");
    if !doc.name.starts_with(&prefix) {
        return Some(format!("expected the prefix {prefix}"));
    }
    let is_total = doc.name.ends_with("_total");
    match doc.metric_type {
        MetricType::Counter if !is_total => Some("counter without a _total suffix".to_string()),
        MetricType::Histogram | MetricType::Gauge if is_total => {
            Some("only counters end in _total".to_string())
        }
        _ => None,
    }
}

/// Register the parser, enricher and converter metrics and return their catalog.
pub fn register_all_metrics() -> MetricCatalog {
    ParserMetrics::register_metrics();
    EnricherMetrics::register_metrics();
    ConverterMetrics::register_metrics();

    let mut catalog = MetricCatalog::default();
    catalog.add_phase::<ParserMetrics>();
    catalog.add_phase::<EnricherMetrics>();
    catalog.add_phase::<ConverterMetrics>();

    for problem in catalog.problems() {
        warn!(
            "Metric {} ({} phase): {}",
            problem.name, problem.phase, problem.reason
        );
    }
    info!("Registered {} metrics", catalog.len());
    catalog
}
