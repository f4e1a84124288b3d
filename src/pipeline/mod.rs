// MTL pipeline: extract -> enrich/merge -> classify and build

pub mod processing;
pub mod report;

use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{EnrichedRecord, IoRecord, Note, NoteKind};
use crate::error::Result;
use crate::io::persist::{read_json, write_json, StageArtifact};
use crate::io::{PipelineInputs, SourceDocument};
use crate::metrics::EnricherMetrics;
use processing::enrich::{screen_enricher_for, CsvEnricher, Enricher, L5kEnricher};
use processing::merge::{filter_unused, merge};
use processing::parser::{parser_for, ProjectInput};
use processing::{MtlBuilder, MtlOutcome, ParseOutcome};

pub use report::PipelineReport;

/// Merged records plus what the enrichers reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichStage {
    pub records: Vec<EnrichedRecord>,
    pub notes: Vec<Note>,
    pub fragments: usize,
    pub unmatched: usize,
    /// Records removed by the unused-I/O filter
    pub filtered: usize,
}

/// Every stage's output from one in-memory run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub extracted: ParseOutcome,
    pub enriched: EnrichStage,
    pub mtl: MtlOutcome,
    pub report: PipelineReport,
}

pub struct Pipeline {
    config: Config,
    run_id: Uuid,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Step 1: parse the project container into I/O records.
    ///
    /// Fails only when the container cannot be parsed at all.
    #[instrument(skip(self, inputs), fields(hmi_type = %self.config.hmi_type))]
    pub fn extract(&self, inputs: &PipelineInputs) -> Result<ParseOutcome> {
        info!("🔍 Extracting I/O records");
        let parser = parser_for(&self.config);
        let outcome = parser.parse(&ProjectInput::from(inputs))?;
        info!(
            "✅ Extracted {} records ({} skipped, {} duplicates)",
            outcome.records.len(),
            outcome.skipped,
            outcome.duplicates
        );
        Ok(outcome)
    }

    /// Step 2: run every applicable enricher, merge, and optionally drop unused I/O.
    #[instrument(skip(self, records, inputs), fields(records = records.len()))]
    pub fn enrich(&self, records: Vec<IoRecord>, inputs: &PipelineInputs) -> EnrichStage {
        let start_time = Instant::now();
        let mut stage = EnrichStage::default();
        let mut fragments = Vec::new();

        let mut sources: Vec<(Box<dyn Enricher>, Option<&SourceDocument>)> =
            vec![(screen_enricher_for(&self.config), inputs.project.as_ref())];
        if self.config.processing.enable_csv {
            sources.push((Box::new(CsvEnricher::new()), inputs.csv.as_ref()));
        }
        if self.config.processing.enable_l5k {
            sources.push((Box::new(L5kEnricher::new()), inputs.l5k.as_ref()));
        }

        for (enricher, source) in sources {
            let tag = enricher.source_tag();
            let Some(source) = source else {
                if tag.is_screen() {
                    stage.notes.push(Note::warning(
                        NoteKind::MissingSource,
                        None,
                        format!("no project container for the {tag} enricher"),
                    ));
                }
                continue;
            };
            let outcome = enricher.enrich(&records, source);
            EnricherMetrics::record_source(tag.label(), outcome.fragments.len(), outcome.unmatched);
            info!(
                "🧩 {}: {} fragments from {}",
                tag,
                outcome.fragments.len(),
                source.name()
            );
            stage.fragments += outcome.fragments.len();
            stage.unmatched += outcome.unmatched;
            stage.notes.extend(outcome.notes);
            fragments.extend(outcome.fragments);
        }

        let mut merged = merge(records, &fragments);
        let with_description = merged
            .iter()
            .filter(|r| !r.description.trim().is_empty())
            .count();
        EnricherMetrics::record_merge(
            merged.len(),
            with_description,
            start_time.elapsed().as_secs_f64(),
        );

        if self.config.processing.filter_unused_ios {
            let before = merged.len();
            let (kept, notes) = filter_unused(merged);
            stage.filtered = before - kept.len();
            stage.notes.extend(notes);
            EnricherMetrics::record_filtered(stage.filtered);
            merged = kept;
        }

        info!(
            "✅ Enriched {} records, {} with a description",
            merged.len(),
            with_description
        );
        stage.records = merged;
        stage
    }

    /// Step 3: classify and build the Master Tag List.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn convert(&self, records: &[EnrichedRecord]) -> MtlOutcome {
        info!("🏷️  Building the Master Tag List");
        MtlBuilder::from_config(&self.config).build(records)
    }

    /// All three steps over already loaded inputs, nothing written to disk.
    pub fn run_with(&self, inputs: &PipelineInputs) -> Result<PipelineRun> {
        let start_time = Instant::now();
        let extracted = self.extract(inputs)?;
        let enriched = self.enrich(extracted.records.clone(), inputs);
        let mtl = self.convert(&enriched.records);

        let mut report = PipelineReport::new(self.run_id, self.config.hmi_type);
        report.extract = report::ExtractSummary::from_outcome(&extracted);
        report.enrich = report::EnrichSummary::from_stage(&enriched);
        report.convert = report::ConvertSummary::from_outcome(&mtl);
        report.count_notes(
            extracted
                .notes
                .iter()
                .chain(&enriched.notes)
                .chain(&mtl.notes),
        );
        report.duration_secs = start_time.elapsed().as_secs_f64();

        Ok(PipelineRun {
            extracted,
            enriched,
            mtl,
            report,
        })
    }

    /// Load inputs from the configuration, run every step and persist all artifacts.
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub fn run(&self) -> Result<PipelineRun> {
        let inputs = PipelineInputs::load(&self.config)?;
        let run = self.run_with(&inputs)?;
        let fingerprint = inputs.fingerprint();

        self.write_stage(
            &self.config.extracted_path(),
            "extracted",
            &run.extracted.records,
            &run.extracted.notes,
            fingerprint.clone(),
        )?;
        self.write_stage(
            &self.config.enriched_path(),
            "enriched",
            &run.enriched.records,
            &run.enriched.notes,
            fingerprint.clone(),
        )?;
        self.write_stage(
            &self.config.mtl_path(),
            "mtl",
            &run.mtl.rows,
            &run.mtl.notes,
            fingerprint,
        )?;
        write_json(&self.config.report_path(), &run.report)?;
        info!("💾 Artifacts written to {}", self.config.output.dir.display());
        Ok(run)
    }

    /// Step 1 on its own, persisting the extracted table.
    pub fn run_extract(&self, inputs: &PipelineInputs) -> Result<ParseOutcome> {
        let outcome = self.extract(inputs)?;
        self.write_stage(
            &self.config.extracted_path(),
            "extracted",
            &outcome.records,
            &outcome.notes,
            inputs.fingerprint(),
        )?;
        Ok(outcome)
    }

    /// Step 2 on its own, starting from the persisted extracted table.
    pub fn run_enrich(&self, inputs: &PipelineInputs) -> Result<EnrichStage> {
        let extracted: StageArtifact<IoRecord> = read_json(&self.config.extracted_path())?;
        self.check_run_format(&extracted);
        let stage = self.enrich(extracted.records, inputs);
        self.write_stage(
            &self.config.enriched_path(),
            "enriched",
            &stage.records,
            &stage.notes,
            extracted.source_fingerprint,
        )?;
        Ok(stage)
    }

    /// Step 3 on its own, starting from the persisted enriched table.
    pub fn run_convert(&self) -> Result<MtlOutcome> {
        let enriched: StageArtifact<EnrichedRecord> = read_json(&self.config.enriched_path())?;
        self.check_run_format(&enriched);
        let outcome = self.convert(&enriched.records);
        self.write_stage(
            &self.config.mtl_path(),
            "mtl",
            &outcome.rows,
            &outcome.notes,
            enriched.source_fingerprint,
        )?;
        Ok(outcome)
    }

    fn check_run_format<T>(&self, artifact: &StageArtifact<T>) {
        if artifact.hmi_type != self.config.hmi_type {
            warn!(
                "Artifact {} was produced for {}, configured HMI type is {}",
                artifact.stage, artifact.hmi_type, self.config.hmi_type
            );
        }
    }

    fn write_stage<T: Serialize + Clone>(
        &self,
        path: &Path,
        stage: &str,
        records: &[T],
        notes: &[Note],
        fingerprint: Option<String>,
    ) -> Result<()> {
        let artifact = StageArtifact::new(
            self.run_id,
            self.config.hmi_type,
            stage,
            records.to_vec(),
            notes.to_vec(),
        )
        .with_fingerprint(fingerprint);
        write_json(path, &artifact)?;
        info!("💾 Saved {} {} records to {}", records.len(), stage, path.display());
        Ok(())
    }
}
