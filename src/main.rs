use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use mtl_converter::config::Config;
use mtl_converter::constants;
use mtl_converter::domain::{Note, NoteSeverity};
use mtl_converter::io::PipelineInputs;
use mtl_converter::logging;
use mtl_converter::metrics;
use mtl_converter::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "mtl_converter")]
#[command(about = "Builds a Master Tag List from an HMI project export")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = constants::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the configured HMI type (CPA or NEOPROJ)
    #[arg(long, global = true)]
    hmi_type: Option<String>,

    /// Override the configured input directory
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,

    /// Override the configured output directory
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the project container into the extracted I/O table
    Extract,
    /// Enrich the extracted table with screens, CSV and L5K descriptions
    Enrich,
    /// Classify the enriched table and write the Master Tag List
    Convert,
    /// Run extract, enrich and convert in one go
    Run,
    /// Print the effective configuration as TOML
    ShowConfig,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(hmi_type) = &cli.hmi_type {
        config.hmi_type = hmi_type.parse()?;
    }
    if let Some(dir) = &cli.input_dir {
        config.input.dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    Ok(config)
}

fn print_notes(notes: &[Note]) {
    let warnings: Vec<&Note> = notes
        .iter()
        .filter(|n| n.severity == NoteSeverity::Warning)
        .collect();
    if warnings.is_empty() {
        return;
    }
    println!("\n⚠️  {} warnings:", warnings.len());
    for note in warnings.iter().take(20) {
        println!("   - {}", note);
    }
    if warnings.len() > 20 {
        println!("   ... {} more in the stage artifact", warnings.len() - 20);
    }
}

fn execute(cli: &Cli, config: Config) -> anyhow::Result<bool> {
    let pipeline = Pipeline::new(config);
    let config = pipeline.config();

    match cli.command {
        Commands::ShowConfig => Ok(true),
        Commands::Extract => {
            println!("🔍 Extracting I/O records ({})...", config.hmi_type);
            let inputs = PipelineInputs::load(config)?;
            let outcome = pipeline.run_extract(&inputs)?;
            println!("\n📊 Extracted {} records", outcome.records.len());
            println!("   Skipped: {}", outcome.skipped);
            println!("   Duplicates: {}", outcome.duplicates);
            println!("   Missing texts: {}", outcome.missing_text);
            println!("   Output file: {}", config.extracted_path().display());
            print_notes(&outcome.notes);
            Ok(!outcome.records.is_empty())
        }
        Commands::Enrich => {
            println!("🧩 Enriching extracted records...");
            let inputs = PipelineInputs::load(config)?;
            let stage = pipeline.run_enrich(&inputs)?;
            println!("\n📊 Enriched {} records", stage.records.len());
            println!("   Fragments: {}", stage.fragments);
            println!("   Unmatched fragments: {}", stage.unmatched);
            println!("   Filtered unused I/O: {}", stage.filtered);
            println!("   Output file: {}", config.enriched_path().display());
            print_notes(&stage.notes);
            Ok(true)
        }
        Commands::Convert => {
            println!("🏷️  Building the Master Tag List...");
            let outcome = pipeline.run_convert()?;
            println!("\n📊 MTL rows: {}", outcome.rows.len());
            println!("   Unclassified: {}", outcome.unclassified);
            println!("   Alarms remapped: {}", outcome.alarms_remapped);
            println!("   Renamed collisions: {}", outcome.collisions);
            for (label, count) in &outcome.category_counts {
                println!("      {label}: {count}");
            }
            println!("   Output file: {}", config.mtl_path().display());
            print_notes(&outcome.notes);
            Ok(true)
        }
        Commands::Run => {
            println!("🔄 Running the full MTL pipeline ({})...", config.hmi_type);
            let run = pipeline.run()?;
            println!();
            for line in run.report.summary_lines() {
                println!("{line}");
            }
            println!("   Output file: {}", config.mtl_path().display());
            println!("   Report: {}", config.report_path().display());
            Ok(run.report.extract.records > 0)
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Commands::ShowConfig = cli.command {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    logging::init_logging(&config.output.log_dir);
    metrics::init_metrics();
    let metrics_path = config.metrics_path();

    let result = execute(&cli, config);

    if let Err(e) = metrics::write_snapshot(&metrics_path) {
        warn!("Could not write metrics snapshot: {}", e);
    }

    match result {
        Ok(true) => {
            info!("Run finished");
            println!("\n✅ Done");
            Ok(ExitCode::SUCCESS)
        }
        Ok(false) => {
            warn!("No I/O records were extracted");
            println!("\n❌ No I/O records were extracted from the project");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            error!("Pipeline failed: {:#}", e);
            println!("\n❌ Pipeline failed: {:#}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
