//! fluorospot - FluoroSpot response classification CLI
//!
//! Command-line interface for analyzing plate-reader well exports.

use clap::{Args, Parser, Subcommand, ValueEnum};
use fluorospot::config::{suggest_config, validate_config, validate_config_for_data, AssayConfig};
use fluorospot::data::{load_donor_dir, load_donor_file, DonorRecords, WellRecord};
use fluorospot::error::Result;
use fluorospot::pipeline::{Analyzer, RunStatus};
use fluorospot::profile::profile_wells;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Result file written by `run`, without extension.
const RESULTS_STEM: &str = "fluorospot-results";

/// Result table format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum TableFormat {
    /// Tab-separated values
    Tsv,
    /// Comma-separated values
    Csv,
    /// Pretty-printed JSON
    Json,
}

impl TableFormat {
    fn extension(self) -> &'static str {
        match self {
            TableFormat::Tsv => "tsv",
            TableFormat::Csv => "csv",
            TableFormat::Json => "json",
        }
    }
}

/// Profile output format
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileFormat {
    Text,
    Json,
    Yaml,
}

/// Where to read well exports from
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// A single CSV/TSV well export (may hold several donors)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// A directory of CSV/TSV well exports
    #[arg(short, long)]
    donor_dir: Option<PathBuf>,
}

/// Same as [`InputArgs`] but optional
#[derive(Debug, Args)]
#[group(required = false, multiple = false)]
struct OptionalInputArgs {
    /// A single CSV/TSV well export (may hold several donors)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// A directory of CSV/TSV well exports
    #[arg(short, long)]
    donor_dir: Option<PathBuf>,
}

/// FluoroSpot Response Classification
#[derive(Parser)]
#[command(name = "fluorospot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze well exports and write the result table
    Run {
        /// Path to assay configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        #[command(flatten)]
        input: InputArgs,

        /// Directory for the result table
        #[arg(short, long, default_value = ".")]
        results_dir: PathBuf,

        /// Result table format
        #[arg(short, long, value_enum, default_value = "tsv")]
        format: TableFormat,

        /// Analyze donors in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Validate a configuration, optionally against data
    Validate {
        /// Path to assay configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        #[command(flatten)]
        input: OptionalInputArgs,
    },

    /// Profile well exports
    Profile {
        #[command(flatten)]
        input: InputArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: ProfileFormat,
    },

    /// Suggest a configuration from well exports
    Suggest {
        #[command(flatten)]
        input: InputArgs,

        /// Cells plated per well for the suggested configuration
        #[arg(long, default_value = "200000")]
        cells_per_well: u64,

        /// SFC cutoff for the suggested configuration
        #[arg(long, default_value = "20")]
        sfc_cutoff: f64,
    },

    /// Write an example configuration file
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            input,
            results_dir,
            format,
            parallel,
        } => cmd_run(&config, &input, &results_dir, format, parallel),

        Commands::Validate { config, input } => cmd_validate(&config, &input),

        Commands::Profile { input, format } => cmd_profile(&input, format),

        Commands::Suggest {
            input,
            cells_per_well,
            sfc_cutoff,
        } => cmd_suggest(&input, cells_per_well, sfc_cutoff),

        Commands::Example { output } => cmd_example(&output),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn load_donors(input: Option<&Path>, donor_dir: Option<&Path>) -> Result<Vec<DonorRecords>> {
    match (input, donor_dir) {
        (Some(file), _) => {
            eprintln!("Loading well export {:?}...", file);
            load_donor_file(file)
        }
        (None, Some(dir)) => {
            eprintln!("Loading well exports from {:?}...", dir);
            load_donor_dir(dir)
        }
        (None, None) => Ok(Vec::new()),
    }
}

impl InputArgs {
    fn load(&self) -> Result<Vec<DonorRecords>> {
        load_donors(self.input.as_deref(), self.donor_dir.as_deref())
    }
}

impl OptionalInputArgs {
    fn load(&self) -> Result<Option<Vec<DonorRecords>>> {
        if self.input.is_none() && self.donor_dir.is_none() {
            return Ok(None);
        }
        load_donors(self.input.as_deref(), self.donor_dir.as_deref()).map(Some)
    }
}

fn all_records(donors: &[DonorRecords]) -> Vec<WellRecord> {
    donors
        .iter()
        .flat_map(|(_, records)| records.iter().cloned())
        .collect()
}

/// Analyze exports and write the result table
fn cmd_run(
    config_path: &Path,
    input: &InputArgs,
    results_dir: &Path,
    format: TableFormat,
    parallel: bool,
) -> Result<bool> {
    eprintln!("Loading assay configuration from {:?}...", config_path);
    let config = AssayConfig::from_path(config_path)?;
    let analyzer = Analyzer::new(&config)?;

    let donors = input.load()?;
    eprintln!("Loaded {} donor(s)", donors.len());

    let outcome = if parallel {
        analyzer.analyze_batch_parallel(&donors)
    } else {
        analyzer.analyze_batch(&donors)
    };

    match outcome.status {
        RunStatus::NothingToReport => {
            eprintln!("No results were generated.");
            return Ok(true);
        }
        RunStatus::Cancelled { processed, total } => {
            eprintln!("Cancelled after {} of {} donor(s)", processed, total);
        }
        RunStatus::Completed => {}
    }

    std::fs::create_dir_all(results_dir)?;
    let output = results_dir.join(format!("{}.{}", RESULTS_STEM, format.extension()));
    eprintln!("Writing results to {:?}...", output);
    match format {
        TableFormat::Tsv => outcome.table.to_tsv(&output)?,
        TableFormat::Csv => outcome.table.to_csv(&output)?,
        TableFormat::Json => outcome.table.to_json(&output)?,
    }

    eprintln!("Done!");
    eprint!("{}", outcome.table.summary());
    Ok(true)
}

/// Validate a configuration; returns false when any error was found
fn cmd_validate(config_path: &Path, input: &OptionalInputArgs) -> Result<bool> {
    eprintln!("Loading assay configuration from {:?}...", config_path);
    let config = AssayConfig::from_path(config_path)?;

    let mut report = validate_config(&config);
    println!("Configuration:");
    print!("{}", report);

    if let Some(donors) = input.load()? {
        let profile = profile_wells(&all_records(&donors));
        let data_report = validate_config_for_data(&config, &profile);
        println!();
        println!("Configuration against data:");
        print!("{}", data_report);
        report.merge(data_report);
    }

    if report.has_errors() {
        eprintln!("Validation failed");
        Ok(false)
    } else {
        eprintln!("Validation passed");
        Ok(true)
    }
}

/// Profile well exports
fn cmd_profile(input: &InputArgs, format: ProfileFormat) -> Result<bool> {
    let donors = input.load()?;
    let profile = profile_wells(&all_records(&donors));

    match format {
        ProfileFormat::Json => println!("{}", serde_json::to_string_pretty(&profile)?),
        ProfileFormat::Yaml => print!("{}", serde_yaml::to_string(&profile)?),
        ProfileFormat::Text => print!("{}", profile),
    }
    Ok(true)
}

/// Print a configuration inferred from well exports
fn cmd_suggest(input: &InputArgs, cells_per_well: u64, sfc_cutoff: f64) -> Result<bool> {
    let donors = input.load()?;
    let profile = profile_wells(&all_records(&donors));
    let suggestion = suggest_config(&profile);
    if suggestion.control_stim.is_none() {
        eprintln!("No control-like stimulus found; defaulting to DMSO");
    }
    let config = suggestion.into_config(cells_per_well, sfc_cutoff);
    print!("{}", config.to_yaml()?);
    Ok(true)
}

/// Generate example assay configuration
fn cmd_example(output_path: &Path) -> Result<bool> {
    let yaml = AssayConfig::example().to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(true)
}
