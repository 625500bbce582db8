//!
//! Command-line front end for the reconstruction pipeline.
#![allow(clippy::uninlined_format_args)]

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use petrec_algorithms::{Pipeline, PipelineConfig};
use petrec_core::{CalibrationTable, MemoryDiagnostics};
use petrec_io::{load_calibration, load_sensor_map, JsonlSink, JsonlWindowSource};

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    PetrecIo(#[from] petrec_io::Error),

    #[error("core error: {0}")]
    Core(#[from] petrec_core::Error),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Event reconstruction for segmented scintillation detectors.
#[derive(Parser)]
#[command(name = "petrec")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct events from a window file
    Process {
        /// Input window file (one JSON batch per line)
        input: PathBuf,

        /// Detector geometry description (JSON)
        #[arg(short, long)]
        geometry: PathBuf,

        /// Calibration offsets (JSON); zero offsets when omitted
        #[arg(short, long)]
        calibration: Option<PathBuf>,

        /// Pipeline configuration (JSON); defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Print diagnostic sample statistics after the run
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a geometry description
    Info {
        /// Detector geometry description (JSON)
        geometry: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            geometry,
            calibration,
            config,
            output,
            verbose,
        } => {
            let map = load_sensor_map(&geometry)?;
            let calibration = match calibration {
                Some(path) => load_calibration(path)?,
                None => CalibrationTable::new(),
            };
            let config: PipelineConfig = match config {
                Some(path) => serde_json::from_reader(File::open(path)?)?,
                None => PipelineConfig::default(),
            };

            let diagnostics = Arc::new(MemoryDiagnostics::new());
            let pipeline = Pipeline::with_diagnostics(
                Arc::new(map),
                calibration,
                config,
                diagnostics.clone(),
            )?;

            let source = JsonlWindowSource::open(&input)?;
            let mut sink = JsonlSink::create(&output)?;

            let start = Instant::now();
            let summary = pipeline.run(source, &mut sink)?;
            sink.flush()?;
            let elapsed = start.elapsed();

            println!(
                "Processed {} windows in {:.2}s",
                summary.windows,
                elapsed.as_secs_f64()
            );
            println!("Pulses: {}", summary.pulses);
            println!("Signals: {}", summary.signals);
            println!("Hits: {}", summary.hits);
            println!("Events: {}", summary.events);

            if verbose {
                let mut samples: Vec<_> = diagnostics.snapshot().into_iter().collect();
                samples.sort_by_key(|(name, _)| *name);
                for (name, stats) in samples {
                    println!(
                        "  {:<28} count {:>8}  sum {:.1}",
                        name, stats.count, stats.sum
                    );
                }
            }
        }

        Commands::Info { geometry } => {
            let map = load_sensor_map(&geometry)?;

            println!("File: {}", geometry.display());
            println!("Elements: {}", map.elements().count());
            println!("Mounting groups: {}", map.mounting_groups().count());

            let mut layers: Vec<_> = map.elements().map(|e| e.layer).collect();
            layers.sort_unstable();
            layers.dedup();
            println!("Layers: {:?}", layers);

            for group in map.mounting_groups() {
                println!(
                    "  group {:>4}  {:?} on element {} ({} of {} slots populated)",
                    group.id,
                    group.kind,
                    group.element,
                    map.sensor_count(group.id),
                    group.slots
                );
            }
        }
    }

    Ok(())
}
