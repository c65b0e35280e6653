//! Voyage Physics - command-line front end
//!
//! Exports cross-validation cases, compares them against a reference
//! implementation's outputs, and analyzes voyage scenarios.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use voyage_physics::crossval::{self, ExportBundle, ReferenceBundle};
use voyage_physics::scenario::{Scenario, presets};

#[derive(Parser)]
#[command(name = "voyage-physics", version, about = "Check the physics of interplanetary voyages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the cross-validation export bundle
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare an export bundle against reference outputs
    Compare {
        /// Reference outputs produced by the oracle
        #[arg(short, long)]
        reference: PathBuf,
        /// Export bundle to check (regenerated when omitted)
        #[arg(short, long)]
        bundle: Option<PathBuf>,
    },
    /// Analyze a scenario file or a named preset
    Scenario {
        /// Scenario JSON file
        #[arg(required_unless_present = "preset", conflicts_with = "preset")]
        file: Option<PathBuf>,
        /// Built-in preset name
        #[arg(short, long, value_parser = clap::builder::PossibleValuesParser::new(presets::NAMES))]
        preset: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Export { output } => {
            let bundle = crossval::export_bundle().context("building export bundle")?;
            match output {
                Some(path) => {
                    bundle
                        .write(&path)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(cases = bundle.cases.len(), path = %path.display(), "export written");
                }
                None => println!("{}", bundle.to_json()?),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Compare { reference, bundle } => {
            let bundle = match bundle {
                Some(path) => ExportBundle::read(&path).with_context(|| format!("reading {}", path.display()))?,
                None => crossval::export_bundle().context("building export bundle")?,
            };
            let reference =
                ReferenceBundle::read(&reference).with_context(|| format!("reading {}", reference.display()))?;
            let report = crossval::diff(&bundle, &reference);
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.is_clean() {
                info!(cases = report.cases, values = report.values, "reference agrees");
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Scenario { file, preset } => {
            let scenario = match (file, preset) {
                (Some(path), _) => Scenario::load(&path).with_context(|| format!("loading {}", path.display()))?,
                (None, Some(name)) => match presets::by_name(&name) {
                    Some(scenario) => scenario,
                    None => bail!("unknown preset {name}"),
                },
                (None, None) => bail!("either a scenario file or --preset is required"),
            };
            let report = scenario
                .analyze()
                .with_context(|| format!("analyzing scenario {}", scenario.name))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
