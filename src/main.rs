use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use crate::config::settings::{SubmissionConfig, Verbosity};
use crate::generator::command::CommandGenerator;
use crate::orchestrator::{Orchestrator, Outcome};

mod config;
mod generator;
mod job;
mod logging;
mod orchestrator;
#[cfg(test)]
mod testing;

/// Make batch cluster submissions from packets written by an external generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Main config file, like Configs/batch_cluster_reference.json
    config: PathBuf,

    /// Console verbosity, overrides the config file
    #[arg(short, long, value_enum)]
    verbosity: Option<Verbosity>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // no logger yet, so startup failures go straight to stderr
    let config = match SubmissionConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    let verbosity = args.verbosity.unwrap_or(config.logging.console_verbosity);
    if let Err(err) = logging::init(&config.logging, verbosity.level_filter()) {
        eprintln!("Error: {err:#}");
        return ExitCode::FAILURE;
    }

    // errors always reach the console, whether or not a log file is set
    match run(&args, &config) {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: &SubmissionConfig) -> anyhow::Result<ExitCode> {
    info!("terve! starting up with {}", args.config.display());
    info!(
        "Project {} from {}, job template {}",
        config.project_name,
        config.generator.working_dir.display(),
        config.job_template.display()
    );

    let generator = CommandGenerator::new(config.generator.clone());
    let report = Orchestrator::new(config, generator).run()?;

    let elapsed = report.finished_at - report.started_at;
    info!(
        "Dispatched {} jobs between {} and {} ({}s), {}",
        report.dispatched,
        report.started_at,
        report.finished_at,
        elapsed.num_seconds(),
        report.outcome
    );

    Ok(match report.outcome {
        Outcome::CycleEnded => ExitCode::SUCCESS,
        Outcome::GeneratorFailed { code } => exit_code(code),
    })
}

/// Generator error codes outside 1..=255 can't be a process status, those exit with 1
fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) if code != 0 => ExitCode::from(code),
        _ => ExitCode::FAILURE,
    }
}
