//! The submission loop
//!
//! Each pass asks the generator for a packet, moves it into its own target directory, renders the
//! launch script next to it and dispatches the script. The loop ends when the generator says the
//! cycle is over or fails. Anything else that goes wrong stops the whole run; jobs that were
//! already dispatched stay submitted.

use std::fmt;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use thiserror::Error;

use crate::config::settings::SubmissionConfig;
use crate::generator::{GeneratorError, PacketGenerator, Status};
use crate::job::dispatch::{DispatchError, Dispatcher};
use crate::job::iteration::JobIteration;
use crate::job::placement::{self, PlacementError};
use crate::job::template::{JobTemplate, LaunchScript, TemplateError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error("Maximum allowed number of jobs reached. Limit: {0}")]
    CeilingReached(u64),
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("Can't write launch script {}", path.display())]
    WriteScript {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Why a run stopped without a fatal error
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    CycleEnded,
    GeneratorFailed { code: i32 },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::CycleEnded => write!(f, "cycle ended"),
            Outcome::GeneratorFailed { code } => write!(f, "generator failed with code {code}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: Outcome,
    pub dispatched: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Orchestrator<'a, G: PacketGenerator> {
    config: &'a SubmissionConfig,
    generator: G,
    template: JobTemplate,
    dispatcher: Dispatcher,
}

impl<'a, G: PacketGenerator> Orchestrator<'a, G> {
    pub fn new(config: &'a SubmissionConfig, generator: G) -> Self {
        let dispatcher = Dispatcher::new(
            config.submit_mode,
            &config.batch_executable,
            &config.submit_all_file,
        );
        Orchestrator {
            config,
            generator,
            template: JobTemplate::new(&config.job_template),
            dispatcher,
        }
    }

    /// Make and dispatch jobs until the generator stops
    ///
    /// Job indices start at 0 and go up by one. Asking for job number `allowed_maximum_jobs` is
    /// an error: the ceiling guards against generators that never end their cycle.
    pub fn run(&mut self) -> Result<RunReport, RunError> {
        let started_at = Utc::now();
        self.generator.validate()?;
        info!(
            "Making submissions for {} with {} (submit type: {})",
            self.config.project_name,
            self.generator.name(),
            self.config.submit_mode
        );

        let mut index: u64 = 0;
        let outcome = loop {
            if index == self.config.allowed_maximum_jobs {
                return Err(RunError::CeilingReached(self.config.allowed_maximum_jobs));
            }

            let status = self.generator.produce(&self.config.project_name, index);
            debug!("{} reported {} for job {}", self.generator.name(), status, index);
            match status {
                Status::Success => {
                    self.submit(&JobIteration::new(self.config, index))?;
                    index += 1;
                }
                Status::CycleEnded => {
                    info!("A last job has been reached. Job number: {index}");
                    break Outcome::CycleEnded;
                }
                Status::Error(code) => {
                    error!("An error in {} occured. Error code {}", self.generator.name(), code);
                    break Outcome::GeneratorFailed { code };
                }
            }
        };

        Ok(RunReport { outcome, dispatched: index, started_at, finished_at: Utc::now() })
    }

    /// Place, render and dispatch one job
    fn submit(&mut self, iteration: &JobIteration) -> Result<(), RunError> {
        info!("Creating job {} in {}", iteration.job_name, iteration.target_dir.display());
        placement::place(&self.config.packet, &iteration.target_dir)?;
        placement::check_executable(&iteration.target_dir, &self.config.executable)?;

        let template = self.template.lines()?;
        let script = LaunchScript::render(template, &iteration.bindings(self.config));
        let script_path = iteration.script_path();
        script
            .write(&script_path)
            .map_err(|source| RunError::WriteScript { path: script_path.clone(), source })?;

        self.dispatcher.dispatch(&script_path)?;
        Ok(())
    }
}
