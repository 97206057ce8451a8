use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::ValueEnum;
use log::LevelFilter;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::config::schema::{validate, Document};
use crate::job::placement::PacketLayout;

/// How rendered launch scripts reach the scheduler
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitMode {
    Runtime,
    File,
}

impl fmt::Display for SubmitMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SubmitMode::Runtime => write!(f, "runtime"),
            SubmitMode::File => write!(f, "file"),
        }
    }
}

/// How much of the log reaches the console
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    Errors,
    Warnings,
    Info,
}

impl Verbosity {
    pub fn level_filter(&self) -> LevelFilter {
        match self {
            Verbosity::Errors => LevelFilter::Error,
            Verbosity::Warnings => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Verbosity::Errors => write!(f, "errors"),
            Verbosity::Warnings => write!(f, "warnings"),
            Verbosity::Info => write!(f, "info"),
        }
    }
}

/// Values for the resource tokens of the job template
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resources {
    pub run_duration: String,
    pub nodes: String,
    pub processors_per_node: String,
    pub memory: String,
}

/// The external program that writes one packet per call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cycle_ended_exit_code: i32,
    pub working_dir: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogSettings {
    pub log_filename: Option<PathBuf>,
    pub console_verbosity: Verbosity,
}

/// Everything a run needs, built once at startup and never changed afterwards
///
/// All paths are absolute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionConfig {
    pub allowed_maximum_jobs: u64,
    pub place_submission_dirs_in: PathBuf,
    pub submission_dirnames: String,
    pub project_name: String,
    pub submit_mode: SubmitMode,
    pub batch_executable: String,
    pub submit_all_file: PathBuf,
    pub resources: Resources,
    pub executable: String,
    pub packet: PacketLayout,
    pub job_template: PathBuf,
    pub generator: GeneratorSettings,
    pub logging: LogSettings,
}

impl SubmissionConfig {
    /// Read the main config and the project config it points at
    ///
    /// Relative paths are resolved against the current working directory.
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let base = env::current_dir().context("Can't read current directory")?;
        let main: MainConfig = read_document(config_path, Document::Main)?;

        let project_path = base
            .join(&main.generic.project_input_path)
            .join(&main.generic.project_config);
        let project: ProjectConfig = read_document(&project_path, Document::Project)?;

        Ok(Self::assemble(main, project, &base))
    }

    fn assemble(main: MainConfig, project: ProjectConfig, base: &Path) -> Self {
        let MainConfig { generic, submission_specifics: submission, execution_specifics: execution } =
            main;
        let cluster = project.batch_cluster;
        let input_path = base.join(&generic.project_input_path);

        let packet = match cluster.outputs_a_dir {
            true => PacketLayout::Directory(input_path.join(&cluster.output_dir_name)),
            false => PacketLayout::Files {
                source_dir: input_path.clone(),
                names: cluster.output_files,
            },
        };

        SubmissionConfig {
            allowed_maximum_jobs: submission.allowed_maximum_jobs,
            place_submission_dirs_in: base.join(&submission.place_submission_dirs_in),
            submission_dirnames: submission.submission_dirnames,
            project_name: cluster.project_name,
            submit_mode: execution.task_submission_type,
            batch_executable: submission.batch_executable,
            submit_all_file: base.join(&execution.multiple_submission_file),
            resources: Resources {
                run_duration: submission.expected_run_duration,
                nodes: submission.nodes,
                processors_per_node: submission.processors_per_node,
                memory: submission.memory,
            },
            executable: cluster.executable,
            packet,
            job_template: base
                .join(&submission.job_config_src_path)
                .join(&submission.job_config_src_file),
            generator: GeneratorSettings {
                program: input_path.join(&cluster.submission_maker),
                args: cluster.submission_maker_args,
                cycle_ended_exit_code: cluster.cycle_ended_exit_code,
                working_dir: input_path,
            },
            logging: LogSettings {
                log_filename: generic.log_filename.map(|path| base.join(path)),
                console_verbosity: generic.console_verbosity,
            },
        }
    }
}

fn read_document<T: DeserializeOwned>(path: &Path, document: Document) -> anyhow::Result<T> {
    if !path.exists() {
        bail!("A {} file {} does not exist", document, path.display());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Can't read {}", path.display()))?;
    let json: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} {} is not valid JSON", document, path.display()))?;
    validate(document, &json).with_context(|| format!("Checking {}", path.display()))?;
    serde_json::from_value::<T>(json)
        .with_context(|| format!("Can't deserialise {} {}", document, path.display()))
}

// Raw documents. Missing keys fall back to the defaults below, file values override them.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MainConfig {
    generic: Generic,
    submission_specifics: SubmissionSpecifics,
    execution_specifics: ExecutionSpecifics,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Generic {
    project_input_path: PathBuf,
    project_config: PathBuf,
    log_filename: Option<PathBuf>,
    console_verbosity: Verbosity,
}

impl Default for Generic {
    fn default() -> Self {
        Generic {
            project_input_path: PathBuf::from("Input/examples/batch_cluster/"),
            project_config: PathBuf::from("example.json"),
            log_filename: Some(PathBuf::from("batch_cluster.log")),
            console_verbosity: Verbosity::Errors,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SubmissionSpecifics {
    batch_executable: String,
    allowed_maximum_jobs: u64,
    job_config_src_path: PathBuf,
    job_config_src_file: PathBuf,
    submission_dirnames: String,
    place_submission_dirs_in: PathBuf,
    expected_run_duration: String,
    nodes: String,
    processors_per_node: String,
    memory: String,
}

impl Default for SubmissionSpecifics {
    fn default() -> Self {
        SubmissionSpecifics {
            batch_executable: "qsub".to_string(),
            allowed_maximum_jobs: 10000,
            job_config_src_path: PathBuf::from("data/templates/"),
            job_config_src_file: PathBuf::from("batch_PBS_default_config.job"),
            submission_dirnames: "submission_".to_string(),
            place_submission_dirs_in: PathBuf::from("Outputs"),
            expected_run_duration: "20:00:00".to_string(),
            nodes: "1".to_string(),
            processors_per_node: "1".to_string(),
            memory: "1000mb".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ExecutionSpecifics {
    task_submission_type: SubmitMode,
    multiple_submission_file: PathBuf,
}

impl Default for ExecutionSpecifics {
    fn default() -> Self {
        ExecutionSpecifics {
            task_submission_type: SubmitMode::Runtime,
            multiple_submission_file: PathBuf::from("submit_all.run"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectConfig {
    batch_cluster: BatchCluster,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct BatchCluster {
    project_name: String,
    submission_maker: PathBuf,
    submission_maker_args: Vec<String>,
    cycle_ended_exit_code: i32,
    outputs_a_dir: bool,
    output_dir_name: PathBuf,
    output_files: Vec<String>,
    executable: String,
}

impl Default for BatchCluster {
    fn default() -> Self {
        BatchCluster {
            project_name: "cluster_run".to_string(),
            submission_maker: PathBuf::from("create_submission"),
            submission_maker_args: vec!["{project_name}".to_string(), "{index}".to_string()],
            cycle_ended_exit_code: 3,
            outputs_a_dir: false,
            output_dir_name: PathBuf::from("submit"),
            output_files: vec!["test.dat".to_string(), "test.sh".to_string()],
            executable: "run_me.sh".to_string(),
        }
    }
}
