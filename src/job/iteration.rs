use std::path::PathBuf;

use crate::config::settings::SubmissionConfig;
use crate::job::template::{Bindings, Token};

/// One pass of the submission loop: the job index and the directory the job owns
///
/// Directories are keyed by index, so no two iterations of a run share one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobIteration {
    pub index: u64,
    pub job_name: String,
    pub target_dir: PathBuf,
}

impl JobIteration {
    /// `<place_submission_dirs_in>/<submission_dirnames><project_name><index>`
    pub fn new(config: &SubmissionConfig, index: u64) -> Self {
        let job_name = format!("{}{}", config.project_name, index);
        let target_dir = config
            .place_submission_dirs_in
            .join(format!("{}{}", config.submission_dirnames, job_name));
        JobIteration { index, job_name, target_dir }
    }

    pub fn script_path(&self) -> PathBuf {
        self.target_dir.join(format!("{}.job", self.job_name))
    }

    pub fn bindings(&self, config: &SubmissionConfig) -> Bindings {
        let resources = &config.resources;
        Bindings::new()
            .with(Token::Submission, self.target_dir.display().to_string())
            .with(Token::JobName, self.job_name.as_str())
            .with(Token::ExecuteThis, config.executable.as_str())
            .with(Token::RunDuration, resources.run_duration.as_str())
            .with(Token::NrOfNodes, resources.nodes.as_str())
            .with(Token::ProcessorsPerNode, resources.processors_per_node.as_str())
            .with(Token::ProcessMemory, resources.memory.as_str())
    }
}
