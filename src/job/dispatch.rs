use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use log::{info, warn};
use thiserror::Error;

use crate::config::settings::SubmitMode;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Can't start scheduler {executable}")]
    Spawn {
        executable: String,
        #[source]
        source: io::Error,
    },
    #[error("Scheduler {executable} rejected {}: {status}: {stderr}", script.display())]
    Rejected {
        executable: String,
        script: PathBuf,
        status: ExitStatus,
        stderr: String,
    },
    #[error("Can't append to submit file {}", path.display())]
    SubmitFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Hands launch scripts to the batch system, one strategy for the whole run
pub enum Dispatcher {
    /// Run the scheduler now and wait for it
    Runtime { executable: String },
    /// Queue a `<executable> <script>` line in a shared submit file
    File {
        executable: String,
        submit_file: PathBuf,
        checked_existing: bool,
    },
}

impl Dispatcher {
    pub fn new(mode: SubmitMode, executable: &str, submit_file: &Path) -> Self {
        match mode {
            SubmitMode::Runtime => Dispatcher::Runtime { executable: executable.to_string() },
            SubmitMode::File => Dispatcher::File {
                executable: executable.to_string(),
                submit_file: submit_file.to_path_buf(),
                checked_existing: false,
            },
        }
    }

    pub fn dispatch(&mut self, script: &Path) -> Result<(), DispatchError> {
        match self {
            Dispatcher::Runtime { executable } => run_scheduler(executable, script),
            Dispatcher::File { executable, submit_file, checked_existing } => {
                if !*checked_existing {
                    if submit_file.exists() {
                        warn!("A submit file {} already exists. Appending.", submit_file.display());
                    }
                    *checked_existing = true;
                }
                append_submission(submit_file, executable, script)
            }
        }
    }
}

fn run_scheduler(executable: &str, script: &Path) -> Result<(), DispatchError> {
    let mut command = Command::new(executable);
    let cmd = command.arg(script);
    info!("Running scheduler process {:?}", cmd);

    let output = cmd.output().map_err(|source| DispatchError::Spawn {
        executable: executable.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(DispatchError::Rejected {
            executable: executable.to_string(),
            script: script.to_path_buf(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    info!("Scheduler accepted {}: {}", script.display(), stdout.trim());
    Ok(())
}

fn append_submission(submit_file: &Path, executable: &str, script: &Path) -> Result<(), DispatchError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(submit_file)
        .map_err(|source| DispatchError::SubmitFile { path: submit_file.to_path_buf(), source })?;

    writeln!(file, "{} {}", executable, script.display())
        .map_err(|source| DispatchError::SubmitFile { path: submit_file.to_path_buf(), source })?;
    info!("Queued {} in {}", script.display(), submit_file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::capture_warnings;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_mode_appends_lines() {
        let tmp = TempDir::with_prefix("dispatch").unwrap();
        let submit_file = tmp.path().join("submit_all.run");
        let mut dispatcher = Dispatcher::new(SubmitMode::File, "qsub", &submit_file);

        dispatcher.dispatch(Path::new("/out/submission_run0/run0.job")).unwrap();
        dispatcher.dispatch(Path::new("/out/submission_run1/run1.job")).unwrap();

        assert_eq!(
            fs::read_to_string(&submit_file).unwrap(),
            "qsub /out/submission_run0/run0.job\nqsub /out/submission_run1/run1.job\n"
        );
    }

    #[test]
    fn test_file_mode_keeps_existing_content() {
        let tmp = TempDir::with_prefix("dispatch").unwrap();
        let submit_file = tmp.path().join("submit_all.run");
        fs::write(&submit_file, "qsub /old/old0.job\n").unwrap();

        let mut dispatcher = Dispatcher::new(SubmitMode::File, "qsub", &submit_file);
        dispatcher.dispatch(Path::new("/new/new0.job")).unwrap();

        assert_eq!(
            fs::read_to_string(&submit_file).unwrap(),
            "qsub /old/old0.job\nqsub /new/new0.job\n"
        );
    }

    #[test]
    fn test_file_mode_warns_once_for_existing_file() {
        let tmp = TempDir::with_prefix("dispatch").unwrap();
        let submit_file = tmp.path().join("submit_all.run");
        fs::write(&submit_file, "qsub /old/old0.job\n").unwrap();

        let mut dispatcher = Dispatcher::new(SubmitMode::File, "qsub", &submit_file);
        let warnings = capture_warnings(|| {
            dispatcher.dispatch(Path::new("/new/new0.job")).unwrap();
            dispatcher.dispatch(Path::new("/new/new1.job")).unwrap();
        });

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("already exists. Appending."));
    }

    #[test]
    fn test_file_mode_new_file_no_warning() {
        let tmp = TempDir::with_prefix("dispatch").unwrap();
        let submit_file = tmp.path().join("submit_all.run");

        let mut dispatcher = Dispatcher::new(SubmitMode::File, "qsub", &submit_file);
        let warnings = capture_warnings(|| {
            dispatcher.dispatch(Path::new("/new/new0.job")).unwrap();
            dispatcher.dispatch(Path::new("/new/new1.job")).unwrap();
        });

        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(fs::read_to_string(&submit_file).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_file_mode_unwritable() {
        let tmp = TempDir::with_prefix("dispatch").unwrap();
        let submit_file = tmp.path().join("missing_dir/submit_all.run");
        let mut dispatcher = Dispatcher::new(SubmitMode::File, "qsub", &submit_file);
        assert!(matches!(
            dispatcher.dispatch(Path::new("a.job")),
            Err(DispatchError::SubmitFile { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_runtime_mode_success() {
        let mut dispatcher = Dispatcher::new(SubmitMode::Runtime, "true", Path::new("unused"));
        dispatcher.dispatch(Path::new("run0.job")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_runtime_mode_rejected() {
        let mut dispatcher = Dispatcher::new(SubmitMode::Runtime, "false", Path::new("unused"));
        assert!(matches!(
            dispatcher.dispatch(Path::new("run0.job")),
            Err(DispatchError::Rejected { .. })
        ));
    }

    #[test]
    fn test_runtime_mode_missing_scheduler() {
        let mut dispatcher =
            Dispatcher::new(SubmitMode::Runtime, "/definitely/not/a/qsub", Path::new("unused"));
        assert!(matches!(
            dispatcher.dispatch(Path::new("run0.job")),
            Err(DispatchError::Spawn { .. })
        ));
    }
}
