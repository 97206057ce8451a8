use std::process::Command;

use log::{debug, error, info};
use serde::Serialize;
use tinytemplate::{format_unescaped, TinyTemplate};

use crate::config::settings::GeneratorSettings;
use crate::generator::{GeneratorError, PacketGenerator, Status};

/// A packet generator backed by an external program
///
/// The program is run once per packet from the project input directory, with arguments rendered
/// from TinyTemplate strings such as `{project_name}` and `{index}`. Its exit code is the status:
/// 0 means a packet was written, the configured cycle end code means there's nothing left to do,
/// and anything else is an error.
pub struct CommandGenerator {
    name: String,
    settings: GeneratorSettings,
}

/// Rendering context for program arguments
#[derive(Serialize)]
struct ArgumentContext<'a> {
    project_name: &'a str,
    index: u64,
}

impl CommandGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        let name = settings
            .program
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| settings.program.display().to_string());
        CommandGenerator { name, settings }
    }

    fn render_args(&self, project_name: &str, index: u64) -> Result<Vec<String>, GeneratorError> {
        let context = ArgumentContext { project_name, index };
        self.settings
            .args
            .iter()
            .map(|argument| render_argument(argument, &context))
            .collect()
    }
}

fn render_argument(argument: &str, context: &ArgumentContext) -> Result<String, GeneratorError> {
    let invalid = |err: tinytemplate::error::Error| GeneratorError::Arguments {
        argument: argument.to_string(),
        message: err.to_string(),
    };
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);
    tt.add_template("argument", argument).map_err(invalid)?;
    tt.render("argument", context).map_err(invalid)
}

impl PacketGenerator for CommandGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), GeneratorError> {
        if !self.settings.program.is_file() {
            return Err(GeneratorError::Missing(self.settings.program.clone()));
        }
        // catch broken argument templates before any job is made
        self.render_args("", 0)?;
        info!("Using submission maker {}", self.settings.program.display());
        Ok(())
    }

    fn produce(&mut self, project_name: &str, index: u64) -> Status {
        let args = match self.render_args(project_name, index) {
            Ok(args) => args,
            Err(err) => {
                error!("{err}");
                return Status::Error(-1);
            }
        };

        let mut command = Command::new(&self.settings.program);
        let cmd = command.args(&args).current_dir(&self.settings.working_dir);
        debug!("Running submission maker {:?}", cmd);

        let output = match cmd.output() {
            Ok(output) => output,
            Err(err) => {
                error!("Can't run submission maker {}: {}", self.settings.program.display(), err);
                return Status::Error(-1);
            }
        };
        debug!("{} stdout: {}", self.name, String::from_utf8_lossy(&output.stdout).trim());
        debug!("{} stderr: {}", self.name, String::from_utf8_lossy(&output.stderr).trim());

        match output.status.code() {
            Some(0) => Status::Success,
            Some(code) if code == self.settings.cycle_ended_exit_code => Status::CycleEnded,
            Some(code) => Status::Error(code),
            None => {
                error!("Submission maker {} was killed by a signal", self.name);
                Status::Error(-1)
            }
        }
    }
}
