use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

/// Placeholders recognised inside a job template, written as `<NAME>` in the template text
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
    Submission,
    JobName,
    ExecuteThis,
    RunDuration,
    NrOfNodes,
    ProcessorsPerNode,
    ProcessMemory,
}

impl Token {
    pub const ALL: [Token; 7] = [
        Token::Submission,
        Token::JobName,
        Token::ExecuteThis,
        Token::RunDuration,
        Token::NrOfNodes,
        Token::ProcessorsPerNode,
        Token::ProcessMemory,
    ];

    pub fn marker(&self) -> &'static str {
        match self {
            Token::Submission => "<SUBMISSION>",
            Token::JobName => "<JOBNAME>",
            Token::ExecuteThis => "<EXECUTE_THIS>",
            Token::RunDuration => "<RUN_DURATION>",
            Token::NrOfNodes => "<NR_OF_NODES>",
            Token::ProcessorsPerNode => "<PROCESSORS_PER_NODE>",
            Token::ProcessMemory => "<PROCESS_MEMORY>",
        }
    }
}

/// Values substituted for tokens. Tokens without a value are left in the output untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<Token, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: Token, value: impl Into<String>) -> Self {
        self.values.insert(token, value.into());
        self
    }

    pub fn get(&self, token: Token) -> Option<&str> {
        self.values.get(&token).map(String::as_str)
    }

    /// Find a bound marker at the very start of `text`
    fn match_prefix(&self, text: &str) -> Option<(usize, &str)> {
        Token::ALL
            .iter()
            .find(|token| text.starts_with(token.marker()))
            .and_then(|token| self.get(*token).map(|value| (token.marker().len(), value)))
    }
}

/// Substitute bound tokens in every line of a template
///
/// Each line is scanned once from left to right, so a substituted value is never scanned again
/// and the order tokens are bound in has no effect on the result. The output always has as many
/// lines as the input.
pub fn render(lines: &[String], bindings: &Bindings) -> Vec<String> {
    lines.iter().map(|line| render_line(line, bindings)).collect()
}

fn render_line(line: &str, bindings: &Bindings) -> String {
    let mut rendered = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find('<') {
        rendered.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match bindings.match_prefix(candidate) {
            Some((marker_len, value)) => {
                rendered.push_str(value);
                rest = &candidate[marker_len..];
            }
            None => {
                rendered.push('<');
                rest = &candidate[1..];
            }
        }
    }
    rendered.push_str(rest);

    rendered
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Can't find job template {}", .0.display())]
    Missing(PathBuf),
    #[error("Can't read job template {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The job template on disk, read the first time it's needed and kept in memory after that
pub struct JobTemplate {
    path: PathBuf,
    lines: Option<Vec<String>>,
}

impl JobTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JobTemplate { path: path.into(), lines: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.lines.is_some()
    }

    pub fn lines(&mut self) -> Result<&[String], TemplateError> {
        if !self.is_loaded() {
            self.lines = Some(read_template(&self.path)?);
        }
        Ok(self.lines.as_deref().unwrap_or_default())
    }
}

fn read_template(path: &Path) -> Result<Vec<String>, TemplateError> {
    if !path.exists() {
        return Err(TemplateError::Missing(path.to_path_buf()));
    }
    info!("Loading job template {}", path.display());
    let content = fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().map(String::from).collect())
}

/// A rendered, scheduler ready launch script
#[derive(Debug, PartialEq, Eq)]
pub struct LaunchScript {
    pub lines: Vec<String>,
}

impl LaunchScript {
    pub fn render(template: &[String], bindings: &Bindings) -> Self {
        LaunchScript { lines: render(template, bindings) }
    }

    /// Write the script, one template line per output line
    pub fn write(&self, out_path: &Path) -> Result<(), io::Error> {
        let mut file = BufWriter::new(File::create(out_path)?);
        for line in &self.lines {
            writeln!(file, "{line}")?;
        }
        file.flush()
    }
}
