//! Packet generators produce the content of each job
//!
//! The submission loop only knows the [`PacketGenerator`] trait. What a packet contains is up to
//! the generator; the loop just moves whatever it produced into place.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Run an external program once per packet
pub mod command;

/// What a generator reports after each call
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// A packet is ready to be placed
    Success,
    /// No more work, the run ends normally
    CycleEnded,
    /// The generator failed with this code
    Error(i32),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Status::Success => write!(f, "success"),
            Status::CycleEnded => write!(f, "cycle ended"),
            Status::Error(code) => write!(f, "error {code}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Submission maker {} does not exist", .0.display())]
    Missing(PathBuf),
    #[error("Submission maker argument {argument:?} is not a valid template: {message}")]
    Arguments { argument: String, message: String },
}

pub trait PacketGenerator {
    /// Name used in log messages
    fn name(&self) -> &str;

    /// Checked once before the first packet is requested
    fn validate(&self) -> Result<(), GeneratorError> {
        Ok(())
    }

    /// Produce the packet for job `index` of `project_name`
    fn produce(&mut self, project_name: &str, index: u64) -> Status;
}
