//! Turn a generated packet into a submitted job
//!
//! A job lives in its own target directory. The packet is moved there, a launch script is
//! rendered next to it, and the script is handed to the scheduler (or queued in a file).

/// Placeholder substitution for launch script templates
pub mod template;
/// Move generated packets into their target directory
pub mod placement;
/// Submit rendered launch scripts
pub mod dispatch;
pub mod iteration;
