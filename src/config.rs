//! Load and validate the run configuration
//!
//! A run is described by two JSON documents: the main config given on the command line, and the
//! project config that lives next to the packet generator. Both are checked against an embedded
//! JSON schema before they are deserialised.

/// Compiled JSON schemas for both config documents
pub mod schema;
/// Typed, immutable run settings
pub mod settings;
