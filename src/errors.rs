// src/errors.rs

//! Crate-wide error types.
//!
//! - [`ForgetMeError`] covers everything that aborts a whole run: bad config,
//!   unknown readers and discovery failures.
//! - [`ModuleError`] is what a task discoverer raises when it cannot make
//!   sense of a source.
//! - [`LaneError`] stays inside the engine: a failing task aborts its own lane
//!   and the error is logged at the join point, never returned from a run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForgetMeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Unknown instruction reader: {0}")]
    UnknownReader(String),

    #[error("Unable to get instructions for lane '{lane}' from {location:?}: {source}")]
    Discovery {
        lane: String,
        location: PathBuf,
        #[source]
        source: ModuleError,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Structural error raised by a [`TaskDiscoverer`](crate::task::TaskDiscoverer).
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("missing required property '{0}'")]
    MissingProperty(String),

    #[error("invalid property '{name}': {reason}")]
    InvalidProperty { name: String, reason: String },

    #[error("cannot read source {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a single lane pipeline.
#[derive(Error, Debug)]
pub enum LaneError {
    #[error("task #{position} ({task}) in lane '{lane}' failed: {source:#}")]
    TaskFailed {
        lane: String,
        position: usize,
        task: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("could not start runtime for lane '{lane}': {source}")]
    Runtime {
        lane: String,
        #[source]
        source: std::io::Error,
    },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ForgetMeError>;
