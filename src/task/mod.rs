// src/task/mod.rs

//! Units of redaction work and the discoverers that produce them.
//!
//! The engine only ever talks to two traits:
//! - [`TaskDiscoverer`] turns a configured source (a path plus properties)
//!   into an ordered list of tasks for one lane type.
//! - [`Task`] does the actual work against a [`SubjectIdentifier`].
//!
//! Built-in kinds live in [`log_file`], [`file_delete`] and [`sql`]; extra
//! kinds can be added to a [`DiscovererRegistry`] before config resolution.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::TaskOutcome;
use crate::errors::ModuleError;
use crate::types::{LaneSettings, Properties, SubjectIdentifier};

pub mod file_delete;
pub mod log_file;
pub mod sql;

pub use file_delete::FileDeleteDiscoverer;
pub use log_file::LogFileDiscoverer;
pub use sql::SqlDiscoverer;

/// Future returned by [`Task::execute`].
pub type TaskFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<TaskOutcome>> + Send + 'a>>;

/// One unit of redaction work bound to a lane.
pub trait Task: Send + Sync + Debug {
    /// Short human-readable label used in logs and reports.
    fn describe(&self) -> String;

    /// Run the task. An error aborts the remaining tasks of the lane.
    fn execute<'a>(
        &'a self,
        subject: &'a SubjectIdentifier,
        settings: &'a LaneSettings,
        context: &'a mut LaneContext,
    ) -> TaskFuture<'a>;
}

/// Maps configured sources to tasks for a single lane type.
pub trait TaskDiscoverer: Send + Sync + Debug {
    /// Lane type that tasks produced by this discoverer belong to, unless the
    /// source overrides it.
    fn lane_type(&self) -> &str;

    fn discover(
        &self,
        location: &Path,
        properties: &Properties,
        env: &SystemEnvironment,
    ) -> Result<Vec<Arc<dyn Task>>, ModuleError>;
}

/// Process-level facts handed to discoverers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemEnvironment {
    home_dir: PathBuf,
}

impl SystemEnvironment {
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
        }
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }
}

/// Context private to one lane pipeline run.
///
/// A fresh instance is created for every lane and is never shared between
/// lanes, so tasks may stash values here for later tasks of the same lane.
#[derive(Debug, Clone)]
pub struct LaneContext {
    lane: String,
    home_dir: PathBuf,
    values: HashMap<String, String>,
}

impl LaneContext {
    pub fn new(lane: impl Into<String>, env: &SystemEnvironment) -> Self {
        Self {
            lane: lane.into(),
            home_dir: env.home_dir().to_path_buf(),
            values: HashMap::new(),
        }
    }

    pub fn lane(&self) -> &str {
        &self.lane
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Named discoverer kinds that `reader = "..."` in a source can refer to.
#[derive(Debug, Clone, Default)]
pub struct DiscovererRegistry {
    readers: BTreeMap<String, Arc<dyn TaskDiscoverer>>,
}

impl DiscovererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `log-file`, `file-delete` and `sql` kinds.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(log_file::LANE_TYPE, Arc::new(LogFileDiscoverer));
        registry.register(file_delete::LANE_TYPE, Arc::new(FileDeleteDiscoverer));
        registry.register(sql::LANE_TYPE, Arc::new(SqlDiscoverer));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, discoverer: Arc<dyn TaskDiscoverer>) {
        self.readers.insert(name.into(), discoverer);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskDiscoverer>> {
        self.readers.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.readers.keys().map(String::as_str)
    }
}

/// Read a directory (or accept a single file) and return the regular files
/// whose names match `matcher`, sorted by path.
pub(crate) fn matching_files(
    location: &Path,
    matcher: &globset::GlobMatcher,
) -> Result<Vec<PathBuf>, ModuleError> {
    let unreadable = |source| ModuleError::Unreadable {
        path: location.to_path_buf(),
        source,
    };

    let metadata = std::fs::metadata(location).map_err(unreadable)?;
    if metadata.is_file() {
        return Ok(vec![location.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(location).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .file_name()
            .map(|name| matcher.is_match(Path::new(name)))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(crate) fn compile_glob(name: &str, pattern: &str) -> Result<globset::GlobMatcher, ModuleError> {
    globset::Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| ModuleError::InvalidProperty {
            name: name.to_string(),
            reason: e.to_string(),
        })
}
