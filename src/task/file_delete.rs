// src/task/file_delete.rs

//! Delete files that belong to the subject.
//!
//! Source properties:
//! - `pattern` (required): file-name glob. `${username}`, `${pseudonym}`,
//!   `${tenant}` and `${domain}` are filled in from the subject when the task
//!   runs, e.g. `pattern = "${username}-*.json"`.
//!
//! Only regular files directly inside the source directory are considered.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::engine::{TaskOutcome, TaskReport};
use crate::errors::ModuleError;
use crate::task::{
    compile_glob, matching_files, LaneContext, SystemEnvironment, Task, TaskDiscoverer,
    TaskFuture,
};
use crate::types::{LaneSettings, Properties, SubjectIdentifier};

pub const LANE_TYPE: &str = "file-delete";

#[derive(Debug, Clone, Copy, Default)]
pub struct FileDeleteDiscoverer;

impl TaskDiscoverer for FileDeleteDiscoverer {
    fn lane_type(&self) -> &str {
        LANE_TYPE
    }

    fn discover(
        &self,
        location: &Path,
        properties: &Properties,
        _env: &SystemEnvironment,
    ) -> Result<Vec<Arc<dyn Task>>, ModuleError> {
        let pattern = properties
            .get("pattern")
            .ok_or_else(|| ModuleError::MissingProperty("pattern".to_string()))?;

        // Catch malformed globs now rather than mid-run.
        let probe = SubjectIdentifier::with_pseudonym("probe", "probe", "probe", "probe");
        compile_glob("pattern", &expand_pattern(pattern, &probe))?;

        let metadata = std::fs::metadata(location).map_err(|source| ModuleError::Unreadable {
            path: location.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(ModuleError::InvalidProperty {
                name: "path".to_string(),
                reason: format!("{:?} is not a directory", location),
            });
        }

        Ok(vec![Arc::new(DeleteFilesTask::new(location, pattern.clone()))])
    }
}

/// Substitute subject placeholders into a glob template.
pub fn expand_pattern(template: &str, subject: &SubjectIdentifier) -> String {
    template
        .replace("${username}", &globset::escape(subject.username()))
        .replace("${pseudonym}", &globset::escape(subject.pseudonym()))
        .replace("${tenant}", &globset::escape(subject.tenant_domain()))
        .replace("${domain}", &globset::escape(subject.user_store_domain()))
}

#[derive(Debug, Clone)]
pub struct DeleteFilesTask {
    dir: PathBuf,
    pattern: String,
}

impl DeleteFilesTask {
    pub fn new(dir: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            pattern: pattern.into(),
        }
    }

    async fn delete(&self, subject: &SubjectIdentifier) -> anyhow::Result<TaskOutcome> {
        if self.pattern.contains("${username}") && subject.username().trim().is_empty() {
            anyhow::bail!("refusing to expand {:?} for an empty username", self.pattern);
        }
        let pattern = expand_pattern(&self.pattern, subject);
        let matcher = compile_glob("pattern", &pattern)?;
        let files = matching_files(&self.dir, &matcher)?;

        if files.is_empty() {
            debug!(dir = ?self.dir, %pattern, "no files matched; nothing to delete");
            return Ok(TaskOutcome::NoResult);
        }

        for file in &files {
            info!(file = ?file, "deleting file");
            tokio::fs::remove_file(file)
                .await
                .with_context(|| format!("deleting {:?}", file))?;
        }

        let deleted = files.len() as u64;
        Ok(TaskOutcome::Value(TaskReport::new(
            self.describe(),
            format!("{deleted} file(s) deleted"),
            deleted,
        )))
    }
}

impl Task for DeleteFilesTask {
    fn describe(&self) -> String {
        format!("file-delete {}/{}", self.dir.display(), self.pattern)
    }

    fn execute<'a>(
        &'a self,
        subject: &'a SubjectIdentifier,
        _settings: &'a LaneSettings,
        _context: &'a mut LaneContext,
    ) -> TaskFuture<'a> {
        Box::pin(self.delete(subject))
    }
}
