// src/task/log_file.rs

//! Log rewriting: replace the subject's username with its pseudonym.
//!
//! Source properties:
//! - `include`: file-name glob, default `*.log`
//! - `patterns`: optional regexes (comma or newline separated). When set,
//!   only lines matching at least one of them are rewritten.
//!
//! Lane settings:
//! - `backup = "true"` keeps the original as `<file>.bak`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use regex::bytes::{NoExpand, Regex};
use tracing::{debug, info};

use crate::engine::{TaskOutcome, TaskReport};
use crate::errors::ModuleError;
use crate::task::{
    compile_glob, matching_files, LaneContext, SystemEnvironment, Task, TaskDiscoverer,
    TaskFuture,
};
use crate::types::{LaneSettings, Properties, SubjectIdentifier};

pub const LANE_TYPE: &str = "log-file";

const DEFAULT_INCLUDE: &str = "*.log";
const REPLACED_KEY: &str = "log-file.replaced";

#[derive(Debug, Clone, Copy, Default)]
pub struct LogFileDiscoverer;

impl TaskDiscoverer for LogFileDiscoverer {
    fn lane_type(&self) -> &str {
        LANE_TYPE
    }

    fn discover(
        &self,
        location: &Path,
        properties: &Properties,
        _env: &SystemEnvironment,
    ) -> Result<Vec<Arc<dyn Task>>, ModuleError> {
        let include = properties
            .get("include")
            .map(String::as_str)
            .unwrap_or(DEFAULT_INCLUDE);
        let matcher = compile_glob("include", include)?;
        let line_filters = Arc::new(parse_line_filters(properties.get("patterns"))?);

        let files = matching_files(location, &matcher)?;
        debug!(?location, count = files.len(), "discovered log files");

        Ok(files
            .into_iter()
            .map(|file| {
                Arc::new(LogRewriteTask {
                    file,
                    line_filters: Arc::clone(&line_filters),
                }) as Arc<dyn Task>
            })
            .collect())
    }
}

fn parse_line_filters(raw: Option<&String>) -> Result<Vec<Regex>, ModuleError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Regex::new(s).map_err(|e| ModuleError::InvalidProperty {
                name: "patterns".to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Rewrites a single log file in place.
#[derive(Debug)]
pub struct LogRewriteTask {
    file: PathBuf,
    line_filters: Arc<Vec<Regex>>,
}

impl LogRewriteTask {
    pub fn new(file: impl Into<PathBuf>, line_filters: Vec<Regex>) -> Self {
        Self {
            file: file.into(),
            line_filters: Arc::new(line_filters),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    async fn rewrite(
        &self,
        subject: &SubjectIdentifier,
        settings: &LaneSettings,
        context: &mut LaneContext,
    ) -> anyhow::Result<TaskOutcome> {
        info!(file = ?self.file, "rewriting log file");

        let contents = tokio::fs::read(&self.file)
            .await
            .with_context(|| format!("reading log file {:?}", self.file))?;

        let username = username_regex(subject.username())?;
        let (rewritten, replaced) =
            rewrite_lines(&contents, &username, &self.line_filters, subject.pseudonym());

        if replaced > 0 {
            if settings.flag("backup") {
                let backup = sibling(&self.file, "bak");
                tokio::fs::copy(&self.file, &backup)
                    .await
                    .with_context(|| format!("backing up {:?} to {:?}", self.file, backup))?;
            }

            let tmp = sibling(&self.file, "forget-me.tmp");
            tokio::fs::write(&tmp, rewritten)
                .await
                .with_context(|| format!("writing {:?}", tmp))?;
            tokio::fs::rename(&tmp, &self.file)
                .await
                .with_context(|| format!("replacing {:?}", self.file))?;
        }

        let total = context
            .get(REPLACED_KEY)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0)
            + replaced;
        context.insert(REPLACED_KEY, total.to_string());

        Ok(TaskOutcome::Value(TaskReport::new(
            self.describe(),
            format!("{replaced} occurrence(s) replaced"),
            replaced,
        )))
    }
}

impl Task for LogRewriteTask {
    fn describe(&self) -> String {
        format!("log-file {}", self.file.display())
    }

    fn execute<'a>(
        &'a self,
        subject: &'a SubjectIdentifier,
        settings: &'a LaneSettings,
        context: &'a mut LaneContext,
    ) -> TaskFuture<'a> {
        Box::pin(self.rewrite(subject, settings, context))
    }
}

/// Match the username as a whole word where its edges are word characters.
fn username_regex(username: &str) -> anyhow::Result<Regex> {
    if username.trim().is_empty() {
        anyhow::bail!("refusing to rewrite logs for an empty username");
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = if username.starts_with(is_word) { r"\b" } else { "" };
    let end = if username.ends_with(is_word) { r"\b" } else { "" };
    Regex::new(&format!("{start}{}{end}", regex::escape(username)))
        .context("building username pattern")
}

/// Replace matches in the selected lines, keeping line endings intact.
///
/// Works on raw bytes so logs that are not valid UTF-8 pass through
/// untouched outside the replaced spans.
pub fn rewrite_lines(
    contents: &[u8],
    username: &Regex,
    line_filters: &[Regex],
    pseudonym: &str,
) -> (Vec<u8>, u64) {
    let mut out = Vec::with_capacity(contents.len());
    let mut replaced = 0u64;

    for line in contents.split_inclusive(|&b| b == b'\n') {
        let selected = line_filters.is_empty() || line_filters.iter().any(|re| re.is_match(line));
        let hits = if selected {
            username.find_iter(line).count() as u64
        } else {
            0
        };
        if hits == 0 {
            out.extend_from_slice(line);
            continue;
        }
        replaced += hits;
        out.extend_from_slice(&username.replace_all(line, NoExpand(pseudonym.as_bytes())));
    }

    (out, replaced)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
