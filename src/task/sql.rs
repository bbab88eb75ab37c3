// src/task/sql.rs

//! Render redaction SQL scripts for the subject.
//!
//! Every `*.sql` file in the source directory is a template. Running a task
//! substitutes the subject into the template and writes the result to the
//! output directory; applying the script to a database is left to the
//! operator.
//!
//! Source properties:
//! - `query_type`: how the username is stored in the target tables, one of
//!   `domain-appended`, `domain-separated` (default),
//!   `tenant-specific-appended`, `tenant-appended`.
//! - `output`: directory for rendered scripts, default `<home>/generated-sql`.
//!   Relative paths are resolved against the home directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::engine::{TaskOutcome, TaskReport};
use crate::errors::ModuleError;
use crate::task::{
    compile_glob, matching_files, LaneContext, SystemEnvironment, Task, TaskDiscoverer,
    TaskFuture,
};
use crate::types::{LaneSettings, Properties, SubjectIdentifier};

pub const LANE_TYPE: &str = "sql";

const DEFAULT_OUTPUT_DIR: &str = "generated-sql";

/// How the username column is populated in the target schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlQueryType {
    /// `DOMAIN/username` in a single column.
    DomainAppended,
    /// Username and user store domain in separate columns.
    #[default]
    DomainSeparated,
    /// `username@tenant`, except for the super tenant.
    TenantSpecificAppended,
    /// `username@tenant` for every tenant.
    TenantAppended,
}

impl SqlQueryType {
    /// The value stored in the username column for `subject`.
    pub fn username_value(&self, subject: &SubjectIdentifier) -> String {
        match self {
            SqlQueryType::DomainAppended => {
                format!("{}/{}", subject.user_store_domain(), subject.username())
            }
            SqlQueryType::DomainSeparated => subject.username().to_string(),
            SqlQueryType::TenantSpecificAppended if subject.is_super_tenant() => {
                subject.username().to_string()
            }
            SqlQueryType::TenantSpecificAppended | SqlQueryType::TenantAppended => {
                format!("{}@{}", subject.username(), subject.tenant_domain())
            }
        }
    }
}

impl FromStr for SqlQueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "domain-appended" => Ok(SqlQueryType::DomainAppended),
            "domain-separated" => Ok(SqlQueryType::DomainSeparated),
            "tenant-specific-appended" => Ok(SqlQueryType::TenantSpecificAppended),
            "tenant-appended" => Ok(SqlQueryType::TenantAppended),
            other => Err(format!(
                "invalid query_type: {other} (expected domain-appended, domain-separated, \
                 tenant-specific-appended or tenant-appended)"
            )),
        }
    }
}

impl fmt::Display for SqlQueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SqlQueryType::DomainAppended => "domain-appended",
            SqlQueryType::DomainSeparated => "domain-separated",
            SqlQueryType::TenantSpecificAppended => "tenant-specific-appended",
            SqlQueryType::TenantAppended => "tenant-appended",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlDiscoverer;

impl TaskDiscoverer for SqlDiscoverer {
    fn lane_type(&self) -> &str {
        LANE_TYPE
    }

    fn discover(
        &self,
        location: &Path,
        properties: &Properties,
        env: &SystemEnvironment,
    ) -> Result<Vec<Arc<dyn Task>>, ModuleError> {
        let query_type = match properties.get("query_type") {
            Some(raw) => raw
                .parse::<SqlQueryType>()
                .map_err(|reason| ModuleError::InvalidProperty {
                    name: "query_type".to_string(),
                    reason,
                })?,
            None => SqlQueryType::default(),
        };

        let output = properties
            .get("output")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        let output_dir = if output.is_absolute() {
            output
        } else {
            env.home_dir().join(output)
        };

        let matcher = compile_glob("include", "*.sql")?;
        let templates = matching_files(location, &matcher)?;

        Ok(templates
            .into_iter()
            .map(|template| {
                Arc::new(SqlScriptTask::new(template, query_type, output_dir.clone()))
                    as Arc<dyn Task>
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct SqlScriptTask {
    template: PathBuf,
    query_type: SqlQueryType,
    output_dir: PathBuf,
}

impl SqlScriptTask {
    pub fn new(template: PathBuf, query_type: SqlQueryType, output_dir: PathBuf) -> Self {
        Self {
            template,
            query_type,
            output_dir,
        }
    }

    async fn render_to_file(&self, subject: &SubjectIdentifier) -> anyhow::Result<TaskOutcome> {
        let template = tokio::fs::read_to_string(&self.template)
            .await
            .with_context(|| format!("reading SQL template {:?}", self.template))?;

        let script = render(&template, self.query_type, subject);
        let statements = count_statements(&script);

        let file_name = self
            .template
            .file_name()
            .with_context(|| format!("template {:?} has no file name", self.template))?;
        let target = self.output_dir.join(file_name);

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating output dir {:?}", self.output_dir))?;
        tokio::fs::write(&target, script)
            .await
            .with_context(|| format!("writing SQL script {:?}", target))?;

        info!(
            template = ?self.template,
            target = ?target,
            query_type = %self.query_type,
            statements,
            "rendered redaction SQL"
        );

        Ok(TaskOutcome::Value(TaskReport::new(
            self.describe(),
            format!("{statements} statement(s) written to {}", target.display()),
            statements,
        )))
    }
}

impl Task for SqlScriptTask {
    fn describe(&self) -> String {
        format!("sql {}", self.template.display())
    }

    fn execute<'a>(
        &'a self,
        subject: &'a SubjectIdentifier,
        _settings: &'a LaneSettings,
        _context: &'a mut LaneContext,
    ) -> TaskFuture<'a> {
        Box::pin(self.render_to_file(subject))
    }
}

/// Substitute subject placeholders with quoted SQL literals.
///
/// The template is scanned once; substituted values are never re-scanned, so
/// a value that looks like a placeholder stays inside its literal. Unknown
/// placeholders are left as written.
pub fn render(template: &str, query_type: SqlQueryType, subject: &SubjectIdentifier) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            rest = &rest[start..];
            break;
        };

        let name = &after[..end];
        match placeholder_value(name, query_type, subject) {
            Some(value) => out.push_str(&quote(&value)),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

fn placeholder_value(
    name: &str,
    query_type: SqlQueryType,
    subject: &SubjectIdentifier,
) -> Option<String> {
    match name {
        "username" => Some(query_type.username_value(subject)),
        "userStoreDomain" => Some(subject.user_store_domain().to_string()),
        "tenantDomain" => Some(subject.tenant_domain().to_string()),
        "pseudonym" => Some(subject.pseudonym().to_string()),
        _ => None,
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn count_statements(script: &str) -> u64 {
    script
        .split(';')
        .filter(|stmt| !stmt.trim().is_empty())
        .count() as u64
}
