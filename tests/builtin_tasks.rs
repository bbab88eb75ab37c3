mod common;
use crate::common::{init_tracing, write_file};

use std::error::Error;
use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use forget_me::engine::TaskOutcome;
use forget_me::errors::ModuleError;
use forget_me::task::sql::{render, SqlQueryType};
use forget_me::task::{
    FileDeleteDiscoverer, LaneContext, LogFileDiscoverer, SqlDiscoverer, SystemEnvironment, Task,
    TaskDiscoverer,
};
use forget_me::types::{LaneSettings, Properties, SubjectIdentifier};
use forget_me_test_utils::builders::test_subject;

type TestResult = Result<(), Box<dyn Error>>;

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn run_task(
    task: &Arc<dyn Task>,
    lane: &str,
    env: &SystemEnvironment,
    settings: &LaneSettings,
) -> anyhow::Result<TaskOutcome> {
    let subject = test_subject();
    let mut context = LaneContext::new(lane, env);
    task.execute(&subject, settings, &mut context).await
}

#[tokio::test]
async fn log_rewrite_replaces_whole_word_usernames() -> TestResult {
    init_tracing();
    let home = TempDir::new()?;
    write_file(
        home.path(),
        "logs/app.log",
        "user alice logged in\nmalice is someone else\nbye alice, alice\n",
    );
    write_file(home.path(), "logs/notes.txt", "alice\n");

    let env = SystemEnvironment::new(home.path());
    let tasks = LogFileDiscoverer.discover(&home.path().join("logs"), &Properties::new(), &env)?;
    assert_eq!(tasks.len(), 1, "only *.log files are picked up by default");

    let outcome = run_task(&tasks[0], "log-file", &env, &LaneSettings::empty("log-file")).await?;
    assert_eq!(outcome.report().map(|r| r.affected), Some(3));

    let rewritten = fs::read_to_string(home.path().join("logs/app.log"))?;
    assert_eq!(
        rewritten,
        "user pseudo-alice logged in\nmalice is someone else\nbye pseudo-alice, pseudo-alice\n"
    );
    assert_eq!(fs::read_to_string(home.path().join("logs/notes.txt"))?, "alice\n");
    assert!(!home.path().join("logs/app.log.bak").exists());
    Ok(())
}

#[tokio::test]
async fn log_rewrite_honours_line_patterns_and_backup() -> TestResult {
    init_tracing();
    let home = TempDir::new()?;
    let original = "INFO login alice\nDEBUG alice cache\n";
    write_file(home.path(), "logs/audit.log", original);

    let env = SystemEnvironment::new(home.path());
    let tasks = LogFileDiscoverer.discover(
        &home.path().join("logs"),
        &props(&[("include", "audit.*"), ("patterns", "^INFO")]),
        &env,
    )?;
    assert_eq!(tasks.len(), 1);

    let mut values = std::collections::BTreeMap::new();
    values.insert("backup".to_string(), "true".to_string());
    let settings = LaneSettings::new("log-file", values);

    run_task(&tasks[0], "log-file", &env, &settings).await?;

    assert_eq!(
        fs::read_to_string(home.path().join("logs/audit.log"))?,
        "INFO login pseudo-alice\nDEBUG alice cache\n"
    );
    assert_eq!(fs::read_to_string(home.path().join("logs/audit.log.bak"))?, original);
    Ok(())
}

#[tokio::test]
async fn log_rewrite_keeps_bytes_that_are_not_utf8() -> TestResult {
    init_tracing();
    let home = TempDir::new()?;
    fs::create_dir_all(home.path().join("logs"))?;
    let mut original = b"alice \xff\xfe raw\n".to_vec();
    original.extend_from_slice(b"bob\n");
    fs::write(home.path().join("logs/bin.log"), &original)?;

    let env = SystemEnvironment::new(home.path());
    let tasks = LogFileDiscoverer.discover(&home.path().join("logs"), &Properties::new(), &env)?;
    let outcome = run_task(&tasks[0], "log-file", &env, &LaneSettings::empty("log-file")).await?;
    assert_eq!(outcome.report().map(|r| r.affected), Some(1));

    let rewritten = fs::read(home.path().join("logs/bin.log"))?;
    assert_eq!(rewritten, b"pseudo-alice \xff\xfe raw\nbob\n".to_vec());
    Ok(())
}

#[tokio::test]
async fn tasks_refuse_an_empty_username() -> TestResult {
    init_tracing();
    let home = TempDir::new()?;
    write_file(home.path(), "logs/app.log", "hello\n");
    write_file(home.path(), "data/keep.json", "{}");

    let nobody = SubjectIdentifier::with_pseudonym("", "PRIMARY", "-1234", "PSEUDO");
    let env = SystemEnvironment::new(home.path());
    let settings = LaneSettings::empty("any");

    let logs = LogFileDiscoverer.discover(&home.path().join("logs"), &Properties::new(), &env)?;
    let mut context = LaneContext::new("log-file", &env);
    assert!(logs[0].execute(&nobody, &settings, &mut context).await.is_err());
    assert_eq!(fs::read_to_string(home.path().join("logs/app.log"))?, "hello\n");

    let deletes = FileDeleteDiscoverer.discover(
        &home.path().join("data"),
        &props(&[("pattern", "${username}*")]),
        &env,
    )?;
    let mut context = LaneContext::new("file-delete", &env);
    assert!(deletes[0].execute(&nobody, &settings, &mut context).await.is_err());
    assert!(home.path().join("data/keep.json").exists());
    Ok(())
}

#[test]
fn log_discovery_rejects_bad_sources() {
    let home = TempDir::new().unwrap();
    let env = SystemEnvironment::new(home.path());

    let missing = LogFileDiscoverer.discover(&home.path().join("nope"), &Properties::new(), &env);
    assert!(matches!(missing, Err(ModuleError::Unreadable { .. })));

    let bad_regex = LogFileDiscoverer.discover(home.path(), &props(&[("patterns", "(")]), &env);
    match bad_regex {
        Err(ModuleError::InvalidProperty { name, .. }) => assert_eq!(name, "patterns"),
        other => panic!("expected InvalidProperty, got {other:?}"),
    }
}

#[tokio::test]
async fn file_delete_removes_only_the_subjects_files() -> TestResult {
    init_tracing();
    let home = TempDir::new()?;
    write_file(home.path(), "data/alice-1.json", "{}");
    write_file(home.path(), "data/alice-2.json", "{}");
    write_file(home.path(), "data/bob-1.json", "{}");

    let env = SystemEnvironment::new(home.path());
    let tasks = FileDeleteDiscoverer.discover(
        &home.path().join("data"),
        &props(&[("pattern", "${username}-*.json")]),
        &env,
    )?;
    assert_eq!(tasks.len(), 1);

    let settings = LaneSettings::empty("file-delete");
    let first = run_task(&tasks[0], "file-delete", &env, &settings).await?;
    assert_eq!(first.report().map(|r| r.affected), Some(2));
    assert!(!home.path().join("data/alice-1.json").exists());
    assert!(!home.path().join("data/alice-2.json").exists());
    assert!(home.path().join("data/bob-1.json").exists());

    let second = run_task(&tasks[0], "file-delete", &env, &settings).await?;
    assert_eq!(second, TaskOutcome::NoResult);
    Ok(())
}

#[test]
fn file_delete_requires_a_pattern_and_a_directory() {
    let home = TempDir::new().unwrap();
    write_file(home.path(), "plain.txt", "x");
    let env = SystemEnvironment::new(home.path());

    let no_pattern = FileDeleteDiscoverer.discover(home.path(), &Properties::new(), &env);
    assert!(matches!(no_pattern, Err(ModuleError::MissingProperty(ref p)) if p == "pattern"));

    let not_dir = FileDeleteDiscoverer.discover(
        &home.path().join("plain.txt"),
        &props(&[("pattern", "*")]),
        &env,
    );
    assert!(matches!(not_dir, Err(ModuleError::InvalidProperty { .. })));
}

#[test]
fn sql_username_follows_query_type() {
    let primary = test_subject();
    let tenant = SubjectIdentifier::with_pseudonym("bob", "LDAP", "wso2.com", "p-bob");
    let super_by_name =
        SubjectIdentifier::with_pseudonym("carol", "PRIMARY", "carbon.super", "p-carol");

    assert_eq!(SqlQueryType::DomainAppended.username_value(&tenant), "LDAP/bob");
    assert_eq!(SqlQueryType::DomainSeparated.username_value(&tenant), "bob");
    assert_eq!(
        SqlQueryType::TenantSpecificAppended.username_value(&tenant),
        "bob@wso2.com"
    );
    assert_eq!(
        SqlQueryType::TenantSpecificAppended.username_value(&primary),
        "alice"
    );
    assert_eq!(
        SqlQueryType::TenantSpecificAppended.username_value(&super_by_name),
        "carol"
    );
    assert_eq!(
        SqlQueryType::TenantAppended.username_value(&primary),
        "alice@-1234"
    );

    assert_eq!(
        "tenant_specific_appended".parse::<SqlQueryType>(),
        Ok(SqlQueryType::TenantSpecificAppended)
    );
    assert!("by-email".parse::<SqlQueryType>().is_err());
}

#[test]
fn sql_render_quotes_and_escapes_literals() {
    let subject = SubjectIdentifier::with_pseudonym("o'brien", "PRIMARY", "-1234", "p-1");
    let rendered = render(
        "DELETE FROM UM_USER WHERE UM_USER_NAME = ${username} AND DOMAIN = ${userStoreDomain};",
        SqlQueryType::DomainSeparated,
        &subject,
    );
    assert_eq!(
        rendered,
        "DELETE FROM UM_USER WHERE UM_USER_NAME = 'o''brien' AND DOMAIN = 'PRIMARY';"
    );
}

#[test]
fn sql_render_does_not_expand_placeholders_inside_values() {
    let subject =
        SubjectIdentifier::with_pseudonym("bob${pseudonym}", "PRIMARY", "-1234", "P");
    let rendered = render(
        "DELETE FROM T WHERE U = ${username} AND X = ${unknown} AND P = ${pseudonym}; -- ${",
        SqlQueryType::DomainSeparated,
        &subject,
    );
    assert_eq!(
        rendered,
        "DELETE FROM T WHERE U = 'bob${pseudonym}' AND X = ${unknown} AND P = 'P'; -- ${"
    );
}

#[tokio::test]
async fn sql_task_writes_rendered_script() -> TestResult {
    init_tracing();
    let home = TempDir::new()?;
    write_file(
        home.path(),
        "sql/identity.sql",
        "UPDATE IDN_AUTH SET USER_NAME = ${pseudonym} WHERE USER_NAME = ${username};\n\
         DELETE FROM IDN_SESSION WHERE TENANT = ${tenantDomain};\n",
    );
    write_file(home.path(), "sql/README", "not a template");

    let env = SystemEnvironment::new(home.path());
    let tasks = SqlDiscoverer.discover(
        &home.path().join("sql"),
        &props(&[("query_type", "tenant-appended"), ("output", "out")]),
        &env,
    )?;
    assert_eq!(tasks.len(), 1);

    let outcome = run_task(&tasks[0], "sql", &env, &LaneSettings::empty("sql")).await?;
    assert_eq!(outcome.report().map(|r| r.affected), Some(2));

    let script = fs::read_to_string(home.path().join("out/identity.sql"))?;
    assert!(script.contains("USER_NAME = 'pseudo-alice' WHERE USER_NAME = 'alice@-1234'"));
    assert!(script.contains("TENANT = '-1234'"));
    Ok(())
}
