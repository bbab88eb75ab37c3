mod common;
use crate::common::{init_tracing, with_timeout, write_file};

use std::error::Error;
use std::fs;

use tempfile::TempDir;

use forget_me::engine::LaneFailureKind;
use forget_me::errors::ForgetMeError;
use forget_me::task::DiscovererRegistry;
use forget_me::types::SubjectIdentifier;
use forget_me_test_utils::builders::test_subject;

type TestResult = Result<(), Box<dyn Error>>;

const CONFIG: &str = r#"
[config]
lanes = ["log-file", "file-delete", "sql"]
lane_timeout = "30s"

[lane.log-file]
backup = "yes"

[[source]]
path = "logs"
reader = "log-file"

[[source]]
path = "data"
reader = "file-delete"

[source.properties]
pattern = "${username}.*"

[[source]]
path = "sql"
reader = "sql"

[source.properties]
query_type = "domain-appended"
"#;

fn seeded_home() -> TempDir {
    let home = TempDir::new().unwrap();
    write_file(home.path(), "config.toml", CONFIG);
    write_file(home.path(), "logs/a.log", "alice signed in\n");
    write_file(home.path(), "logs/b.log", "nothing to see\n");
    write_file(home.path(), "data/alice.json", "{}");
    write_file(home.path(), "data/bob.json", "{}");
    write_file(
        home.path(),
        "sql/um.sql",
        "DELETE FROM UM_USER WHERE UM_USER_NAME = ${username};\n",
    );
    home
}

#[tokio::test]
async fn process_runs_every_builtin_lane() -> TestResult {
    with_timeout(async {
        init_tracing();
        let home = seeded_home();
        let registry = DiscovererRegistry::with_builtins();

        let result = forget_me::process(home.path(), test_subject(), &registry).await?;

        assert!(result.failures().is_empty(), "{:?}", result.failures());
        assert_eq!(result.completed_lanes(), ["log-file", "file-delete", "sql"]);
        assert_eq!(result.lane_entries("log-file").count(), 2);
        assert_eq!(result.lane_entries("file-delete").count(), 1);
        assert_eq!(result.lane_entries("sql").count(), 1);

        assert_eq!(
            fs::read_to_string(home.path().join("logs/a.log"))?,
            "pseudo-alice signed in\n"
        );
        assert!(home.path().join("logs/a.log.bak").exists());
        assert!(!home.path().join("logs/b.log.bak").exists());
        assert!(!home.path().join("data/alice.json").exists());
        assert!(home.path().join("data/bob.json").exists());

        let script = fs::read_to_string(home.path().join("generated-sql/um.sql"))?;
        assert!(script.contains("UM_USER_NAME = 'PRIMARY/alice'"));

        let report = forget_me::report::render(&result);
        assert!(report.contains("Completed lanes: log-file, file-delete, sql"));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn a_failing_lane_does_not_affect_the_others() -> TestResult {
    with_timeout(async {
        init_tracing();
        let home = seeded_home();
        // The backup target is a directory, so the third log task fails.
        write_file(home.path(), "logs/c.log", "alice again\n");
        fs::create_dir_all(home.path().join("logs/c.log.bak"))?;

        let registry = DiscovererRegistry::with_builtins();
        let result = forget_me::process(home.path(), test_subject(), &registry).await?;

        assert_eq!(result.completed_lanes(), ["file-delete", "sql"]);
        assert_eq!(result.lane_entries("log-file").count(), 0);
        assert_eq!(result.failures().len(), 1);
        assert_eq!(result.failures()[0].lane, "log-file");
        assert!(matches!(result.failures()[0].kind, LaneFailureKind::Failed(_)));
        assert!(!home.path().join("data/alice.json").exists());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn broken_source_aborts_before_any_lane_runs() -> TestResult {
    with_timeout(async {
        init_tracing();
        let home = seeded_home();
        fs::remove_dir_all(home.path().join("sql"))?;

        let registry = DiscovererRegistry::with_builtins();
        let err = forget_me::process(home.path(), test_subject(), &registry)
            .await
            .unwrap_err();

        match err {
            ForgetMeError::Discovery { lane, location, .. } => {
                assert_eq!(lane, "sql");
                assert!(location.ends_with("sql"));
            }
            other => panic!("expected discovery error, got {other:?}"),
        }

        // Nothing was touched.
        assert_eq!(
            fs::read_to_string(home.path().join("logs/a.log"))?,
            "alice signed in\n"
        );
        assert!(home.path().join("data/alice.json").exists());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn empty_username_is_rejected_before_anything_runs() -> TestResult {
    with_timeout(async {
        init_tracing();
        let home = seeded_home();
        let registry = DiscovererRegistry::with_builtins();
        let nobody = SubjectIdentifier::with_pseudonym(" ", "PRIMARY", "-1234", "PSEUDO");

        let err = forget_me::process(home.path(), nobody, &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, ForgetMeError::ConfigError(ref msg) if msg.contains("username")));

        assert_eq!(
            fs::read_to_string(home.path().join("logs/b.log"))?,
            "nothing to see\n"
        );
        assert!(home.path().join("data/bob.json").exists());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn missing_home_is_a_config_error() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("does-not-exist");
    let registry = DiscovererRegistry::with_builtins();

    let err = forget_me::process(&missing, test_subject(), &registry)
        .await
        .unwrap_err();
    assert!(matches!(err, ForgetMeError::ConfigError(_)));
}
