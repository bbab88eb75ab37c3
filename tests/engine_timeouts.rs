mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use forget_me::engine::{ExecutionEngine, LaneFailureKind};
use forget_me::task::SystemEnvironment;
use forget_me_test_utils::builders::{test_subject, SystemConfigBuilder};
use forget_me_test_utils::fake_tasks::{ExecutionLog, FakeTask, StaticDiscoverer};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn timed_out_lane_is_dropped_and_others_still_reported() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ExecutionLog::new();

        let slow = StaticDiscoverer::new(
            "slow",
            vec![
                FakeTask::ok("s1", &log),
                FakeTask::sleeping("s2", &log, Duration::from_secs(30)),
                FakeTask::ok("s3", &log),
            ],
        );
        let fast = StaticDiscoverer::new(
            "fast",
            vec![FakeTask::ok("f1", &log), FakeTask::ok("f2", &log)],
        );

        let config = SystemConfigBuilder::new()
            .with_lane("slow")
            .with_lane("fast")
            .with_source("slow", Arc::new(slow))
            .with_source("fast", Arc::new(fast))
            .with_lane_timeout(Duration::from_millis(300))
            .build();

        let engine = ExecutionEngine::new(
            Arc::new(test_subject()),
            SystemEnvironment::new("/tmp/forget-me-home"),
            Arc::new(config),
        );

        let started = Instant::now();
        let result = engine.execute().await?;
        assert!(started.elapsed() < Duration::from_secs(3));

        assert_eq!(result.lane_entries("slow").count(), 0);
        assert_eq!(result.lane_entries("fast").count(), 2);
        assert_eq!(result.completed_lanes(), ["fast"]);

        assert_eq!(result.failures().len(), 1);
        assert_eq!(result.failures()[0].lane, "slow");
        assert_eq!(result.failures()[0].kind, LaneFailureKind::TimedOut);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn cancelled_lane_does_not_run_remaining_tasks() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ExecutionLog::new();

        let slow = StaticDiscoverer::new(
            "slow",
            vec![
                FakeTask::sleeping("s1", &log, Duration::from_secs(30)),
                FakeTask::ok("s2", &log),
            ],
        );

        let config = SystemConfigBuilder::new()
            .with_lane("slow")
            .with_source("slow", Arc::new(slow))
            .with_lane_timeout(Duration::from_millis(200))
            .build();

        let engine = ExecutionEngine::new(
            Arc::new(test_subject()),
            SystemEnvironment::new("/tmp/forget-me-home"),
            Arc::new(config),
        );

        let result = engine.execute().await?;
        assert!(result.is_empty());

        // Give the lane thread a moment to observe the cancellation.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(log.labels_in("slow"), vec!["s1"]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn panicking_task_is_reported_as_lane_failure() -> TestResult {
    with_timeout(async {
        init_tracing();
        let log = ExecutionLog::new();

        let bad = StaticDiscoverer::new(
            "bad",
            vec![FakeTask::ok("b1", &log), FakeTask::panicking("b2", &log)],
        );
        let good = StaticDiscoverer::new("good", vec![FakeTask::ok("g1", &log)]);

        let config = SystemConfigBuilder::new()
            .with_lane("bad")
            .with_lane("good")
            .with_source("bad", Arc::new(bad))
            .with_source("good", Arc::new(good))
            .build();

        let engine = ExecutionEngine::new(
            Arc::new(test_subject()),
            SystemEnvironment::new("/tmp/forget-me-home"),
            Arc::new(config),
        );

        let result = engine.execute().await?;

        assert_eq!(result.len(), 1);
        assert_eq!(result.completed_lanes(), ["good"]);
        assert_eq!(result.failures()[0].lane, "bad");
        assert_eq!(result.failures()[0].kind, LaneFailureKind::Panicked);
        Ok(())
    })
    .await
}
