use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use forget_me::engine::{TaskOutcome, TaskReport};
use forget_me::errors::ModuleError;
use forget_me::task::{LaneContext, SystemEnvironment, Task, TaskDiscoverer, TaskFuture};
use forget_me::types::{LaneSettings, Properties, SubjectIdentifier};

/// Context key fake tasks append their label to.
pub const TRAIL_KEY: &str = "trail";

/// One fake task execution as observed from inside the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub label: String,
    pub lane: String,
    pub thread: Option<String>,
    /// Value of [`TRAIL_KEY`] in the lane context before this task ran.
    pub trail_before: Option<String>,
}

/// Shared log of fake task executions.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    records: Arc<Mutex<Vec<ExecutionRecord>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.label).collect()
    }

    /// Labels executed in `lane`, in execution order.
    pub fn labels_in(&self, lane: &str) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.lane == lane)
            .map(|r| r.label)
            .collect()
    }

    fn record(&self, label: &str, context: &mut LaneContext) {
        let trail_before = context.get(TRAIL_KEY).map(str::to_string);
        let trail = match &trail_before {
            Some(prev) => format!("{prev},{label}"),
            None => label.to_string(),
        };
        context.insert(TRAIL_KEY, trail);

        self.records.lock().unwrap().push(ExecutionRecord {
            label: label.to_string(),
            lane: context.lane().to_string(),
            thread: std::thread::current().name().map(str::to_string),
            trail_before,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Succeed,
    NoResult,
    Fail,
    Panic,
    Sleep(Duration),
}

/// Configurable fake task that records every execution in an [`ExecutionLog`].
#[derive(Debug, Clone)]
pub struct FakeTask {
    label: String,
    log: ExecutionLog,
    behaviour: Behaviour,
}

impl FakeTask {
    /// Succeeds with a report whose summary is the label.
    pub fn ok(label: &str, log: &ExecutionLog) -> Arc<dyn Task> {
        Self::build(label, log, Behaviour::Succeed)
    }

    /// Succeeds with [`TaskOutcome::NoResult`].
    pub fn no_result(label: &str, log: &ExecutionLog) -> Arc<dyn Task> {
        Self::build(label, log, Behaviour::NoResult)
    }

    /// Fails with an error mentioning the label.
    pub fn failing(label: &str, log: &ExecutionLog) -> Arc<dyn Task> {
        Self::build(label, log, Behaviour::Fail)
    }

    pub fn panicking(label: &str, log: &ExecutionLog) -> Arc<dyn Task> {
        Self::build(label, log, Behaviour::Panic)
    }

    /// Sleeps (asynchronously) for `duration`, then succeeds.
    pub fn sleeping(label: &str, log: &ExecutionLog, duration: Duration) -> Arc<dyn Task> {
        Self::build(label, log, Behaviour::Sleep(duration))
    }

    fn build(label: &str, log: &ExecutionLog, behaviour: Behaviour) -> Arc<dyn Task> {
        Arc::new(Self {
            label: label.to_string(),
            log: log.clone(),
            behaviour,
        })
    }
}

impl Task for FakeTask {
    fn describe(&self) -> String {
        format!("fake {}", self.label)
    }

    fn execute<'a>(
        &'a self,
        _subject: &'a SubjectIdentifier,
        _settings: &'a LaneSettings,
        context: &'a mut LaneContext,
    ) -> TaskFuture<'a> {
        Box::pin(async move {
            self.log.record(&self.label, context);

            match self.behaviour {
                Behaviour::Succeed => {}
                Behaviour::NoResult => return Ok(TaskOutcome::NoResult),
                Behaviour::Fail => anyhow::bail!("{} failed", self.label),
                Behaviour::Panic => panic!("{} panicked", self.label),
                Behaviour::Sleep(duration) => tokio::time::sleep(duration).await,
            }

            Ok(TaskOutcome::Value(TaskReport::new(
                self.describe(),
                self.label.clone(),
                1,
            )))
        })
    }
}

/// Discoverer returning a fixed list of tasks for any location.
#[derive(Debug, Clone)]
pub struct StaticDiscoverer {
    lane_type: String,
    tasks: Vec<Arc<dyn Task>>,
    calls: Arc<AtomicUsize>,
}

impl StaticDiscoverer {
    pub fn new(lane_type: &str, tasks: Vec<Arc<dyn Task>>) -> Self {
        Self {
            lane_type: lane_type.to_string(),
            tasks,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `discover` calls so far (shared across clones).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TaskDiscoverer for StaticDiscoverer {
    fn lane_type(&self) -> &str {
        &self.lane_type
    }

    fn discover(
        &self,
        _location: &Path,
        _properties: &Properties,
        _env: &SystemEnvironment,
    ) -> Result<Vec<Arc<dyn Task>>, ModuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tasks.clone())
    }
}

/// Discoverer that always reports a malformed source.
#[derive(Debug, Clone)]
pub struct FailingDiscoverer {
    lane_type: String,
}

impl FailingDiscoverer {
    pub fn new(lane_type: &str) -> Self {
        Self {
            lane_type: lane_type.to_string(),
        }
    }
}

impl TaskDiscoverer for FailingDiscoverer {
    fn lane_type(&self) -> &str {
        &self.lane_type
    }

    fn discover(
        &self,
        _location: &Path,
        _properties: &Properties,
        _env: &SystemEnvironment,
    ) -> Result<Vec<Arc<dyn Task>>, ModuleError> {
        Err(ModuleError::InvalidProperty {
            name: "source".to_string(),
            reason: "malformed instructions".to_string(),
        })
    }
}
