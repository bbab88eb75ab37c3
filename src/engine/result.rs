// src/engine/result.rs

//! Outcomes of tasks and their aggregation across lanes.
//!
//! Each lane builds its own [`AggregatedResult`] on its own thread; the
//! engine merges them on the collecting task, so nothing here needs locking.

use std::fmt;

use super::LaneName;

/// What a successful task reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: String,
    pub summary: String,
    /// Number of items touched (lines, files, statements...).
    pub affected: u64,
}

impl TaskReport {
    pub fn new(task: impl Into<String>, summary: impl Into<String>, affected: u64) -> Self {
        Self {
            task: task.into(),
            summary: summary.into(),
            affected,
        }
    }
}

/// Result of a single task: a concrete value, or explicitly nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Value(TaskReport),
    NoResult,
}

impl TaskOutcome {
    pub fn report(&self) -> Option<&TaskReport> {
        match self {
            TaskOutcome::Value(report) => Some(report),
            TaskOutcome::NoResult => None,
        }
    }
}

/// A task outcome tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeEntry {
    pub lane: LaneName,
    /// 1-based position of the task within its lane.
    pub position: usize,
    pub task: String,
    pub outcome: TaskOutcome,
}

/// Why a lane contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaneFailureKind {
    /// A task returned an error.
    Failed(String),
    /// The lane did not finish within the lane timeout.
    TimedOut,
    /// The lane thread went away without reporting (a task panicked).
    Panicked,
    /// The lane thread could not be started.
    SpawnFailed(String),
}

impl fmt::Display for LaneFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneFailureKind::Failed(msg) => write!(f, "failed: {msg}"),
            LaneFailureKind::TimedOut => f.write_str("timed out"),
            LaneFailureKind::Panicked => f.write_str("panicked"),
            LaneFailureKind::SpawnFailed(msg) => write!(f, "could not start: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneFailure {
    pub lane: LaneName,
    pub kind: LaneFailureKind,
}

/// Ordered, append-only collection of task outcomes.
///
/// `failures` is a side channel for reporting; failed lanes never add
/// entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedResult {
    entries: Vec<OutcomeEntry>,
    completed_lanes: Vec<LaneName>,
    failures: Vec<LaneFailure>,
}

impl AggregatedResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: OutcomeEntry) {
        self.entries.push(entry);
    }

    /// Append a finished lane's result, keeping its internal order.
    pub fn merge(&mut self, lane: LaneName, other: AggregatedResult) {
        self.entries.extend(other.entries);
        self.failures.extend(other.failures);
        self.completed_lanes.extend(other.completed_lanes);
        self.completed_lanes.push(lane);
    }

    pub fn record_failure(&mut self, lane: LaneName, kind: LaneFailureKind) {
        self.failures.push(LaneFailure { lane, kind });
    }

    pub fn entries(&self) -> &[OutcomeEntry] {
        &self.entries
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.entries.iter().map(|e| &e.outcome)
    }

    /// Entries contributed by one lane, in execution order.
    pub fn lane_entries<'a>(&'a self, lane: &'a str) -> impl Iterator<Item = &'a OutcomeEntry> {
        self.entries.iter().filter(move |e| e.lane == lane)
    }

    pub fn completed_lanes(&self) -> &[LaneName] {
        &self.completed_lanes
    }

    pub fn failures(&self) -> &[LaneFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
