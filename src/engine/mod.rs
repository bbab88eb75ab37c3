// src/engine/mod.rs

//! Execution engine for forget-me.
//!
//! This module ties together:
//! - the per-lane [`LanePipeline`] (tasks run strictly in order, first error
//!   aborts the lane)
//! - the [`ExecutionEngine`] that runs one pipeline per lane on a dedicated
//!   thread and joins them under a timeout
//! - the [`AggregatedResult`] that collects outcomes of every lane that
//!   finished successfully
//!
//! Lanes share nothing mutable: the subject and lane settings are immutable
//! and behind `Arc`, each lane gets a fresh `LaneContext`, and merging only
//! happens on the task awaiting the lanes.

/// Canonical lane name type used throughout the engine.
pub type LaneName = String;

pub mod executor;
pub mod pipeline;
pub mod result;

pub use executor::{ExecutionEngine, LanePlan, LANE_THREAD_PREFIX};
pub use pipeline::LanePipeline;
pub use result::{
    AggregatedResult, LaneFailure, LaneFailureKind, OutcomeEntry, TaskOutcome, TaskReport,
};
