// src/report.rs

//! Plain-text rendering of an [`AggregatedResult`].

use std::fmt::Write;

use crate::engine::{AggregatedResult, TaskOutcome};

pub fn render(result: &AggregatedResult) -> String {
    let mut out = String::new();

    if result.is_empty() {
        out.push_str("No task outcomes.\n");
    }

    for entry in result.entries() {
        let detail = match &entry.outcome {
            TaskOutcome::Value(report) => report.summary.as_str(),
            TaskOutcome::NoResult => "no result",
        };
        let _ = writeln!(
            out,
            "[{}] #{} {}: {}",
            entry.lane, entry.position, entry.task, detail
        );
    }

    if !result.completed_lanes().is_empty() {
        let _ = writeln!(out, "Completed lanes: {}", result.completed_lanes().join(", "));
    }

    for failure in result.failures() {
        let _ = writeln!(out, "Lane '{}' {}", failure.lane, failure.kind);
    }

    out
}
