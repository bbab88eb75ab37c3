// src/engine/pipeline.rs

//! Sequential execution of one lane's tasks.

use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::LaneError;
use crate::task::{LaneContext, Task};
use crate::types::{LaneSettings, SubjectIdentifier};

use super::result::{AggregatedResult, OutcomeEntry};
use super::LaneName;

/// Runs a lane's tasks strictly in list order.
///
/// The first failing task aborts the pipeline; outcomes gathered so far are
/// dropped together with it.
#[derive(Debug, Clone)]
pub struct LanePipeline {
    lane: LaneName,
    subject: Arc<SubjectIdentifier>,
    settings: Arc<LaneSettings>,
    tasks: Vec<Arc<dyn Task>>,
}

impl LanePipeline {
    pub fn new(
        lane: LaneName,
        subject: Arc<SubjectIdentifier>,
        settings: Arc<LaneSettings>,
        tasks: Vec<Arc<dyn Task>>,
    ) -> Self {
        Self {
            lane,
            subject,
            settings,
            tasks,
        }
    }

    pub fn lane(&self) -> &str {
        &self.lane
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Execute every task with the lane's private `context`.
    pub async fn run(self, mut context: LaneContext) -> Result<AggregatedResult, LaneError> {
        let mut result = AggregatedResult::new();
        info!(lane = %self.lane, tasks = self.tasks.len(), "lane pipeline started");

        for (idx, task) in self.tasks.iter().enumerate() {
            let position = idx + 1;
            let description = task.describe();
            debug!(lane = %self.lane, position, task = %description, "executing task");

            let outcome = task
                .execute(&self.subject, &self.settings, &mut context)
                .await
                .map_err(|source| LaneError::TaskFailed {
                    lane: self.lane.clone(),
                    position,
                    task: description.clone(),
                    source,
                })?;

            result.push(OutcomeEntry {
                lane: self.lane.clone(),
                position,
                task: description,
                outcome,
            });
        }

        info!(lane = %self.lane, outcomes = result.len(), "lane pipeline finished");
        Ok(result)
    }
}
