// src/engine/executor.rs

//! Lane-per-thread execution engine.
//!
//! For every configured lane the engine:
//! 1. asks the discoverers for the lane's tasks (all lanes are discovered
//!    before any lane starts, so a broken source aborts the run cleanly),
//! 2. starts a dedicated OS thread named `lane-<name>` running a
//!    current-thread Tokio runtime with that lane's [`LanePipeline`],
//! 3. waits for each lane in submission order, bounded by the lane timeout.
//!
//! Lane failures, panics and timeouts are logged and recorded as
//! [`LaneFailure`](super::LaneFailure)s; the lane contributes no outcomes.
//! On timeout the lane is told to cancel, which drops its pipeline at the
//! next await point.

use std::fmt;
use std::sync::Arc;
use std::thread;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::SystemConfig;
use crate::errors::{ForgetMeError, LaneError, Result};
use crate::task::{LaneContext, SystemEnvironment, Task};
use crate::types::{LaneSettings, SubjectIdentifier};

use super::pipeline::LanePipeline;
use super::result::{AggregatedResult, LaneFailureKind};
use super::LaneName;

/// Prefix for lane thread names.
pub const LANE_THREAD_PREFIX: &str = "lane-";

type LaneOutcome = std::result::Result<AggregatedResult, LaneError>;

/// Tasks discovered for one lane, ready to be turned into a pipeline.
#[derive(Debug, Clone)]
pub struct LanePlan {
    pub lane: LaneName,
    pub settings: Arc<LaneSettings>,
    pub tasks: Vec<Arc<dyn Task>>,
}

/// Handle to a running lane thread.
struct LaneHandle {
    lane: LaneName,
    result_rx: oneshot::Receiver<LaneOutcome>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl LaneHandle {
    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel_tx.take() {
            if cancel.send(()).is_err() {
                debug!(lane = %self.lane, "lane already finished while cancelling");
            }
        }
    }
}

pub struct ExecutionEngine {
    subject: Arc<SubjectIdentifier>,
    env: SystemEnvironment,
    config: Arc<SystemConfig>,
}

impl fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("subject", &self.subject)
            .field("lanes", &self.config.lanes())
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    pub fn new(
        subject: Arc<SubjectIdentifier>,
        env: SystemEnvironment,
        config: Arc<SystemConfig>,
    ) -> Self {
        Self {
            subject,
            env,
            config,
        }
    }

    /// Discover the tasks of every lane without running anything.
    ///
    /// Any discoverer error is fatal and names the lane and source.
    pub fn plan(&self) -> Result<Vec<LanePlan>> {
        self.config
            .lanes()
            .iter()
            .map(|lane| -> Result<LanePlan> {
                Ok(LanePlan {
                    lane: lane.clone(),
                    settings: self.config.settings_for(lane),
                    tasks: self.discover_tasks(lane)?,
                })
            })
            .collect()
    }

    fn discover_tasks(&self, lane: &str) -> Result<Vec<Arc<dyn Task>>> {
        let mut tasks = Vec::new();

        for source in self.config.sources_for(lane) {
            let found = source
                .discoverer
                .discover(&source.location, &source.properties, &self.env)
                .map_err(|err| ForgetMeError::Discovery {
                    lane: lane.to_string(),
                    location: source.location.clone(),
                    source: err,
                })?;

            debug!(
                lane,
                location = ?source.location,
                count = found.len(),
                "discovered tasks from source"
            );
            tasks.extend(found);
        }

        Ok(tasks)
    }

    /// Run all lanes and merge whatever finished successfully.
    ///
    /// Only discovery errors are returned; lane failures end up in
    /// [`AggregatedResult::failures`].
    pub async fn execute(&self) -> Result<AggregatedResult> {
        let plans = self.plan()?;
        info!(
            subject = %self.subject,
            lanes = plans.len(),
            "starting lanes"
        );

        let mut result = AggregatedResult::new();
        let mut handles = Vec::with_capacity(plans.len());

        for plan in plans {
            let lane = plan.lane.clone();
            match self.start_lane(plan) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    error!(lane = %lane, error = %e, "failed to start lane thread");
                    result.record_failure(lane, LaneFailureKind::SpawnFailed(e.to_string()));
                }
            }
        }

        self.wait_for_completion(handles, &mut result).await;
        Ok(result)
    }

    fn start_lane(&self, plan: LanePlan) -> std::io::Result<LaneHandle> {
        let context = LaneContext::new(plan.lane.clone(), &self.env);
        let pipeline = LanePipeline::new(
            plan.lane.clone(),
            Arc::clone(&self.subject),
            plan.settings,
            plan.tasks,
        );

        let (result_tx, result_rx) = oneshot::channel::<LaneOutcome>();
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

        debug!(lane = %plan.lane, tasks = pipeline.len(), "spawning lane thread");
        thread::Builder::new()
            .name(format!("{LANE_THREAD_PREFIX}{}", plan.lane))
            .spawn(move || run_lane(pipeline, context, result_tx, cancel_rx))?;

        Ok(LaneHandle {
            lane: plan.lane,
            result_rx,
            cancel_tx: Some(cancel_tx),
        })
    }

    /// Wait for every lane, one at a time, each bounded by the lane timeout.
    async fn wait_for_completion(&self, handles: Vec<LaneHandle>, result: &mut AggregatedResult) {
        let timeout = self.config.lane_timeout();

        for mut handle in handles {
            let waited = tokio::time::timeout(timeout, &mut handle.result_rx).await;
            match waited {
                Ok(Ok(Ok(lane_result))) => {
                    info!(
                        lane = %handle.lane,
                        outcomes = lane_result.len(),
                        "lane completed"
                    );
                    result.merge(handle.lane, lane_result);
                }
                Ok(Ok(Err(err))) => {
                    error!(lane = %handle.lane, error = %err, "lane failed; discarding its outcomes");
                    result.record_failure(handle.lane, LaneFailureKind::Failed(err.to_string()));
                }
                Ok(Err(_)) => {
                    error!(lane = %handle.lane, "lane thread exited without a result");
                    result.record_failure(handle.lane, LaneFailureKind::Panicked);
                }
                Err(_) => {
                    error!(
                        lane = %handle.lane,
                        ?timeout,
                        "lane did not finish in time; cancelling"
                    );
                    handle.cancel();
                    result.record_failure(handle.lane, LaneFailureKind::TimedOut);
                }
            }
        }

        info!("all lanes have been shut down");
    }
}

/// Body of a lane thread.
fn run_lane(
    pipeline: LanePipeline,
    context: LaneContext,
    result_tx: oneshot::Sender<LaneOutcome>,
    cancel_rx: oneshot::Receiver<()>,
) {
    let lane = pipeline.lane().to_string();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(source) => {
            let _ = result_tx.send(Err(LaneError::Runtime { lane, source }));
            return;
        }
    };

    runtime.block_on(async move {
        tokio::select! {
            outcome = pipeline.run(context) => {
                if result_tx.send(outcome).is_err() {
                    debug!(lane = %lane, "engine stopped waiting; dropping lane result");
                }
            }

            cancel = cancel_rx => {
                match cancel {
                    Ok(()) => {
                        warn!(lane = %lane, "cancellation requested; abandoning remaining tasks");
                    }
                    Err(_) => {
                        debug!(lane = %lane, "engine went away; abandoning lane");
                    }
                }
            }
        }
    });
}
