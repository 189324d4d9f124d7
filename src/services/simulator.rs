//! Step simulator driving a build job through its phase plan.
//!
//! The job's own status is the cancellation flag: each phase boundary is a
//! store mutation that the state machine refuses once the job has left
//! `running`, at which point the loop stops without touching the job again.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{BuildEventKind, BuildJob, BuildStatus};
use crate::services::job_store::{JobStore, StoreError};
use crate::services::phases::{Phase, PhasePlan};

/// Error raised while executing a phase. Recorded on the job, never returned to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{phase}: {message}")]
pub struct SimulationError {
    pub phase: String,
    pub message: String,
}

impl SimulationError {
    pub fn new(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            message: message.into(),
        }
    }
}

/// Executes the body of one phase.
#[async_trait]
pub trait PhaseRunner: Send + Sync {
    async fn run_phase(&self, job: &BuildJob, phase: &Phase) -> Result<(), SimulationError>;
}

/// Runner that just waits out the phase duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimedPhaseRunner;

#[async_trait]
impl PhaseRunner for TimedPhaseRunner {
    async fn run_phase(&self, _job: &BuildJob, phase: &Phase) -> Result<(), SimulationError> {
        if !phase.duration.is_zero() {
            tokio::time::sleep(phase.duration).await;
        }
        Ok(())
    }
}

/// How a simulation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationOutcome {
    Completed,
    Failed,
    /// The job left `running` (or never got there) before the plan finished.
    Stopped(BuildStatus),
    /// The job disappeared from the store.
    Missing,
}

/// Drives jobs through phase plans.
#[derive(Clone)]
pub struct StepSimulator {
    store: JobStore,
    runner: Arc<dyn PhaseRunner>,
}

impl StepSimulator {
    pub fn new(store: JobStore, runner: Arc<dyn PhaseRunner>) -> Self {
        Self { store, runner }
    }

    /// Run the whole plan for `job_id`, returning how it ended.
    pub async fn run(&self, job_id: Uuid, plan: &PhasePlan) -> SimulationOutcome {
        if let Err(e) = self
            .store
            .apply(job_id, BuildEventKind::Updated, BuildJob::start)
        {
            return self.stopped(job_id, e);
        }
        info!(build_job_id = %job_id, phases = plan.len(), "Build started");

        for (index, phase) in plan.phases().iter().enumerate() {
            let job = match self.store.apply(job_id, BuildEventKind::Updated, |job| {
                job.begin_phase(&phase.name)
            }) {
                Ok(job) => job,
                Err(e) => return self.stopped(job_id, e),
            };
            debug!(build_job_id = %job_id, phase = %phase.name, "Phase started");

            let result = AssertUnwindSafe(self.runner.run_phase(&job, phase))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(SimulationError::new(&phase.name, panic_message(payload.as_ref())))
                });
            if let Err(e) = result {
                return self.fail(job_id, &e);
            }

            let progress = plan.progress_after(index + 1);
            if let Err(e) = self.store.apply(job_id, BuildEventKind::Updated, |job| {
                job.finish_phase(&phase.name, progress)
            }) {
                return self.stopped(job_id, e);
            }
        }

        match self
            .store
            .apply(job_id, BuildEventKind::Completed, BuildJob::complete)
        {
            Ok(_) => SimulationOutcome::Completed,
            Err(e) => self.stopped(job_id, e),
        }
    }

    fn fail(&self, job_id: Uuid, error: &SimulationError) -> SimulationOutcome {
        let message = error.to_string();
        match self
            .store
            .apply(job_id, BuildEventKind::Failed, |job| job.fail(&message))
        {
            Ok(_) => {
                warn!(build_job_id = %job_id, error = %message, "Build phase failed");
                SimulationOutcome::Failed
            }
            Err(e) => self.stopped(job_id, e),
        }
    }

    fn stopped(&self, job_id: Uuid, error: StoreError) -> SimulationOutcome {
        match error {
            StoreError::NotFound(_) => {
                warn!(build_job_id = %job_id, "Build vanished during simulation");
                SimulationOutcome::Missing
            }
            StoreError::Transition(e) => {
                let status = self
                    .store
                    .get(job_id)
                    .map(|job| job.status)
                    .unwrap_or(BuildStatus::Cancelled);
                debug!(build_job_id = %job_id, reason = %e, "Simulation stopped");
                SimulationOutcome::Stopped(status)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("phase panicked: {detail}")
}
