//! Build operations exposed to the HTTP layer.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{BuildConfig, BuildEventKind, BuildJob, BuildStatus};
use crate::services::job_store::JobStore;
use crate::services::phases::PhaseCatalog;
use crate::services::simulator::{PhaseRunner, StepSimulator, TimedPhaseRunner};

/// Submits, cancels and looks up builds. One simulator task is spawned per submitted job.
#[derive(Clone)]
pub struct BuildService {
    store: JobStore,
    simulator: StepSimulator,
    catalog: Arc<PhaseCatalog>,
}

impl BuildService {
    /// Service with the timed runner.
    pub fn new(store: JobStore, catalog: PhaseCatalog) -> Self {
        Self::with_runner(store, catalog, Arc::new(TimedPhaseRunner))
    }

    pub fn with_runner(store: JobStore, catalog: PhaseCatalog, runner: Arc<dyn PhaseRunner>) -> Self {
        Self {
            simulator: StepSimulator::new(store.clone(), runner),
            store,
            catalog: Arc::new(catalog),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Create a pending job and schedule its simulation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit_build(&self, config: BuildConfig) -> AppResult<BuildJob> {
        let job = self.store.create(config)?;
        let plan = self.catalog.plan_for_config(&job.config);
        let skipped = self.catalog.plan_for(job.kind).len() - plan.len();

        info!(
            build_job_id = %job.id,
            kind = %job.kind,
            device = job.config.device_name().unwrap_or_default(),
            phases = plan.len(),
            skipped,
            "Build submitted"
        );

        let simulator = self.simulator.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            let outcome = simulator.run(job_id, &plan).await;
            debug!(build_job_id = %job_id, outcome = ?outcome, "Simulation finished");
        });

        Ok(job)
    }

    /// Cancel a pending or running build. False if unknown or already finished.
    pub fn cancel_build(&self, id: Uuid) -> bool {
        match self
            .store
            .apply(id, BuildEventKind::Cancelled, BuildJob::cancel)
        {
            Ok(_) => {
                info!(build_job_id = %id, "Build cancelled");
                true
            }
            Err(_) => false,
        }
    }

    pub fn get_build(&self, id: Uuid) -> AppResult<BuildJob> {
        self.store
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Build {}", id)))
    }

    /// All builds, newest first.
    pub fn list_builds(&self) -> Vec<BuildJob> {
        self.store.list()
    }

    /// Builds in one status, newest first.
    pub fn list_builds_with_status(&self, status: BuildStatus) -> Vec<BuildJob> {
        self.store
            .list()
            .into_iter()
            .filter(|job| job.status == status)
            .collect()
    }
}
