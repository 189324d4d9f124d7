//! In-memory build job registry.
//!
//! Every mutation runs under the write lock and publishes its event before the
//! lock is released, so the events for one job always arrive in the order the
//! mutations happened, even with several workers touching the same job.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{BuildConfig, BuildEvent, BuildEventKind, BuildJob, BuildStatus, TransitionError};
use crate::services::EventBroadcaster;

/// Errors from [`JobStore::apply`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("build {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Shared registry of build jobs, newest insertions last.
#[derive(Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<IndexMap<Uuid, BuildJob>>>,
    broadcaster: EventBroadcaster,
}

impl JobStore {
    pub fn new(broadcaster: EventBroadcaster) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(IndexMap::new())),
            broadcaster,
        }
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }

    /// Validate the config, insert a pending job and announce it.
    pub fn create(&self, config: BuildConfig) -> AppResult<BuildJob> {
        if config.device_name().is_none() {
            return Err(AppError::Validation("device is required".to_string()));
        }

        let job = BuildJob::new(config);
        let mut jobs = self.jobs.write();
        jobs.insert(job.id, job.clone());
        self.broadcaster
            .publish(BuildEvent::new(BuildEventKind::Created, job.clone()));
        Ok(job)
    }

    pub fn get(&self, id: Uuid) -> Option<BuildJob> {
        self.jobs.read().get(&id).cloned()
    }

    /// All jobs, most recently created first.
    pub fn list(&self) -> Vec<BuildJob> {
        self.jobs.read().values().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    /// Number of jobs per status. Statuses with no jobs are reported as zero.
    pub fn status_counts(&self) -> HashMap<BuildStatus, usize> {
        let mut counts: HashMap<BuildStatus, usize> =
            BuildStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for job in self.jobs.read().values() {
            *counts.entry(job.status).or_default() += 1;
        }
        counts
    }

    /// Run a state-machine mutation against a job and publish `kind` with the
    /// resulting snapshot. Nothing is published when the mutation is refused.
    pub fn apply<F>(&self, id: Uuid, kind: BuildEventKind, mutate: F) -> Result<BuildJob, StoreError>
    where
        F: FnOnce(&mut BuildJob) -> Result<(), TransitionError>,
    {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        mutate(job)?;
        let snapshot = job.clone();
        self.broadcaster
            .publish(BuildEvent::new(kind, snapshot.clone()));
        Ok(snapshot)
    }

    /// Drop terminal jobs that finished before `cutoff`. Returns how many were removed.
    pub fn evict_terminal_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, job| {
            !(job.is_terminal() && job.completed_at.is_some_and(|done| done < cutoff))
        });
        before - jobs.len()
    }
}
