//! Build lifecycle events and the WebSocket messages derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::build_job::{BuildJob, BuildStatus};

/// Message type tag clients match on.
pub const BUILD_UPDATE_TYPE: &str = "buildUpdate";

/// Lifecycle event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildEventKind {
    Created,
    Updated,
    Completed,
    Failed,
    Cancelled,
}

impl BuildEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for BuildEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A lifecycle event carrying the full job snapshot, not a diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildEvent {
    pub kind: BuildEventKind,
    pub job: BuildJob,
    pub timestamp: DateTime<Utc>,
}

impl BuildEvent {
    /// Create a new event with the current timestamp.
    pub fn new(kind: BuildEventKind, job: BuildJob) -> Self {
        Self {
            kind,
            job,
            timestamp: Utc::now(),
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job.id
    }
}

/// Push message sent to WebSocket clients for every build event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildUpdateMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub build_job_id: Uuid,
    pub event: BuildEventKind,
    pub progress: u8,
    pub current_step: String,
    pub status: BuildStatus,
    pub logs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_files: Option<Vec<String>>,
    pub timestamp: DateTime<Utc>,
}

impl From<&BuildEvent> for BuildUpdateMessage {
    fn from(event: &BuildEvent) -> Self {
        let job = &event.job;
        Self {
            message_type: BUILD_UPDATE_TYPE.to_string(),
            build_job_id: job.id,
            event: event.kind,
            progress: job.progress,
            current_step: job.current_step.clone(),
            status: job.status,
            logs: job.logs.clone(),
            error_message: job.error_message.clone(),
            output_files: job.output_files.clone(),
            timestamp: event.timestamp,
        }
    }
}

/// Messages a WebSocket client may send to narrow what it receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientCommand {
    /// Only receive updates for the listed jobs (adds to the set).
    #[serde(rename_all = "camelCase")]
    Subscribe { build_job_id: Uuid },
    /// Stop receiving updates for a job.
    #[serde(rename_all = "camelCase")]
    Unsubscribe { build_job_id: Uuid },
    /// Go back to receiving every job's updates.
    SubscribeAll,
}
