//! Build job domain model and lifecycle state machine.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use utoipa::ToSchema;
use uuid::Uuid;

/// Version used for artifact names when the config does not pin one.
pub const DEFAULT_VERSION: &str = "latest";

/// Highest progress value a job may report while still running.
const MAX_RUNNING_PROGRESS: u8 = 99;

/// Kind of build, selected by the `buildType` discriminator in the config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BuildKind {
    /// Custom kernel image.
    Kernel,
    /// TWRP recovery image.
    #[default]
    Recovery,
}

impl BuildKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kernel => "kernel",
            Self::Recovery => "recovery",
        }
    }

    /// Artifact kind embedded in output file names.
    pub fn artifact_kind(&self) -> &'static str {
        match self {
            Self::Kernel => "kernel",
            Self::Recovery => "twrp",
        }
    }
}

impl std::fmt::Display for BuildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Build status.
///
/// `pending → running → {completed | failed}` and `pending | running → cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    /// Accepted, simulator not started yet.
    Pending,
    /// Phases are executing.
    Running,
    /// All phases finished.
    Completed,
    /// A phase raised an error.
    Failed,
    /// Cancelled by the user.
    Cancelled,
}

impl BuildStatus {
    pub const ALL: [BuildStatus; 5] = [
        Self::Pending,
        Self::Running,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Terminal statuses never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: BuildStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Cancelled)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Cancelled)
        )
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A state change the job's current status does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move build from {from} to {to}")]
    Illegal { from: BuildStatus, to: BuildStatus },

    #[error("build is {0}, not running")]
    NotRunning(BuildStatus),
}

/// Configuration payload supplied by the caller.
///
/// Only `device` is validated; everything else is carried through as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Device display name, e.g. "OnePlus 7". Required.
    #[serde(default)]
    pub device: Option<String>,
    /// Device codename used in artifact names. Derived from `device` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codename: Option<String>,
    /// Build kind discriminator.
    #[serde(default)]
    pub build_type: BuildKind,
    /// Version string used in artifact names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Recovery theme name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Feature toggles (KernelSU, Magisk, TWRP options, ...).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    #[schema(value_type = Object)]
    pub features: Map<String, JsonValue>,
    /// Extra flags passed through to the build.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_flags: Vec<String>,
    /// Kernel stages to skip, plus the opt-in output cleanup.
    #[serde(default, skip_serializing_if = "SkipOptions::is_default")]
    pub skip_options: SkipOptions,
}

/// Stage toggles for kernel builds. Every stage runs unless skipped;
/// cleaning the previous output only runs when requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SkipOptions {
    pub skip_env_setup: bool,
    pub skip_clone: bool,
    pub skip_patches: bool,
    pub skip_config_tweaks: bool,
    pub skip_build: bool,
    pub clean_output: bool,
}

impl SkipOptions {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl BuildConfig {
    /// Create a config for a device with every other field defaulted.
    pub fn for_device(device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            ..Default::default()
        }
    }

    pub fn with_build_type(mut self, kind: BuildKind) -> Self {
        self.build_type = kind;
        self
    }

    pub fn with_skip_options(mut self, skip_options: SkipOptions) -> Self {
        self.skip_options = skip_options;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// The trimmed device name, or `None` when missing or blank.
    pub fn device_name(&self) -> Option<&str> {
        self.device
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Codename for artifact names: the explicit one, else a slug of the device name.
    pub fn codename(&self) -> String {
        match self.codename.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => slugify(self.device_name().unwrap_or_default()),
        }
    }

    pub fn version(&self) -> &str {
        match self.version.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v,
            _ => DEFAULT_VERSION,
        }
    }

    /// Artifact file names produced by a successful build.
    pub fn output_files(&self) -> Vec<String> {
        let stem = format!(
            "{}_{}_{}",
            self.codename(),
            self.build_type.artifact_kind(),
            self.version()
        );
        vec![format!("{stem}.img"), format!("{stem}.zip")]
    }
}

/// Lowercase, with every run of non-alphanumerics collapsed to `_`.
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// Format a log line the way every job log entry is written.
pub fn log_line(at: DateTime<Utc>, message: &str) -> String {
    format!(
        "[{}] {}",
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        message
    )
}

/// A single simulated build and its evolving state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildJob {
    pub id: Uuid,
    pub kind: BuildKind,
    pub config: BuildConfig,
    pub status: BuildStatus,
    /// Percentage, 0-100.
    pub progress: u8,
    pub current_step: String,
    pub logs: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BuildJob {
    /// Create a pending job. Callers validate the config first.
    pub fn new(config: BuildConfig) -> Self {
        let now = Utc::now();
        let kind = config.build_type;
        Self {
            id: Uuid::now_v7(),
            kind,
            config,
            status: BuildStatus::Pending,
            progress: 0,
            current_step: "Queued".to_string(),
            logs: Vec::new(),
            created_at: now,
            started_at: None,
            completed_at: None,
            output_files: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn ensure(&self, to: BuildStatus) -> Result<(), TransitionError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(TransitionError::Illegal {
                from: self.status,
                to,
            })
        }
    }

    fn ensure_running(&self) -> Result<(), TransitionError> {
        if self.status == BuildStatus::Running {
            Ok(())
        } else {
            Err(TransitionError::NotRunning(self.status))
        }
    }

    fn log(&mut self, at: DateTime<Utc>, message: &str) {
        self.logs.push(log_line(at, message));
    }

    /// `pending → running`.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.ensure(BuildStatus::Running)?;
        let now = Utc::now();
        self.status = BuildStatus::Running;
        self.started_at = Some(now);
        self.current_step = "Initializing".to_string();
        let message = format!(
            "Build started: {} for {}",
            self.kind,
            self.config.device_name().unwrap_or_default()
        );
        self.log(now, &message);
        Ok(())
    }

    /// Mark `phase` as the active step. Only valid while running.
    pub fn begin_phase(&mut self, phase: &str) -> Result<(), TransitionError> {
        self.ensure_running()?;
        self.current_step = phase.to_string();
        self.log(Utc::now(), &format!("Starting: {phase}"));
        Ok(())
    }

    /// Record that `phase` finished and raise progress to `progress`.
    ///
    /// Progress never decreases and stays below 100 until the job completes.
    pub fn finish_phase(&mut self, phase: &str, progress: u8) -> Result<(), TransitionError> {
        self.ensure_running()?;
        self.progress = self.progress.max(progress.min(MAX_RUNNING_PROGRESS));
        self.log(Utc::now(), &format!("Completed: {phase}"));
        Ok(())
    }

    /// `running → completed`.
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.ensure(BuildStatus::Completed)?;
        let now = Utc::now();
        let files = self.config.output_files();
        self.status = BuildStatus::Completed;
        self.progress = 100;
        self.current_step = "Build completed successfully".to_string();
        self.completed_at = Some(now);
        self.log(now, "Build completed successfully!");
        self.log(now, &format!("Output files: {}", files.join(", ")));
        self.output_files = Some(files);
        Ok(())
    }

    /// `running → failed`.
    pub fn fail(&mut self, message: &str) -> Result<(), TransitionError> {
        self.ensure(BuildStatus::Failed)?;
        let now = Utc::now();
        self.status = BuildStatus::Failed;
        self.current_step = "Build failed".to_string();
        self.error_message = Some(message.to_string());
        self.completed_at = Some(now);
        self.log(now, &format!("ERROR: {message}"));
        Ok(())
    }

    /// `pending | running → cancelled`.
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.ensure(BuildStatus::Cancelled)?;
        let now = Utc::now();
        self.status = BuildStatus::Cancelled;
        self.current_step = "Build cancelled by user".to_string();
        self.completed_at = Some(now);
        self.log(now, "Build cancelled by user");
        Ok(())
    }
}

/// Response for a cancellation request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelBuildResponse {
    pub build_job_id: Uuid,
    /// False when the build was unknown or already finished.
    pub cancelled: bool,
}

/// Query parameters for listing builds.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListBuildsQuery {
    /// Only return builds in this status.
    pub status: Option<String>,
}
