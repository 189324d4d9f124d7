//! Phase plans for simulated builds.

use std::time::Duration;

use crate::models::{BuildConfig, BuildKind, SkipOptions};

/// Kernel build stage a caller can toggle through [`SkipOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CleanOutput,
    EnvSetup,
    Clone,
    ConfigTweaks,
    Patches,
    Compile,
}

impl Stage {
    /// Whether this stage runs under `options`. Cleanup is opt-in, the rest opt-out.
    pub fn enabled(self, options: &SkipOptions) -> bool {
        match self {
            Self::CleanOutput => options.clean_output,
            Self::EnvSetup => !options.skip_env_setup,
            Self::Clone => !options.skip_clone,
            Self::ConfigTweaks => !options.skip_config_tweaks,
            Self::Patches => !options.skip_patches,
            Self::Compile => !options.skip_build,
        }
    }
}

/// One named step of a simulated build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    pub name: String,
    pub duration: Duration,
    /// Toggleable stage this phase belongs to; `None` always runs.
    pub stage: Option<Stage>,
}

impl Phase {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
            stage: None,
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }
}

/// Ordered list of phases a build walks through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhasePlan {
    phases: Vec<Phase>,
}

impl PhasePlan {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    /// Plan with the given phase names and no delay, for instant builds.
    pub fn instant<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            names
                .into_iter()
                .map(|n| Phase::new(n, Duration::ZERO))
                .collect(),
        )
    }

    /// TWRP recovery build.
    pub fn recovery() -> Self {
        Self::from_millis(&[
            ("Setting up build environment", 5_000, None),
            ("Cloning TWRP source", 8_000, None),
            ("Applying device-specific patches", 3_000, None),
            ("Configuring build flags", 2_000, None),
            ("Applying theme customizations", 4_000, None),
            ("Compiling recovery image", 15_000, None),
            ("Packaging output files", 3_000, None),
            ("Finalizing build", 2_000, None),
        ])
    }

    /// Custom kernel build, including the opt-in cleanup stage.
    /// Use [`PhasePlan::with_options`] to get the phases a job actually runs.
    pub fn kernel() -> Self {
        Self::from_millis(&[
            ("Cleaning previous output", 1_000, Some(Stage::CleanOutput)),
            ("Setting up WSL environment", 4_000, Some(Stage::EnvSetup)),
            ("Cloning kernel repository", 10_000, Some(Stage::Clone)),
            ("Applying kernel config tweaks", 3_000, Some(Stage::ConfigTweaks)),
            ("Applying NetHunter patches", 5_000, Some(Stage::Patches)),
            ("Compiling kernel", 20_000, Some(Stage::Compile)),
            ("Packaging kernel image", 3_000, None),
        ])
    }

    fn from_millis(steps: &[(&str, u64, Option<Stage>)]) -> Self {
        Self::new(
            steps
                .iter()
                .map(|(name, ms, stage)| Phase {
                    stage: *stage,
                    ..Phase::new(*name, Duration::from_millis(*ms))
                })
                .collect(),
        )
    }

    /// Copy of this plan with every duration multiplied by `factor`.
    /// Negative or non-finite factors are treated as zero; overflowing durations saturate.
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            0.0
        };
        Self::new(
            self.phases
                .iter()
                .map(|p| Phase {
                    duration: Duration::try_from_secs_f64(p.duration.as_secs_f64() * factor)
                        .unwrap_or(Duration::MAX),
                    ..p.clone()
                })
                .collect(),
        )
    }

    /// Phases that run under `options`.
    pub fn with_options(&self, options: &SkipOptions) -> Self {
        Self::new(
            self.phases
                .iter()
                .filter(|p| p.stage.is_none_or(|stage| stage.enabled(options)))
                .cloned()
                .collect(),
        )
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn total_duration(&self) -> Duration {
        self.phases
            .iter()
            .fold(Duration::ZERO, |total, p| total.saturating_add(p.duration))
    }

    /// Progress after `completed` of the phases have finished, rounded to the nearest percent.
    pub fn progress_after(&self, completed: usize) -> u8 {
        if self.phases.is_empty() {
            return 100;
        }
        let completed = completed.min(self.phases.len());
        ((completed as f64 * 100.0) / self.phases.len() as f64).round() as u8
    }
}

/// Phase plans per build kind.
#[derive(Debug, Clone)]
pub struct PhaseCatalog {
    kernel: PhasePlan,
    recovery: PhasePlan,
}

impl PhaseCatalog {
    pub fn new(kernel: PhasePlan, recovery: PhasePlan) -> Self {
        Self { kernel, recovery }
    }

    /// Built-in plans with durations multiplied by `time_scale`.
    pub fn with_time_scale(time_scale: f64) -> Self {
        Self::new(
            PhasePlan::kernel().scaled(time_scale),
            PhasePlan::recovery().scaled(time_scale),
        )
    }

    /// Same plan for every build kind.
    pub fn uniform(plan: PhasePlan) -> Self {
        Self::new(plan.clone(), plan)
    }

    /// Full plan for a build kind, before stage toggles are applied.
    pub fn plan_for(&self, kind: BuildKind) -> &PhasePlan {
        match kind {
            BuildKind::Kernel => &self.kernel,
            BuildKind::Recovery => &self.recovery,
        }
    }

    /// Plan a job with this config runs.
    pub fn plan_for_config(&self, config: &BuildConfig) -> PhasePlan {
        self.plan_for(config.build_type)
            .with_options(&config.skip_options)
    }
}

impl Default for PhaseCatalog {
    fn default() -> Self {
        Self::with_time_scale(1.0)
    }
}
