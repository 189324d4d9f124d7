//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// Development default values.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const DEV_PHASE_TIME_SCALE: f64 = 1.0; // Real phase durations (~40s per build)
    pub const DEV_EVENT_CHANNEL_CAPACITY: usize = 1000;
    pub const DEV_JOB_RETENTION_HOURS: u64 = 0; // Keep builds for the process lifetime
    pub const DEV_RETENTION_INTERVAL_SECS: u64 = 300;

    pub const MAX_PHASE_TIME_SCALE: f64 = 1000.0;
    pub const MAX_JOB_RETENTION_HOURS: u64 = 24 * 365 * 10;
    pub const MAX_RETENTION_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory for static frontend assets
    pub static_dir: Option<PathBuf>,
    /// Multiplier applied to every simulated phase duration (0 = instant builds)
    pub phase_time_scale: f64,
    /// Buffered events per WebSocket subscriber before it starts lagging
    pub event_channel_capacity: usize,
    /// Hours to keep finished builds (0 = keep for the process lifetime)
    pub job_retention_hours: u64,
    /// Seconds between retention sweeps
    pub retention_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `KF_HOST`: Server host (default: 127.0.0.1)
    /// - `KF_PORT`: Server port (default: 8080)
    /// - `KF_STATIC_DIR`: Static assets directory for the web UI
    /// - `KF_PHASE_TIME_SCALE`: Phase duration multiplier (default: 1.0)
    /// - `KF_EVENT_CHANNEL_CAPACITY`: Event buffer per subscriber (default: 1000)
    /// - `KF_JOB_RETENTION_HOURS`: Keep finished builds this long (default: 0, forever)
    /// - `KF_RETENTION_INTERVAL_SECS`: Retention sweep interval (default: 300)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Parse environment - required
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("KF_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = env::var("KF_PORT")
            .unwrap_or_else(|_| defaults::DEV_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("KF_PORT must be a valid port number"))?;

        let static_dir = env::var("KF_STATIC_DIR").ok().map(PathBuf::from);

        let phase_time_scale = parse_phase_time_scale(
            &env::var("KF_PHASE_TIME_SCALE")
                .unwrap_or_else(|_| defaults::DEV_PHASE_TIME_SCALE.to_string()),
        )?;

        let event_channel_capacity = env::var("KF_EVENT_CHANNEL_CAPACITY")
            .unwrap_or_else(|_| defaults::DEV_EVENT_CHANNEL_CAPACITY.to_string())
            .parse::<usize>()
            .ok()
            .filter(|c| *c > 0)
            .ok_or(ConfigError::InvalidValue(
                "KF_EVENT_CHANNEL_CAPACITY must be a positive number",
            ))?;

        let job_retention_hours = parse_job_retention_hours(
            &env::var("KF_JOB_RETENTION_HOURS")
                .unwrap_or_else(|_| defaults::DEV_JOB_RETENTION_HOURS.to_string()),
        )?;

        let retention_interval_secs = parse_retention_interval_secs(
            &env::var("KF_RETENTION_INTERVAL_SECS")
                .unwrap_or_else(|_| defaults::DEV_RETENTION_INTERVAL_SECS.to_string()),
        )?;

        let config = Config {
            environment,
            host,
            port,
            static_dir,
            phase_time_scale,
            event_channel_capacity,
            job_retention_hours,
            retention_interval_secs,
        };

        // Validate production configuration
        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that production configuration does not use test-only settings.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.phase_time_scale == 0.0 {
            errors.push(
                "KF_PHASE_TIME_SCALE is 0, which finishes builds instantly. Use it for tests only."
                    .to_string(),
            );
        }

        if self.job_retention_hours > 0 && self.retention_interval_secs == 0 {
            errors.push(
                "KF_RETENTION_INTERVAL_SECS must be positive when KF_JOB_RETENTION_HOURS is set."
                    .to_string(),
            );
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

/// Parse `KF_PHASE_TIME_SCALE`: finite, in `0..=MAX_PHASE_TIME_SCALE`.
fn parse_phase_time_scale(raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && (0.0..=defaults::MAX_PHASE_TIME_SCALE).contains(s))
        .ok_or(ConfigError::InvalidValue(
            "KF_PHASE_TIME_SCALE must be a number between 0 and 1000",
        ))
}

/// Parse `KF_JOB_RETENTION_HOURS`, capped at ten years.
fn parse_job_retention_hours(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|h| *h <= defaults::MAX_JOB_RETENTION_HOURS)
        .ok_or(ConfigError::InvalidValue(
            "KF_JOB_RETENTION_HOURS must be a number of hours up to 87600",
        ))
}

/// Parse `KF_RETENTION_INTERVAL_SECS`, capped at one week.
fn parse_retention_interval_secs(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|s| *s <= defaults::MAX_RETENTION_INTERVAL_SECS)
        .ok_or(ConfigError::InvalidValue(
            "KF_RETENTION_INTERVAL_SECS must be a number of seconds up to 604800",
        ))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
