//! Domain models for the build server.

pub mod build_job;
pub mod ws_event;

// Re-export commonly used types
pub use build_job::{
    BuildConfig, BuildJob, BuildKind, BuildStatus, CancelBuildResponse, ListBuildsQuery,
    SkipOptions, TransitionError,
};
pub use ws_event::{BuildEvent, BuildEventKind, BuildUpdateMessage, ClientCommand};
