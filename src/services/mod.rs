//! Build lifecycle services.

pub mod build_service;
pub mod connections;
pub mod event_broadcaster;
pub mod job_store;
pub mod phases;
pub mod retention;
pub mod simulator;

pub use build_service::BuildService;
pub use connections::{ConnectionGuard, ConnectionRegistry};
pub use event_broadcaster::{BuildEventListener, EventBroadcaster, ListenerId, TracingListener};
pub use job_store::{JobStore, StoreError};
pub use phases::{Phase, PhaseCatalog, PhasePlan, Stage};
pub use retention::{RetentionConfig, start_retention_task};
pub use simulator::{PhaseRunner, SimulationError, SimulationOutcome, StepSimulator, TimedPhaseRunner};
