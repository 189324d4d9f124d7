//! KernelForge server library.
//!
//! In-memory build jobs for custom Android kernels and TWRP recovery images:
//! the job store and state machine, the step simulator, the event fan-out and
//! the HTTP/WebSocket surface on top of them.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
