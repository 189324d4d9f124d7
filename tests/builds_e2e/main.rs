//! Build API E2E test suite.
//!
//! Drives the HTTP surface against an in-process app with short or
//! instant phase plans. WebSocket tests bind a real server on an
//! ephemeral loopback port. No external services are needed.
//!
//! Run with: cargo test --test builds_e2e

mod test_helpers;

mod test_cancel;
mod test_health;
mod test_query;
mod test_submit;
mod test_websocket;
