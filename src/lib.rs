//! Scaffold-erection permit tracking and automated expiration lifecycle.
//!
//! The crate exposes the permit domain (store contract, lifecycle evaluator,
//! alert gateway, monitor loop) together with the service plumbing the binary
//! wires up: configuration, telemetry, the HTTP error surface, and the
//! access-key lookup used by field tooling.

pub mod access;
pub mod config;
pub mod error;
pub mod permits;
pub mod telemetry;
