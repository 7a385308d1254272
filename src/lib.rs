#![warn(missing_docs)]

//! # Riskgate
//!
//! Riskgate is an HTTP reverse proxy that watches how each client behaves
//! and decides, per request, whether to forward it, slow it down, or shut
//! the client out. Every request updates a per-client sliding window of
//! arrival times, an endpoint histogram, and error counters; a
//! deterministic scorer turns those features into a risk score; and the
//! policy thresholds map the score onto forward / throttle / block.
//!
//! ## Modules
//!
//! - [`analysis`] - Per-client sliding-window statistics and the concurrent registry.
//! - [`scoring`] - The feature-vector-to-risk scoring seam and its rule-based default.
//! - [`gateway`] - The ban ledger and the per-request decision pipeline.
//! - [`policy`] - Process-wide enforcement tunables behind a read/write lock.
//! - [`fingerprint`] - SHA-256-derived client identity.
//! - [`app`] - The HTTP server: router wiring and the accept loop.
//! - [`api`] - The management endpoints under `/api/`.
//! - [`config`] - Config-file loading and environment overrides.
//! - [`error`] - Structured error types for startup and validation failures.

/// Per-client sliding-window statistics and the concurrent registry.
pub mod analysis;

/// The management endpoints under `/api/`.
pub mod api;

/// The HTTP server: router wiring and the accept loop.
pub mod app;

/// Config-file loading and environment overrides.
pub mod config;

/// Structured error types for startup and validation failures.
pub mod error;

/// SHA-256-derived client identity.
pub mod fingerprint;

/// The ban ledger and the per-request decision pipeline.
pub mod gateway;

/// Process-wide enforcement tunables behind a read/write lock.
pub mod policy;

/// The feature-vector-to-risk scoring seam and its rule-based default.
pub mod scoring;

/// Internal test module.
mod tests;
