//! # Traffic analysis
//!
//! Per-client sliding-window statistics and the concurrent registry that
//! owns them. The [`analyzer::TrafficAnalyzer`] is the only entry point the
//! request pipeline and the dashboard use; [`window::SlidingWindow`] is the
//! time-window primitive underneath each client record.

/// Concurrent registry of per-client statistics and derived metrics.
pub mod analyzer;

/// Bounded time-window counter of request arrival instants.
pub mod window;
