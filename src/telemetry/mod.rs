// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Telemetry, tracing, and metrics infrastructure.
//!
//! - **Tracing**: structured logging with a span per lesson turn
//! - **Metrics**: counters and timings for turns, saves and credit awards
//!
//! # Usage
//!
//! ```rust,ignore
//! use tutor::telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::default())?;
//! ```
//!
//! Engine code logs with the level convention used throughout the crate:
//! `debug` for skipped saves and discarded results, `info` for turns and
//! saves, `warn` for swallowed store or ledger failures.

mod init;
pub mod metrics;
mod spans;

pub use init::{init_telemetry, TelemetryConfig, TelemetryGuard};
pub use metrics::{Metrics, MetricsSnapshot, OperationMetrics, GLOBAL_METRICS};
pub use spans::{TurnKind, TurnSpan};
