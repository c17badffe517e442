// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Metrics collection for lesson turns and session saves.
//!
//! Lightweight in-process counters and timings; no exporter. The CLI prints a
//! snapshot with `--debug`.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// Global metrics instance.
pub static GLOBAL_METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Counter names used by the engine.
pub mod counters {
    pub const TURNS_COMPLETED: &str = "turns.completed";
    pub const TURNS_FAILED: &str = "turns.failed";
    pub const TURNS_DISCARDED: &str = "turns.discarded";
    pub const SAVES_CREATED: &str = "saves.created";
    pub const SAVES_UPDATED: &str = "saves.updated";
    pub const SAVES_SKIPPED: &str = "saves.skipped";
    pub const SAVES_FAILED: &str = "saves.failed";
    pub const CREDITS_AWARDED: &str = "credits.awarded";
    pub const CREDITS_FAILED: &str = "credits.failed";
}

/// Central metrics collection.
#[derive(Debug)]
pub struct Metrics {
    operations: RwLock<HashMap<String, OperationMetrics>>,
    counters: RwLock<HashMap<String, u64>>,
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Self {
        Self {
            operations: RwLock::new(HashMap::new()),
            counters: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record a timed operation.
    pub fn record_operation(&self, name: &str, duration: Duration) {
        if let Ok(mut ops) = self.operations.write() {
            ops.entry(name.to_string())
                .or_insert_with(OperationMetrics::new)
                .record(duration);
        }
    }

    /// Increment a named counter by one.
    pub fn increment(&self, name: &str) {
        if let Ok(mut counters) = self.counters.write() {
            *counters.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    /// Current value of a counter.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .read()
            .ok()
            .and_then(|c| c.get(name).copied())
            .unwrap_or(0)
    }

    /// Get metrics for a specific operation.
    pub fn operation_metrics(&self, name: &str) -> Option<OperationMetrics> {
        self.operations.read().ok()?.get(name).cloned()
    }

    /// Get uptime since metrics were initialized.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Take a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            operations: self.operations.read().map(|o| o.clone()).unwrap_or_default(),
            counters: self.counters.read().map(|c| c.clone()).unwrap_or_default(),
            uptime: self.uptime(),
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        if let Ok(mut ops) = self.operations.write() {
            ops.clear();
        }
        if let Ok(mut counters) = self.counters.write() {
            counters.clear();
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Timing statistics for one operation.
#[derive(Debug, Clone)]
pub struct OperationMetrics {
    pub count: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
}

impl OperationMetrics {
    pub fn new() -> Self {
        Self {
            count: 0,
            total_duration: Duration::ZERO,
            max_duration: Duration::ZERO,
        }
    }

    pub fn record(&mut self, duration: Duration) {
        self.count += 1;
        self.total_duration += duration;
        self.max_duration = self.max_duration.max(duration);
    }

    /// Average duration, zero when nothing was recorded.
    pub fn average(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            self.total_duration / self.count as u32
        }
    }
}

impl Default for OperationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of all metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub operations: HashMap<String, OperationMetrics>,
    pub counters: HashMap<String, u64>,
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Render a short human-readable report.
    pub fn format_summary(&self) -> String {
        let mut lines = vec![format!("uptime: {:.1}s", self.uptime.as_secs_f64())];

        let mut counters: Vec<_> = self.counters.iter().collect();
        counters.sort();
        for (name, value) in counters {
            lines.push(format!("{name}: {value}"));
        }

        let mut ops: Vec<_> = self.operations.iter().collect();
        ops.sort_by(|a, b| a.0.cmp(b.0));
        for (name, op) in ops {
            lines.push(format!(
                "{name}: {} calls, avg {:.0}ms, max {:.0}ms",
                op.count,
                op.average().as_secs_f64() * 1000.0,
                op.max_duration.as_secs_f64() * 1000.0
            ));
        }

        lines.join("\n")
    }
}
