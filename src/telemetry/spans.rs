// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Span helpers for consistent instrumentation.

use std::time::Instant;
use tracing::{info_span, Span};

/// Kind of lesson turn being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Opening,
    Continuation,
}

impl TurnKind {
    /// Operation name used for metrics.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Opening => "lesson.start",
            Self::Continuation => "lesson.continue",
        }
    }
}

/// RAII guard for timing one lesson turn.
///
/// Covers the generation call and extraction, and records duration and
/// outcome to the span and to global metrics.
pub struct TurnSpan {
    kind: TurnKind,
    start: Instant,
    span: Span,
}

impl TurnSpan {
    /// Start a new turn span.
    pub fn start(kind: TurnKind, generation: u64) -> Self {
        let span = info_span!(
            "turn",
            kind = kind.operation(),
            generation,
            duration_ms = tracing::field::Empty,
            success = tracing::field::Empty,
            has_question = tracing::field::Empty,
        );

        Self {
            kind,
            start: Instant::now(),
            span,
        }
    }

    /// Get the underlying tracing span.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Record whether the extracted segment held a question.
    pub fn record_question(&self, has_question: bool) {
        self.span.record("has_question", has_question);
    }

    /// Finish the span, recording duration and success.
    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed();
        self.span.record("duration_ms", duration.as_secs_f64() * 1000.0);
        self.span.record("success", success);

        #[cfg(feature = "telemetry")]
        {
            use super::metrics::{counters, GLOBAL_METRICS};
            GLOBAL_METRICS.record_operation(self.kind.operation(), duration);
            GLOBAL_METRICS.increment(if success {
                counters::TURNS_COMPLETED
            } else {
                counters::TURNS_FAILED
            });
        }

        tracing::debug!(parent: &self.span, kind = ?self.kind, "Turn finished");
    }

    /// Finish a turn whose result arrived after its session was replaced.
    pub fn discard(self) {
        let duration = self.start.elapsed();
        self.span.record("duration_ms", duration.as_secs_f64() * 1000.0);
        self.span.record("success", false);

        #[cfg(feature = "telemetry")]
        super::metrics::GLOBAL_METRICS.increment(super::metrics::counters::TURNS_DISCARDED);

        tracing::debug!(parent: &self.span, kind = ?self.kind, "Turn result discarded");
    }

    /// Finish with a result, automatically determining success.
    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) {
        self.finish(result.is_ok());
    }
}
