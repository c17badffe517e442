// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Autosave cadence and deduplication.
//!
//! [`AutosavePolicy`] decides *when* a save is due; [`AutosaveTracker`]
//! decides whether a due save actually reaches the store, and whether it
//! creates a new record or updates the one created earlier.

use std::time::{Duration, Instant};

use crate::config::AutosaveConfig;
use crate::types::SessionId;

/// Thresholds that drive saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutosavePolicy {
    pub cooldown: Duration,
    pub min_messages: usize,
    pub round_size: usize,
    pub teardown_min_messages: usize,
    pub reset_min_messages: usize,
}

impl Default for AutosavePolicy {
    fn default() -> Self {
        Self::from(&AutosaveConfig::default())
    }
}

impl From<&AutosaveConfig> for AutosavePolicy {
    fn from(config: &AutosaveConfig) -> Self {
        Self {
            cooldown: Duration::from_secs(config.cooldown_secs),
            min_messages: config.min_messages,
            round_size: config.round_size.max(1),
            teardown_min_messages: config.teardown_min_messages,
            reset_min_messages: config.reset_min_messages,
        }
    }
}

impl AutosavePolicy {
    /// Periodic save: enough messages and a round boundary.
    pub fn is_periodic_due(&self, message_count: usize) -> bool {
        message_count >= self.min_messages && message_count % self.round_size == 0
    }

    /// Save when the session surface is torn down.
    pub fn is_teardown_due(&self, message_count: usize) -> bool {
        message_count >= self.teardown_min_messages
    }

    /// Final save before a reset discards the session.
    pub fn is_reset_save_due(&self, message_count: usize) -> bool {
        message_count >= self.reset_min_messages
    }
}

/// Why a save request did not reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another save is still running.
    InFlight,
    /// No lesson has started.
    NoContext,
    NoMessages,
    /// Nothing new since the last save, and the last attempt was recent.
    Duplicate,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::InFlight => "save already in flight",
            Self::NoContext => "no active lesson",
            Self::NoMessages => "no messages",
            Self::Duplicate => "unchanged since last save",
        };
        f.write_str(reason)
    }
}

/// What a granted save should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    Create,
    Update(SessionId),
}

/// Per-session save bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct AutosaveTracker {
    in_flight: bool,
    record_id: Option<SessionId>,
    last_saved_count: Option<usize>,
    last_attempt: Option<Instant>,
}

impl AutosaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a save would be granted, without claiming it.
    pub fn check(
        &self,
        has_context: bool,
        message_count: usize,
        now: Instant,
        policy: &AutosavePolicy,
    ) -> Result<SaveTarget, SkipReason> {
        if self.in_flight {
            return Err(SkipReason::InFlight);
        }
        if !has_context {
            return Err(SkipReason::NoContext);
        }
        if message_count == 0 {
            return Err(SkipReason::NoMessages);
        }

        let recent = self
            .last_attempt
            .is_some_and(|at| now.saturating_duration_since(at) < policy.cooldown);
        if recent && self.last_saved_count == Some(message_count) {
            return Err(SkipReason::Duplicate);
        }

        Ok(match &self.record_id {
            Some(id) => SaveTarget::Update(id.clone()),
            None => SaveTarget::Create,
        })
    }

    /// Claim a save. On success the tracker is in flight until
    /// [`complete`](Self::complete) or [`fail`](Self::fail) is called.
    pub fn begin(
        &mut self,
        has_context: bool,
        message_count: usize,
        now: Instant,
        policy: &AutosavePolicy,
    ) -> Result<SaveTarget, SkipReason> {
        let target = self.check(has_context, message_count, now, policy)?;
        self.in_flight = true;
        self.last_attempt = Some(now);
        Ok(target)
    }

    /// Record a successful save of `message_count` messages.
    pub fn complete(&mut self, id: SessionId, message_count: usize) {
        self.in_flight = false;
        self.record_id = Some(id);
        self.last_saved_count = Some(message_count);
    }

    /// Record a failed save. The record id and last saved count are kept.
    pub fn fail(&mut self) {
        self.in_flight = false;
    }

    /// Take over an existing record, e.g. after resuming it.
    pub fn adopt(&mut self, id: SessionId, message_count: usize) {
        self.record_id = Some(id);
        self.last_saved_count = Some(message_count);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last_saved_count(&self) -> Option<usize> {
        self.last_saved_count
    }
}
