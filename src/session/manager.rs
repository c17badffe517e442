// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Public controller for one tutoring session.
//!
//! Wraps the lesson runner with resume, autosave and reset. Persistence
//! failures on automatic saves are logged and swallowed; only generation
//! failures and explicit saves reach the caller as errors.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::config::AutosaveConfig;
use crate::error::{SessionError, TutorError};
use crate::types::{
    LessonRequest, SessionContext, SessionId, SessionRecord, SharedSessionStore, TutorMessage,
};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::{counters, GLOBAL_METRICS};

use super::autosave::{AutosavePolicy, SaveTarget, SkipReason};
use super::lesson::{LessonRunner, TurnOutcome};
use super::state::{SessionPhase, SessionState};

/// Autosave settings for a manager.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    pub policy: AutosavePolicy,
    /// Whether periodic autosave runs. Teardown, reset and explicit saves
    /// are not affected.
    pub autosave_enabled: bool,
    /// Tick interval of the background autosave task.
    pub autosave_interval: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self::from_config(&AutosaveConfig::default())
    }
}

impl ManagerOptions {
    pub fn from_config(config: &AutosaveConfig) -> Self {
        Self {
            policy: AutosavePolicy::from(config),
            autosave_enabled: config.enabled,
            autosave_interval: Duration::from_secs(config.interval_secs.max(1)),
        }
    }
}

/// What a save request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Created(SessionId),
    Updated(SessionId),
    Skipped(SkipReason),
    /// The session was reset while the save was running.
    Superseded,
}

impl SaveOutcome {
    /// Whether the store was written for the current session.
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Created(_) | Self::Updated(_))
    }
}

/// Point-in-time copy of the session for presentation layers.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub phase: SessionPhase,
    pub processing: bool,
    pub context: Option<SessionContext>,
    pub messages: Vec<TutorMessage>,
    pub history: Vec<String>,
    pub record_id: Option<SessionId>,
}

/// Owns the active session and coordinates turns with persistence.
pub struct SessionManager {
    state: Arc<Mutex<SessionState>>,
    lessons: LessonRunner,
    store: SharedSessionStore,
    options: ManagerOptions,
}

impl SessionManager {
    pub fn new(lessons: LessonRunner, store: SharedSessionStore) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            lessons,
            store,
            options: ManagerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ManagerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// Shared handle to the session state.
    pub fn state(&self) -> Arc<Mutex<SessionState>> {
        Arc::clone(&self.state)
    }

    pub fn generator_name(&self) -> &str {
        self.lessons.generator_name()
    }

    /// Start a new lesson. An existing session is reset first, including its
    /// final save.
    pub async fn start_lesson(&self, request: &LessonRequest) -> Result<TurnOutcome, TutorError> {
        let active = self.state.lock().await.context().is_some();
        if active {
            self.reset_session().await;
        }

        let outcome = self.lessons.start_lesson(&self.state, request).await?;
        self.maybe_autosave().await;
        Ok(outcome)
    }

    /// Load a saved session verbatim and wait for the student. Nothing is
    /// generated.
    #[instrument(skip(self))]
    pub async fn resume(&self, id: &str) -> Result<SessionSnapshot, TutorError> {
        let record = self
            .store
            .load_session(id)
            .await?
            .ok_or_else(|| TutorError::SessionNotFound(id.to_string()))?;

        let active = self.state.lock().await.context().is_some();
        if active {
            self.reset_session().await;
        }

        let record_id = record.id.clone();
        let count = record.messages.len();
        {
            let mut s = self.state.lock().await;
            s.restore(record);
            s.autosave.adopt(record_id, count);
        }

        info!(messages = count, "Session resumed");
        Ok(self.snapshot().await)
    }

    /// Answer the open question, then autosave if a round is complete.
    pub async fn submit_response(&self, answer: &str) -> Result<TurnOutcome, TutorError> {
        let outcome = self.lessons.submit_response(&self.state, answer).await?;
        if outcome.message().is_some() {
            self.maybe_autosave().await;
        }
        Ok(outcome)
    }

    /// Periodic autosave. Runs only on whole rounds; failures are logged.
    pub async fn maybe_autosave(&self) -> Option<SaveOutcome> {
        if !self.options.autosave_enabled {
            return None;
        }
        let count = self.state.lock().await.message_count();
        if !self.options.policy.is_periodic_due(count) {
            return None;
        }
        self.save_logged("autosave").await
    }

    /// Save when the session surface goes away. Bypasses the round cadence.
    pub async fn save_on_teardown(&self) -> Option<SaveOutcome> {
        let (count, active) = {
            let s = self.state.lock().await;
            (s.message_count(), s.context().is_some())
        };
        if !active || !self.options.policy.is_teardown_due(count) {
            return None;
        }
        self.save_logged("teardown").await
    }

    /// Explicit save requested by the user. Store errors are returned.
    pub async fn save_now(&self) -> Result<SaveOutcome, TutorError> {
        Ok(self.save().await?)
    }

    /// Final save when the session is large enough, then clear everything.
    #[instrument(skip(self))]
    pub async fn reset_session(&self) {
        let count = self.state.lock().await.message_count();
        if self.options.policy.is_reset_save_due(count) {
            self.save_logged("reset").await;
        }
        self.state.lock().await.reset();
        debug!("Session reset");
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let s = self.state.lock().await;
        SessionSnapshot {
            generation: s.generation(),
            phase: s.phase(),
            processing: s.is_processing(),
            context: s.context().cloned(),
            messages: s.messages().to_vec(),
            history: s.history().to_vec(),
            record_id: s.autosave().record_id().map(str::to_string),
        }
    }

    /// Tick `maybe_autosave` in the background until the manager is dropped.
    pub fn spawn_autosave(self: &Arc<Self>) -> JoinHandle<()> {
        let manager: Weak<Self> = Arc::downgrade(self);
        let period = self.options.autosave_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.maybe_autosave().await;
            }
            debug!("Autosave task stopped");
        })
    }

    async fn save_logged(&self, trigger: &'static str) -> Option<SaveOutcome> {
        match self.save().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(trigger, error = %e, "Session save failed");
                None
            }
        }
    }

    async fn save(&self) -> Result<SaveOutcome, SessionError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let (generation, target, messages, context) = {
            let mut s = self.state.lock().await;
            let has_context = s.context().is_some();
            let count = s.message_count();
            let claim = s
                .autosave
                .begin(has_context, count, Instant::now(), &self.options.policy);
            let target = match claim {
                Ok(target) => target,
                Err(reason) => {
                    debug!(%reason, messages = count, "Save skipped");
                    #[cfg(feature = "telemetry")]
                    GLOBAL_METRICS.increment(counters::SAVES_SKIPPED);
                    return Ok(SaveOutcome::Skipped(reason));
                }
            };
            let Some(context) = s.context().cloned() else {
                s.autosave.fail();
                return Ok(SaveOutcome::Skipped(SkipReason::NoContext));
            };
            (s.generation(), target, s.messages().to_vec(), context)
        };

        let count = messages.len();
        let result = match target {
            SaveTarget::Create => {
                let record = SessionRecord::new(messages, context);
                self.store
                    .create_session(&record)
                    .await
                    .map(|id| (id, true))
            }
            SaveTarget::Update(id) => self
                .store
                .update_session(&id, &messages, &context)
                .await
                .map(|()| (id, false)),
        };

        let mut s = self.state.lock().await;
        if s.generation() != generation {
            debug!("Session replaced during save, dropping result");
            return Ok(SaveOutcome::Superseded);
        }

        match result {
            Ok((id, created)) => {
                s.autosave.complete(id.clone(), count);
                drop(s);

                #[cfg(feature = "telemetry")]
                {
                    GLOBAL_METRICS.record_operation("session.save", start.elapsed());
                    GLOBAL_METRICS.increment(if created {
                        counters::SAVES_CREATED
                    } else {
                        counters::SAVES_UPDATED
                    });
                }

                info!(id = %id, messages = count, created, "Session saved");
                Ok(if created {
                    SaveOutcome::Created(id)
                } else {
                    SaveOutcome::Updated(id)
                })
            }
            Err(e) => {
                s.autosave.fail();
                #[cfg(feature = "telemetry")]
                GLOBAL_METRICS.increment(counters::SAVES_FAILED);
                Err(e)
            }
        }
    }
}
