// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory state of the active tutoring session.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{SessionContext, SessionRecord, TutorMessage};

use super::autosave::AutosaveTracker;

/// Where the active session is in its turn cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    /// No lesson has started.
    #[default]
    Idle,
    GeneratingOpening,
    /// Waiting for the answer to the open question.
    AwaitingStudent,
    GeneratingContinuation,
    /// The topic is settled; only a new lesson moves on from here.
    Completed,
}

impl SessionPhase {
    /// Whether a generation call is outstanding.
    pub fn is_generating(&self) -> bool {
        matches!(self, Self::GeneratingOpening | Self::GeneratingContinuation)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::GeneratingOpening => "generating opening",
            Self::AwaitingStudent => "awaiting student",
            Self::GeneratingContinuation => "generating continuation",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Messages, history log, pedagogical context and save bookkeeping of one
/// session.
///
/// `messages` and `history` only grow until [`reset`](Self::reset); the
/// context is replaced as a whole value.
#[derive(Debug, Default)]
pub struct SessionState {
    generation: u64,
    phase: SessionPhase,
    context: Option<SessionContext>,
    messages: Vec<TutorMessage>,
    history: Vec<String>,
    started_at: Option<DateTime<Utc>>,
    pub(crate) autosave: AutosaveTracker,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_message(&mut self, message: TutorMessage) {
        self.messages.push(message);
    }

    pub fn append_history(&mut self, line: impl Into<String>) {
        self.history.push(line.into());
    }

    /// Number of question messages. Each takes at most one recorded answer.
    pub fn question_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_question).count()
    }

    pub fn set_context(&mut self, context: SessionContext) {
        self.context = Some(context);
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    pub fn messages(&self) -> &[TutorMessage] {
        &self.messages
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: SessionPhase) {
        self.phase = phase;
    }

    /// True while a turn is outstanding. Presentation layers disable input
    /// while this is set.
    pub fn is_processing(&self) -> bool {
        self.phase.is_generating()
    }

    /// Identifier of the active session instance. Changes on every reset.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub(crate) fn mark_started(&mut self, at: DateTime<Utc>) {
        self.started_at = Some(at);
    }

    pub fn autosave(&self) -> &AutosaveTracker {
        &self.autosave
    }

    /// The question the student is expected to answer, if any.
    ///
    /// This is the last question in message order, and only while the
    /// session is waiting for the student.
    pub fn open_question(&self) -> Option<&TutorMessage> {
        if self.phase != SessionPhase::AwaitingStudent {
            return None;
        }
        self.messages.iter().rev().find(|m| m.is_question)
    }

    /// Render the history log, one line per entry.
    pub fn transcript(&self) -> String {
        self.history.join("\n")
    }

    /// Drop everything and start a new generation.
    pub fn reset(&mut self) {
        let generation = self.generation.wrapping_add(1);
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    /// Replace the state with a saved record, without generating anything.
    ///
    /// A restored session always waits for the student; the open question is
    /// the last saved question, whatever came after it. The history log comes
    /// from the record's context so the next prompt sees the saved transcript.
    pub(crate) fn restore(&mut self, record: SessionRecord) {
        self.reset();
        self.history = record.context.conversation_history.clone();
        self.messages = record.messages;
        self.context = Some(record.context);
        self.started_at = Some(Utc::now());
        self.phase = if self.messages.is_empty() {
            SessionPhase::Idle
        } else {
            SessionPhase::AwaitingStudent
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LessonRequest;

    fn context() -> SessionContext {
        SessionContext::from_request(&LessonRequest::new("Math", "Fractions", "Asha"))
    }

    #[test]
    fn test_append_only_accessors() {
        let mut state = SessionState::new();
        state.set_context(context());
        state.append_message(TutorMessage::new("Hello. Ready?", true));
        state.append_history("Teacher: Hello. Ready?");
        state.append_history("Student: yes");

        assert_eq!(state.message_count(), 1);
        assert_eq!(state.history().len(), 2);
        assert_eq!(state.transcript(), "Teacher: Hello. Ready?\nStudent: yes");
        assert_eq!(state.context().unwrap().subject, "Math");
    }

    #[test]
    fn test_open_question_requires_awaiting_phase() {
        let mut state = SessionState::new();
        state.append_message(TutorMessage::new("What is half of 4?", true));
        assert!(state.open_question().is_none());

        state.set_phase(SessionPhase::AwaitingStudent);
        assert_eq!(state.open_question().unwrap().content, "What is half of 4?");
    }

    #[test]
    fn test_open_question_uses_message_order() {
        let mut state = SessionState::new();
        state.append_message(TutorMessage::new("First?", true));
        state.append_message(TutorMessage::new("Some explanation.", false));
        state.append_message(TutorMessage::new("Second?", true));
        state.set_phase(SessionPhase::AwaitingStudent);

        assert_eq!(state.open_question().unwrap().content, "Second?");
    }

    #[test]
    fn test_reset_clears_everything_and_bumps_generation() {
        let mut state = SessionState::new();
        state.set_context(context());
        state.append_message(TutorMessage::new("Hi?", true));
        state.append_history("Teacher: Hi?");
        state.set_phase(SessionPhase::AwaitingStudent);
        state.autosave.adopt("rec".to_string(), 1);
        let before = state.generation();

        state.reset();

        assert_eq!(state.generation(), before + 1);
        assert!(state.context().is_none());
        assert!(state.messages().is_empty());
        assert!(state.history().is_empty());
        assert_eq!(state.phase(), SessionPhase::Idle);
        assert!(state.autosave().record_id().is_none());
    }

    #[test]
    fn test_restore_waits_for_student() {
        let mut ctx = context();
        ctx.conversation_history = vec!["Teacher: Ready?".to_string()];
        let record = SessionRecord::new(vec![TutorMessage::new("Ready?", true)], ctx);

        let mut state = SessionState::new();
        state.restore(record);

        assert_eq!(state.phase(), SessionPhase::AwaitingStudent);
        assert_eq!(state.history(), &["Teacher: Ready?".to_string()]);
        assert!(!state.is_processing());
    }

    #[test]
    fn test_question_count_survives_restore() {
        let messages = vec![
            TutorMessage::new("What is half of 8?", true),
            TutorMessage::new("Close. Try again.", false),
            TutorMessage::new("What is half of 10?", true),
        ];
        let record = SessionRecord::new(messages, context());

        let mut state = SessionState::new();
        state.restore(record);

        assert_eq!(state.question_count(), 2);
        assert_eq!(state.open_question().unwrap().content, "What is half of 10?");
    }

    #[test]
    fn test_processing_flag_follows_phase() {
        let mut state = SessionState::new();
        state.set_phase(SessionPhase::GeneratingContinuation);
        assert!(state.is_processing());
        state.set_phase(SessionPhase::Completed);
        assert!(!state.is_processing());
    }
}
