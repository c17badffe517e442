// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Turn orchestration: opening a lesson and answering its questions.
//!
//! Each turn takes the state lock twice: once to prepare the prompt and once
//! to commit the result. The generation call in between runs unlocked, so a
//! reset can happen while it is outstanding. Results are only committed if
//! the session generation is still the one the turn started under.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn, Instrument};

use crate::error::{ProviderError, TutorError};
use crate::extract::{Segment, SegmentExtractor};
use crate::prompt::{
    build_continuation_prompt_with_window, build_initial_prompt, HISTORY_WINDOW,
};
use crate::telemetry::{TurnKind, TurnSpan};
use crate::types::{
    LessonRequest, ParticipationCredit, SessionContext, SharedCreditLedger, SharedGenerator,
    StudentResponse, TutorMessage,
};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::{counters, GLOBAL_METRICS};

use super::state::{SessionPhase, SessionState};

/// Result of a lesson turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The new message asks a question; the student's turn.
    AwaitingStudent(TutorMessage),
    /// The new message holds no question; the topic is settled.
    Completed(TutorMessage),
    /// Nothing to answer, so nothing happened.
    Ignored,
    /// The session was reset while generating; the result was dropped.
    Discarded,
}

impl TurnOutcome {
    /// The message produced by this turn, if one was committed.
    pub fn message(&self) -> Option<&TutorMessage> {
        match self {
            Self::AwaitingStudent(m) | Self::Completed(m) => Some(m),
            Self::Ignored | Self::Discarded => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Runs lesson turns against the generator and credit ledger.
pub struct LessonRunner {
    generator: SharedGenerator,
    ledger: SharedCreditLedger,
    extractor: SegmentExtractor,
    history_window: usize,
}

impl LessonRunner {
    pub fn new(generator: SharedGenerator, ledger: SharedCreditLedger) -> Self {
        Self {
            generator,
            ledger,
            extractor: SegmentExtractor::default(),
            history_window: HISTORY_WINDOW,
        }
    }

    /// Use a custom question phrase table.
    pub fn with_extractor(mut self, extractor: SegmentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Number of history lines sent with continuation prompts.
    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window.max(1);
        self
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Start a fresh lesson, replacing whatever the state held.
    ///
    /// On generation failure the state stays `Idle` with nothing committed.
    #[instrument(
        skip(self, state, request),
        fields(subject = %request.subject, chapter = %request.chapter)
    )]
    pub async fn start_lesson(
        &self,
        state: &Mutex<SessionState>,
        request: &LessonRequest,
    ) -> Result<TurnOutcome, TutorError> {
        let context = SessionContext::from_request(request);
        let generation = {
            let mut s = state.lock().await;
            s.reset();
            s.set_phase(SessionPhase::GeneratingOpening);
            s.generation()
        };

        let prompt = build_initial_prompt(&context);
        debug!(prompt_len = prompt.len(), "Built opening prompt");

        let turn = TurnSpan::start(TurnKind::Opening, generation);
        let result = self.generate_segment(&prompt).instrument(turn.span().clone()).await;

        let mut s = state.lock().await;
        if s.generation() != generation {
            turn.discard();
            return Ok(TurnOutcome::Discarded);
        }

        let segment = match result {
            Ok(segment) => segment,
            Err(e) => {
                s.set_phase(SessionPhase::Idle);
                warn!(error = %e, "Opening generation failed");
                turn.finish(false);
                return Err(e.into());
            }
        };
        turn.record_question(segment.has_question);

        let message = TutorMessage::new(segment.segment.clone(), segment.has_question);
        s.append_message(message.clone());
        s.append_history(format!("Teacher: {}", segment.segment));

        let mut context = context;
        context.conversation_history = s.history().to_vec();
        s.set_context(context);
        s.mark_started(Utc::now());

        let outcome = if segment.has_question {
            s.set_phase(SessionPhase::AwaitingStudent);
            TurnOutcome::AwaitingStudent(message)
        } else {
            // Nothing to answer and nothing learned yet, so no credit.
            s.set_phase(SessionPhase::Completed);
            TurnOutcome::Completed(message)
        };
        drop(s);

        info!(has_question = segment.has_question, "Lesson opened");
        turn.finish(true);
        Ok(outcome)
    }

    /// Record the student's answer to the open question and generate the
    /// next segment.
    ///
    /// A blank answer, or no open question, is a no-op. On generation
    /// failure the answer stays recorded and the question stays open.
    #[instrument(skip(self, state, answer), fields(answer_len = answer.len()))]
    pub async fn submit_response(
        &self,
        state: &Mutex<SessionState>,
        answer: &str,
    ) -> Result<TurnOutcome, TutorError> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        let (generation, prompt) = {
            let mut s = state.lock().await;
            let Some(question) = s.open_question().cloned() else {
                debug!(phase = %s.phase(), "No open question, ignoring answer");
                return Ok(TurnOutcome::Ignored);
            };
            let Some(mut context) = s.context().cloned() else {
                debug!("No active lesson, ignoring answer");
                return Ok(TurnOutcome::Ignored);
            };

            // Once every question has an answer, this is a retry of the open
            // one. The history keeps both attempts.
            if context.student_responses.len() >= s.question_count() {
                context.student_responses.pop();
            }
            s.append_history(format!("Student: {}", answer));

            let response = StudentResponse {
                question: question.content.clone(),
                answer: answer.to_string(),
                timestamp: Utc::now(),
            };
            context.student_responses.push(response);

            context.conversation_history = s.history().to_vec();
            let prompt =
                build_continuation_prompt_with_window(&context, s.history(), self.history_window);
            s.set_context(context);
            s.set_phase(SessionPhase::GeneratingContinuation);
            (s.generation(), prompt)
        };
        debug!(prompt_len = prompt.len(), "Built continuation prompt");

        let turn = TurnSpan::start(TurnKind::Continuation, generation);
        let result = self.generate_segment(&prompt).instrument(turn.span().clone()).await;

        let mut s = state.lock().await;
        if s.generation() != generation {
            turn.discard();
            return Ok(TurnOutcome::Discarded);
        }

        let segment = match result {
            Ok(segment) => segment,
            Err(e) => {
                s.set_phase(SessionPhase::AwaitingStudent);
                warn!(error = %e, "Continuation generation failed");
                turn.finish(false);
                return Err(e.into());
            }
        };
        turn.record_question(segment.has_question);

        let message = TutorMessage::new(segment.segment.clone(), segment.has_question);
        s.append_message(message.clone());
        s.append_history(format!("Teacher: {}", segment.segment));

        let Some(mut context) = s.context().cloned() else {
            turn.finish(false);
            return Err(TutorError::InvalidState("lesson context disappeared".to_string()));
        };
        context.conversation_history = s.history().to_vec();

        if segment.has_question {
            s.set_context(context);
            s.set_phase(SessionPhase::AwaitingStudent);
            drop(s);
            turn.finish(true);
            return Ok(TurnOutcome::AwaitingStudent(message));
        }

        context.lesson_progress.push(context.current_topic.clone());
        let credit = ParticipationCredit::from_session(
            &context,
            s.messages(),
            s.started_at(),
            Utc::now(),
        );
        s.set_context(context);
        s.set_phase(SessionPhase::Completed);
        drop(s);

        info!(topic = %credit.topic, "Topic completed");
        turn.finish(true);

        self.award_credit(&credit).await;
        Ok(TurnOutcome::Completed(message))
    }

    async fn generate_segment(&self, prompt: &str) -> Result<Segment, ProviderError> {
        let text = self.generator.generate(prompt).await?;
        let segment = self.extractor.extract(&text);
        if segment.segment.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        debug!(
            generated_len = text.len(),
            segment_len = segment.segment.len(),
            has_question = segment.has_question,
            "Extracted segment"
        );
        Ok(segment)
    }

    /// Notify the ledger. Failures are logged and otherwise ignored.
    async fn award_credit(&self, credit: &ParticipationCredit) {
        match self.ledger.award_participation_credit(credit).await {
            Ok(()) => {
                #[cfg(feature = "telemetry")]
                GLOBAL_METRICS.increment(counters::CREDITS_AWARDED);
            }
            Err(e) => {
                #[cfg(feature = "telemetry")]
                GLOBAL_METRICS.increment(counters::CREDITS_FAILED);
                warn!(
                    error = %e,
                    subject = %credit.subject,
                    "Failed to award participation credit"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CreditError;
    use crate::types::{MockCreditLedger, MockGenerator};
    use std::sync::Arc;

    fn request() -> LessonRequest {
        LessonRequest::new("Math", "Fractions", "Asha")
    }

    fn scripted(replies: Vec<&'static str>) -> MockGenerator {
        let mut generator = MockGenerator::new();
        let mut replies = replies.into_iter();
        generator.expect_generate().returning(move |_| {
            replies
                .next()
                .map(str::to_string)
                .ok_or(ProviderError::EmptyResponse)
        });
        generator
    }

    fn no_credit() -> MockCreditLedger {
        let mut ledger = MockCreditLedger::new();
        ledger.expect_award_participation_credit().never();
        ledger
    }

    fn runner(generator: MockGenerator, ledger: MockCreditLedger) -> LessonRunner {
        LessonRunner::new(Arc::new(generator), Arc::new(ledger))
    }

    #[tokio::test]
    async fn test_start_lesson_awaits_student() {
        let runner = runner(
            scripted(vec!["Hello Asha! What do you know about fractions? Tell me. Extra text."]),
            no_credit(),
        );
        let state = Mutex::new(SessionState::new());

        let outcome = runner.start_lesson(&state, &request()).await.unwrap();
        let message = outcome.message().unwrap();
        assert_eq!(message.content, "Hello Asha! What do you know about fractions? Tell me.");
        assert!(message.awaiting_response);

        let s = state.lock().await;
        assert_eq!(s.phase(), SessionPhase::AwaitingStudent);
        assert_eq!(s.history().len(), 1);
        assert!(s.history()[0].starts_with("Teacher: Hello Asha!"));
        assert_eq!(s.context().unwrap().conversation_history.len(), 1);
        assert!(s.started_at().is_some());
    }

    #[tokio::test]
    async fn test_start_lesson_failure_stays_idle() {
        let mut generator = MockGenerator::new();
        generator
            .expect_generate()
            .returning(|_| Err(ProviderError::NetworkError("down".to_string())));
        let runner = runner(generator, no_credit());
        let state = Mutex::new(SessionState::new());

        let err = runner.start_lesson(&state, &request()).await.unwrap_err();
        assert!(matches!(err, TutorError::Generation(_)));

        let s = state.lock().await;
        assert_eq!(s.phase(), SessionPhase::Idle);
        assert!(s.context().is_none());
        assert!(s.messages().is_empty());
        assert!(s.history().is_empty());
    }

    #[tokio::test]
    async fn test_blank_generation_is_a_failure() {
        let runner = runner(scripted(vec!["   \n "]), no_credit());
        let state = Mutex::new(SessionState::new());

        let err = runner.start_lesson(&state, &request()).await.unwrap_err();
        assert!(matches!(err, TutorError::Generation(ProviderError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_opening_without_question_completes_without_credit() {
        let runner = runner(scripted(vec!["Today we learn fractions."]), no_credit());
        let state = Mutex::new(SessionState::new());

        let outcome = runner.start_lesson(&state, &request()).await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(state.lock().await.phase(), SessionPhase::Completed);
    }

    #[tokio::test]
    async fn test_submit_without_open_question_is_ignored() {
        let mut generator = MockGenerator::new();
        generator.expect_generate().never();
        let runner = runner(generator, no_credit());
        let state = Mutex::new(SessionState::new());

        let outcome = runner.submit_response(&state, "my answer").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Ignored);

        let s = state.lock().await;
        assert!(s.history().is_empty());
        assert_eq!(s.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_submit_records_answer_and_continues() {
        let runner = runner(
            scripted(vec!["Do you know halves?", "Good. Can you split 4 into halves?"]),
            no_credit(),
        );
        let state = Mutex::new(SessionState::new());
        runner.start_lesson(&state, &request()).await.unwrap();

        let outcome = runner.submit_response(&state, "  a little  ").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::AwaitingStudent(_)));

        let s = state.lock().await;
        assert_eq!(
            s.history(),
            &[
                "Teacher: Do you know halves?".to_string(),
                "Student: a little".to_string(),
                "Teacher: Good. Can you split 4 into halves?".to_string(),
            ]
        );
        let context = s.context().unwrap();
        assert_eq!(context.student_responses.len(), 1);
        assert_eq!(context.student_responses[0].question, "Do you know halves?");
        assert_eq!(context.student_responses[0].answer, "a little");
        assert_eq!(context.conversation_history.len(), 3);
    }

    #[tokio::test]
    async fn test_continuation_failure_keeps_answer() {
        let mut generator = MockGenerator::new();
        let mut calls = 0;
        generator.expect_generate().returning(move |_| {
            calls += 1;
            match calls {
                1 => Ok("Ready to begin?".to_string()),
                2 => Err(ProviderError::RateLimited("slow down".to_string())),
                _ => Ok("Great. What is one half of 6?".to_string()),
            }
        });
        let runner = runner(generator, no_credit());
        let state = Mutex::new(SessionState::new());
        runner.start_lesson(&state, &request()).await.unwrap();

        let err = runner.submit_response(&state, "yes").await.unwrap_err();
        assert!(err.is_retryable());
        {
            let s = state.lock().await;
            assert_eq!(s.phase(), SessionPhase::AwaitingStudent);
            assert_eq!(s.history().last().unwrap(), "Student: yes");
            assert_eq!(s.message_count(), 1);
            assert_eq!(s.context().unwrap().student_responses.len(), 1);
        }

        let before = state.lock().await.history().to_vec();
        runner.submit_response(&state, "yes!").await.unwrap();
        let s = state.lock().await;
        let responses = &s.context().unwrap().student_responses;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].answer, "yes!");
        assert_eq!(s.message_count(), 2);
        assert!(s.history().starts_with(&before));
        assert_eq!(
            s.history(),
            &[
                "Teacher: Ready to begin?",
                "Student: yes",
                "Student: yes!",
                "Teacher: Great. What is one half of 6?",
            ]
        );
        assert_eq!(s.context().unwrap().conversation_history, s.history());
    }

    #[tokio::test]
    async fn test_completion_awards_credit_once() {
        let mut ledger = MockCreditLedger::new();
        ledger
            .expect_award_participation_credit()
            .withf(|credit| credit.subject == "Math" && credit.questions_asked == 1)
            .times(1)
            .returning(|_| Ok(()));
        let runner = runner(
            scripted(vec!["Do you know halves?", "Great, you have understood halves."]),
            ledger,
        );
        let state = Mutex::new(SessionState::new());
        runner.start_lesson(&state, &request()).await.unwrap();

        let outcome = runner.submit_response(&state, "yes").await.unwrap();
        assert!(outcome.is_completed());

        // Nothing left to answer, so no second award.
        assert_eq!(runner.submit_response(&state, "more").await.unwrap(), TurnOutcome::Ignored);

        let s = state.lock().await;
        assert_eq!(s.phase(), SessionPhase::Completed);
        assert_eq!(s.context().unwrap().lesson_progress, vec!["Fractions".to_string()]);
    }

    #[tokio::test]
    async fn test_credit_failure_does_not_affect_state() {
        let mut ledger = MockCreditLedger::new();
        ledger
            .expect_award_participation_credit()
            .times(1)
            .returning(|_| Err(CreditError::Unavailable("offline".to_string())));
        let runner = runner(scripted(vec!["Ready?", "All done for today."]), ledger);
        let state = Mutex::new(SessionState::new());
        runner.start_lesson(&state, &request()).await.unwrap();

        let outcome = runner.submit_response(&state, "yes").await.unwrap();
        assert!(outcome.is_completed());
        assert_eq!(state.lock().await.message_count(), 2);
    }

    #[tokio::test]
    async fn test_history_window_is_applied() {
        let mut generator = MockGenerator::new();
        let mut calls = 0;
        generator.expect_generate().returning(move |prompt| {
            calls += 1;
            if calls == 3 {
                assert!(!prompt.contains("Teacher: What is turn one?"));
                assert!(prompt.contains("Student: second"));
            }
            Ok(format!("What is turn {}?", ["one", "two", "three"][calls - 1]))
        });
        let runner = runner(generator, no_credit()).with_history_window(2);
        let state = Mutex::new(SessionState::new());
        runner.start_lesson(&state, &request()).await.unwrap();
        runner.submit_response(&state, "first").await.unwrap();
        runner.submit_response(&state, "second").await.unwrap();

        let s = state.lock().await;
        assert_eq!(s.history().len(), 5);
        assert_eq!(s.history()[4], "Teacher: What is turn three?");
        assert_eq!(s.phase(), SessionPhase::AwaitingStudent);
    }
}
