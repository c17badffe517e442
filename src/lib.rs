// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tutor - an interactive tutoring session engine.
//!
//! A teacher persona delivers a lesson one short segment at a time, pauses
//! at each embedded question, and continues from the student's answer. The
//! engine owns the session state, persists it on a schedule, and awards a
//! participation credit when a lesson completes.
//!
//! # Architecture
//!
//! - [`types`] - Session data model and collaborator traits
//! - [`error`] - Error types and result aliases
//! - [`config`] - Configuration loading and merging
//! - [`extract`] - First-segment extraction and question detection
//! - [`prompt`] - Opening and continuation prompt construction
//! - [`providers`] - Content generators (Anthropic, OpenAI, Ollama)
//! - [`session`] - Session state, lesson turns, persistence and autosave
//! - [`credit`] - Participation credit computation and ledgers
//! - [`telemetry`] - Tracing and metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tutor::{LessonRequest, LessonRunner, SessionManager, SqliteSessionStore, TracingLedger};
//!
//! let generator = tutor::create_generator_from_env()?;
//! let lessons = LessonRunner::new(generator, Arc::new(TracingLedger));
//! let manager = SessionManager::new(lessons, Arc::new(SqliteSessionStore::open_default()?));
//!
//! let outcome = manager
//!     .start_lesson(&LessonRequest::new("Science", "Photosynthesis", "Asha"))
//!     .await?;
//! ```

pub mod config;
pub mod credit;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod providers;
pub mod session;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use credit::{JsonlLedger, TracingLedger};
pub use error::{ConfigError, CreditError, ProviderError, Result, SessionError, TutorError};
pub use extract::{extract_first_segment, Segment, SegmentExtractor};
pub use providers::{
    create_generator, create_generator_from_config, create_generator_from_env, AnthropicGenerator,
    GeneratorConfig, OpenAIGenerator, ProviderType,
};
pub use session::{
    InMemorySessionStore, LessonRunner, SaveOutcome, SessionManager, SessionPhase,
    SqliteSessionStore, TurnOutcome,
};
pub use types::{
    // Session data
    LessonRequest, SessionContext, SessionId, SessionRecord, SessionSummary, StudentResponse,
    TutorMessage,
    // Lesson options
    Difficulty, LearningMode, PriorKnowledge, TeachingLanguage,
    // Collaborators
    CreditLedger, Generator, ParticipationCredit, SessionStore, SharedCreditLedger,
    SharedGenerator, SharedSessionStore,
};

/// Tutor version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        let request = LessonRequest::new("Maths", "Fractions", "Asha");
        let context = SessionContext::from_request(&request);
        assert_eq!(context.subject, "Maths");
        assert!(extract_first_segment("Hi there. More").segment.starts_with("Hi"));
    }
}
