// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core types for the tutoring engine.
//!
//! This module defines the data model of a tutoring session (messages,
//! pedagogical context, saved records) and the traits through which the
//! engine talks to its external collaborators: the content-generation
//! service, the durable session store and the credit ledger.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::error::{CreditError, ProviderError, SessionError};

/// Identifier of a durable session record.
pub type SessionId = String;

// ============================================================================
// Messages
// ============================================================================

/// One rendered turn of teacher output.
///
/// Immutable once created; the session only ever appends new messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorMessage {
    pub id: String,
    /// Extracted segment shown to the student.
    pub content: String,
    /// Whether the segment ends in an embedded question.
    pub is_question: bool,
    /// True iff `is_question` and the session paused for student input.
    pub awaiting_response: bool,
    pub created_at: DateTime<Utc>,
}

impl TutorMessage {
    /// Create a teacher message from an extracted segment.
    pub fn new(content: impl Into<String>, is_question: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            is_question,
            awaiting_response: is_question,
            created_at: Utc::now(),
        }
    }
}

/// One completed question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentResponse {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Session configuration enums
// ============================================================================

/// Error type for parsing one of the closed session option enums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptionError {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for ParseOptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.value)
    }
}

impl std::error::Error for ParseOptionError {}

/// Lesson difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    #[default]
    Beginner,
    Medium,
    Advanced,
}

impl Difficulty {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Medium => "medium",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "easy" => Ok(Self::Beginner),
            "medium" | "intermediate" => Ok(Self::Medium),
            "advanced" | "hard" => Ok(Self::Advanced),
            _ => Err(ParseOptionError { field: "difficulty", value: s.to_string() }),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the tutor presents material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LearningMode {
    #[default]
    Interactive,
    Storytelling,
    ExampleDriven,
}

impl LearningMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Storytelling => "storytelling",
            Self::ExampleDriven => "example-driven",
        }
    }

    /// Style instruction for the generation service.
    pub fn style_hint(&self) -> &'static str {
        match self {
            Self::Interactive => "Engage the student with short exchanges and frequent checks.",
            Self::Storytelling => "Teach through a small story or scenario the student can follow.",
            Self::ExampleDriven => "Teach through concrete, everyday worked examples.",
        }
    }
}

impl FromStr for LearningMode {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interactive" => Ok(Self::Interactive),
            "storytelling" | "story" => Ok(Self::Storytelling),
            "example-driven" | "example_driven" | "examples" => Ok(Self::ExampleDriven),
            _ => Err(ParseOptionError { field: "learning mode", value: s.to_string() }),
        }
    }
}

impl fmt::Display for LearningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the student already knows about the chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorKnowledge {
    #[default]
    None,
    Basic,
    Intermediate,
    Advanced,
}

impl PriorKnowledge {
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "no prior knowledge",
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for PriorKnowledge {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "new" => Ok(Self::None),
            "basic" => Ok(Self::Basic),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(ParseOptionError { field: "prior knowledge", value: s.to_string() }),
        }
    }
}

impl fmt::Display for PriorKnowledge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Language the tutor speaks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TeachingLanguage {
    #[default]
    English,
    Hindi,
    Hinglish,
}

impl TeachingLanguage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hindi => "Hindi",
            Self::Hinglish => "Hinglish (Hindi and English mixed, Latin script)",
        }
    }
}

impl FromStr for TeachingLanguage {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "english" | "en" => Ok(Self::English),
            "hindi" | "hi" => Ok(Self::Hindi),
            "hinglish" => Ok(Self::Hinglish),
            _ => Err(ParseOptionError { field: "language", value: s.to_string() }),
        }
    }
}

impl fmt::Display for TeachingLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::English => f.write_str("english"),
            Self::Hindi => f.write_str("hindi"),
            Self::Hinglish => f.write_str("hinglish"),
        }
    }
}

// ============================================================================
// Session context
// ============================================================================

/// Inputs captured when a lesson starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRequest {
    pub subject: String,
    pub chapter: String,
    /// Starting topic; defaults to the chapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub student_name: String,
    #[serde(default)]
    pub prior_knowledge: PriorKnowledge,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub learning_mode: LearningMode,
    #[serde(default)]
    pub language: TeachingLanguage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_requirements: Option<String>,
}

impl LessonRequest {
    pub fn new(
        subject: impl Into<String>,
        chapter: impl Into<String>,
        student_name: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            chapter: chapter.into(),
            student_name: student_name.into(),
            ..Default::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn with_learning_mode(mut self, mode: LearningMode) -> Self {
        self.learning_mode = mode;
        self
    }

    pub fn with_prior_knowledge(mut self, level: PriorKnowledge) -> Self {
        self.prior_knowledge = level;
        self
    }

    pub fn with_language(mut self, language: TeachingLanguage) -> Self {
        self.language = language;
        self
    }

    pub fn with_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.additional_requirements = Some(requirements.into());
        self
    }
}

/// The pedagogical state of one tutoring session.
///
/// Treated as an immutable snapshot: updates build a new value and swap it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub subject: String,
    pub chapter: String,
    pub current_topic: String,
    pub student_name: String,
    pub prior_knowledge: PriorKnowledge,
    pub difficulty: Difficulty,
    pub learning_mode: LearningMode,
    #[serde(default)]
    pub language: TeachingLanguage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_requirements: Option<String>,
    /// Topic markers covered so far (append-only).
    #[serde(default)]
    pub lesson_progress: Vec<String>,
    #[serde(default)]
    pub student_responses: Vec<StudentResponse>,
    /// `Teacher: …` / `Student: …` transcript used to re-prompt the generator.
    #[serde(default)]
    pub conversation_history: Vec<String>,
}

impl SessionContext {
    /// Build a fresh context with empty progress, responses and history.
    pub fn from_request(request: &LessonRequest) -> Self {
        let current_topic = request
            .topic
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| request.chapter.clone());

        Self {
            subject: request.subject.clone(),
            chapter: request.chapter.clone(),
            current_topic,
            student_name: request.student_name.clone(),
            prior_knowledge: request.prior_knowledge,
            difficulty: request.difficulty,
            learning_mode: request.learning_mode,
            language: request.language,
            additional_requirements: request.additional_requirements.clone(),
            lesson_progress: Vec::new(),
            student_responses: Vec::new(),
            conversation_history: Vec::new(),
        }
    }
}

// ============================================================================
// Durable records
// ============================================================================

/// The unit stored by the session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: SessionId,
    pub title: String,
    pub subject: String,
    pub chapter: String,
    pub student_name: String,
    pub messages: Vec<TutorMessage>,
    pub context: SessionContext,
    pub timestamp: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a new record with a freshly generated id.
    pub fn new(messages: Vec<TutorMessage>, context: SessionContext) -> Self {
        Self {
            id: Self::generate_id(),
            title: format!("{} - {}", context.subject, context.chapter),
            subject: context.subject.clone(),
            chapter: context.chapter.clone(),
            student_name: context.student_name.clone(),
            messages,
            context,
            timestamp: Utc::now(),
        }
    }

    /// Generate a unique session ID based on timestamp and UUID.
    pub fn generate_id() -> SessionId {
        let now = Utc::now();
        let short_uuid = &uuid::Uuid::new_v4().to_string()[..8];
        format!("tutor-{}-{}", now.format("%Y-%m-%d-%H-%M-%S"), short_uuid)
    }
}

/// Record metadata for listing (without messages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub student_name: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Format the summary for display.
    pub fn format(&self) -> String {
        format!(
            "{} [{}] ({} msgs) - {} - {}",
            self.title,
            self.student_name,
            self.message_count,
            self.updated_at.format("%Y-%m-%d %H:%M"),
            self.id
        )
    }
}

impl From<&SessionRecord> for SessionSummary {
    fn from(record: &SessionRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            student_name: record.student_name.clone(),
            message_count: record.messages.len(),
            updated_at: record.timestamp,
        }
    }
}

/// Participation credit sent to the ledger when a topic completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationCredit {
    pub subject: String,
    pub topic: String,
    pub questions_asked: usize,
    pub correct_answers: usize,
    pub total_questions: usize,
    /// Coarse duration estimate in minutes.
    pub session_duration: u32,
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Content-generation service: text in, text out.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate free-form text for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Name of this generator for display purposes.
    fn name(&self) -> &str;
}

/// Durable store for saved sessions.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a brand-new record and return its id.
    async fn create_session(&self, record: &SessionRecord) -> Result<SessionId, SessionError>;

    /// Overwrite the messages and context of an existing record and refresh its timestamp.
    async fn update_session(
        &self,
        id: &str,
        messages: &[TutorMessage],
        context: &SessionContext,
    ) -> Result<(), SessionError>;

    /// Load a record by id.
    async fn load_session(&self, id: &str) -> Result<Option<SessionRecord>, SessionError>;

    /// List saved sessions, most recently updated first.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, SessionError>;
}

/// Rewards ledger notified when a topic is completed.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn award_participation_credit(
        &self,
        credit: &ParticipationCredit,
    ) -> Result<(), CreditError>;
}

/// Shared generator reference.
pub type SharedGenerator = Arc<dyn Generator>;

/// Shared session store reference.
pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Shared credit ledger reference.
pub type SharedCreditLedger = Arc<dyn CreditLedger>;
