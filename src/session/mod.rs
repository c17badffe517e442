// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tutoring sessions: state, turns, persistence and autosave.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SessionManager                         │
//! │   (start, resume, answer, autosave, teardown save, reset)    │
//! └──────────────────────────────────────────────────────────────┘
//!          │                    │                       │
//!          ▼                    ▼                       ▼
//! ┌─────────────────┐ ┌───────────────────┐ ┌────────────────────┐
//! │  LessonRunner   │ │  AutosaveTracker  │ │    SessionStore    │
//! │ (turns, credit) │ │ (cadence, dedup)  │ │ (SQLite / memory)  │
//! └─────────────────┘ └───────────────────┘ └────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────┐
//! │ SessionState (Arc<Mutex<>>) │
//! └─────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tutor::credit::TracingLedger;
//! use tutor::session::{LessonRunner, SessionManager, SqliteSessionStore};
//! use tutor::types::LessonRequest;
//!
//! let lessons = LessonRunner::new(generator, Arc::new(TracingLedger));
//! let store = Arc::new(SqliteSessionStore::open_default()?);
//! let manager = SessionManager::new(lessons, store);
//!
//! let opening = manager.start_lesson(&LessonRequest::new("Maths", "Fractions", "Asha")).await?;
//! let next = manager.submit_response("I know halves").await?;
//! manager.save_on_teardown().await;
//! ```

pub mod autosave;
pub mod lesson;
pub mod manager;
pub mod state;
pub mod storage;

pub use autosave::{AutosavePolicy, AutosaveTracker, SaveTarget, SkipReason};
pub use lesson::{LessonRunner, TurnOutcome};
pub use manager::{ManagerOptions, SaveOutcome, SessionManager, SessionSnapshot};
pub use state::{SessionPhase, SessionState};
pub use storage::{InMemorySessionStore, SqliteSessionStore, SCHEMA_VERSION};
