// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session stores: SQLite-backed and in-memory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
#[cfg(feature = "telemetry")]
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use crate::error::SessionError;
use crate::types::{
    SessionContext, SessionId, SessionRecord, SessionStore, SessionSummary, TutorMessage,
};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Session store using SQLite.
///
/// Messages and context are stored as JSON columns; the remaining columns
/// exist for listing without deserializing whole transcripts.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteSessionStore {
    /// Open or create the default database under `~/.tutor/`.
    pub fn open_default() -> Result<Self, SessionError> {
        let path = crate::config::default_database_path().ok_or_else(|| {
            SessionError::IoError("Could not determine home directory".to_string())
        })?;
        Self::open_at(&path)
    }

    /// Open or create a session database at a specific path.
    pub fn open_at(db_path: &Path) -> Result<Self, SessionError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SessionError::IoError(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| {
            SessionError::LoadFailed(format!("Failed to open sessions database: {}", e))
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| SessionError::LoadFailed(format!("Failed to set pragmas: {}", e)))?;

        init_schema(&conn)?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("session.storage.open", start.elapsed());

        Ok(Self {
            conn: Mutex::new(conn),
            path: db_path.to_path_buf(),
        })
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete a record. Returns whether anything was removed.
    pub async fn delete_session(&self, id: &str) -> Result<bool, SessionError> {
        let conn = self.conn.lock().await;
        let rows = conn
            .execute("DELETE FROM tutor_sessions WHERE id = ?", params![id])
            .map_err(|e| SessionError::SaveFailed(format!("Failed to delete session: {}", e)))?;
        Ok(rows > 0)
    }
}

fn init_schema(conn: &Connection) -> Result<(), SessionError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS tutor_sessions (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            subject TEXT NOT NULL,
            chapter TEXT NOT NULL,
            student_name TEXT NOT NULL,
            messages TEXT NOT NULL,
            context TEXT NOT NULL,
            message_count INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tutor_sessions_updated_at ON tutor_sessions(updated_at DESC);
        "#,
    )
    .map_err(|e| SessionError::LoadFailed(format!("Failed to create schema: {}", e)))?;

    let current_version: Option<u32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| SessionError::LoadFailed(format!("Failed to get schema version: {}", e)))?;

    if current_version.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?)",
            params![SCHEMA_VERSION],
        )
        .map_err(|e| SessionError::SaveFailed(format!("Failed to set schema version: {}", e)))?;
    }

    Ok(())
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create_session(&self, record: &SessionRecord) -> Result<SessionId, SessionError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let messages_json = serde_json::to_string(&record.messages)?;
        let context_json = serde_json::to_string(&record.context)?;
        let now = record.timestamp.timestamp_millis();

        let conn = self.conn.lock().await;
        conn.execute(
            r#"
            INSERT INTO tutor_sessions (
                id, title, subject, chapter, student_name,
                messages, context, message_count, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.id,
                record.title,
                record.subject,
                record.chapter,
                record.student_name,
                messages_json,
                context_json,
                record.messages.len() as i64,
                now,
                now,
            ],
        )
        .map_err(|e| SessionError::SaveFailed(format!("Failed to create session: {}", e)))?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("session.storage.create", start.elapsed());

        Ok(record.id.clone())
    }

    async fn update_session(
        &self,
        id: &str,
        messages: &[TutorMessage],
        context: &SessionContext,
    ) -> Result<(), SessionError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let messages_json = serde_json::to_string(messages)?;
        let context_json = serde_json::to_string(context)?;

        let conn = self.conn.lock().await;
        let rows = conn
            .execute(
                r#"
            UPDATE tutor_sessions SET
                messages = ?, context = ?, message_count = ?, updated_at = ?
            WHERE id = ?
            "#,
                params![
                    messages_json,
                    context_json,
                    messages.len() as i64,
                    Utc::now().timestamp_millis(),
                    id,
                ],
            )
            .map_err(|e| SessionError::SaveFailed(format!("Failed to update session: {}", e)))?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("session.storage.update", start.elapsed());

        if rows == 0 {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<Option<SessionRecord>, SessionError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                r#"
            SELECT id, title, subject, chapter, student_name, messages, context, updated_at
            FROM tutor_sessions WHERE id = ?
            "#,
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, i64>(7)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| SessionError::LoadFailed(format!("Failed to get session: {}", e)))?;
        drop(conn);

        let Some((id, title, subject, chapter, student_name, messages, context, updated_at)) = row
        else {
            return Ok(None);
        };

        let record = SessionRecord {
            id,
            title,
            subject,
            chapter,
            student_name,
            messages: serde_json::from_str(&messages)?,
            context: serde_json::from_str(&context)?,
            timestamp: from_millis(updated_at),
        };

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("session.storage.get", start.elapsed());

        Ok(Some(record))
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, SessionError> {
        #[cfg(feature = "telemetry")]
        let start = Instant::now();

        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                r#"
            SELECT id, title, student_name, message_count, updated_at
            FROM tutor_sessions
            ORDER BY updated_at DESC
            "#,
            )
            .map_err(|e| SessionError::LoadFailed(format!("Failed to prepare query: {}", e)))?;

        let sessions = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    student_name: row.get(2)?,
                    message_count: row.get::<_, i64>(3)? as usize,
                    updated_at: from_millis(row.get(4)?),
                })
            })
            .map_err(|e| SessionError::LoadFailed(format!("Failed to query sessions: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SessionError::LoadFailed(format!("Failed to collect sessions: {}", e)))?;

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("session.storage.list", start.elapsed());

        Ok(sessions)
    }
}

/// Volatile store used by tests and benchmarks.
#[derive(Default)]
pub struct InMemorySessionStore {
    records: Mutex<HashMap<SessionId, SessionRecord>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, record: &SessionRecord) -> Result<SessionId, SessionError> {
        let mut records = self.records.lock().await;
        if records.contains_key(&record.id) {
            return Err(SessionError::SaveFailed(format!(
                "Session already exists: {}",
                record.id
            )));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(record.id.clone())
    }

    async fn update_session(
        &self,
        id: &str,
        messages: &[TutorMessage],
        context: &SessionContext,
    ) -> Result<(), SessionError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        record.messages = messages.to_vec();
        record.context = context.clone();
        record.timestamp = Utc::now();
        Ok(())
    }

    async fn load_session(&self, id: &str) -> Result<Option<SessionRecord>, SessionError> {
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, SessionError> {
        let records = self.records.lock().await;
        let mut sessions: Vec<SessionSummary> =
            records.values().map(SessionSummary::from).collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LessonRequest;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteSessionStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteSessionStore::open_at(&temp_dir.path().join("sessions.db")).unwrap();
        (store, temp_dir)
    }

    fn sample_record(subject: &str) -> SessionRecord {
        let request = LessonRequest::new(subject, "Fractions", "Asha");
        let context = SessionContext::from_request(&request);
        let messages = vec![TutorMessage::new("What is a fraction?", true)];
        SessionRecord::new(messages, context)
    }

    #[tokio::test]
    async fn test_create_and_load_session() {
        let (store, _temp) = create_test_store();
        let record = sample_record("Math");

        let id = store.create_session(&record).await.unwrap();
        assert_eq!(id, record.id);

        let loaded = store.load_session(&id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Math - Fractions");
        assert_eq!(loaded.messages, record.messages);
        assert_eq!(loaded.context, record.context);
    }

    #[tokio::test]
    async fn test_update_session_replaces_messages_and_context() {
        let (store, _temp) = create_test_store();
        let record = sample_record("Math");
        let id = store.create_session(&record).await.unwrap();

        let mut messages = record.messages.clone();
        messages.push(TutorMessage::new("Good. Now halves.", false));
        let mut context = record.context.clone();
        context.conversation_history.push("Student: a part".to_string());

        store.update_session(&id, &messages, &context).await.unwrap();

        let loaded = store.load_session(&id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.context.conversation_history, vec!["Student: a part"]);
    }

    #[tokio::test]
    async fn test_update_missing_session_is_not_found() {
        let (store, _temp) = create_test_store();
        let record = sample_record("Math");
        let err = store
            .update_session("nope", &record.messages, &record.context)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_and_delete_sessions() {
        let (store, _temp) = create_test_store();
        for subject in ["Math", "Science", "History"] {
            store.create_session(&sample_record(subject)).await.unwrap();
        }

        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 3);
        assert!(sessions.iter().all(|s| s.message_count == 1));

        assert!(store.delete_session(&sessions[0].id).await.unwrap());
        assert_eq!(store.list_sessions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_session() {
        let (store, _temp) = create_test_store();
        assert!(store.load_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reopen_keeps_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("sessions.db");
        let record = sample_record("Math");
        {
            let store = SqliteSessionStore::open_at(&path).unwrap();
            store.create_session(&record).await.unwrap();
        }
        let store = SqliteSessionStore::open_at(&path).unwrap();
        assert!(store.load_session(&record.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = InMemorySessionStore::new();
        assert!(store.is_empty().await);

        let record = sample_record("Math");
        let id = store.create_session(&record).await.unwrap();
        assert!(store.create_session(&record).await.is_err());

        store
            .update_session(&id, &[], &record.context)
            .await
            .unwrap();
        let loaded = store.load_session(&id).await.unwrap().unwrap();
        assert!(loaded.messages.is_empty());
        assert_eq!(store.len().await, 1);
        assert_eq!(store.list_sessions().await.unwrap()[0].message_count, 0);
    }
}
