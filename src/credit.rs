// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Participation credit: computing awards and ledgers that receive them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::error::CreditError;
use crate::types::{CreditLedger, ParticipationCredit, SessionContext, TutorMessage};

impl ParticipationCredit {
    /// Derive the award for a completed topic.
    ///
    /// Answers are not graded, so every recorded answer counts as correct.
    /// The duration is rounded up to whole minutes and is at least one.
    pub fn from_session(
        context: &SessionContext,
        messages: &[TutorMessage],
        started_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let questions = messages.iter().filter(|m| m.is_question).count();
        let elapsed_secs = started_at
            .map(|at| (now - at).num_seconds().max(0))
            .unwrap_or(0);
        let minutes = ((elapsed_secs + 59) / 60).max(1);

        Self {
            subject: context.subject.clone(),
            topic: context.current_topic.clone(),
            questions_asked: questions,
            correct_answers: context.student_responses.len(),
            total_questions: questions,
            session_duration: u32::try_from(minutes).unwrap_or(u32::MAX),
        }
    }
}

/// Ledger that only logs awards.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLedger;

#[async_trait]
impl CreditLedger for TracingLedger {
    async fn award_participation_credit(
        &self,
        credit: &ParticipationCredit,
    ) -> Result<(), CreditError> {
        tracing::info!(
            subject = %credit.subject,
            topic = %credit.topic,
            questions = credit.questions_asked,
            answers = credit.correct_answers,
            minutes = credit.session_duration,
            "Participation credit awarded"
        );
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LedgerEntry<'a> {
    awarded_at: DateTime<Utc>,
    #[serde(flatten)]
    credit: &'a ParticipationCredit,
}

/// Ledger appending one JSON object per award to a file.
#[derive(Debug, Clone)]
pub struct JsonlLedger {
    path: PathBuf,
}

impl JsonlLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CreditLedger for JsonlLedger {
    async fn award_participation_credit(
        &self,
        credit: &ParticipationCredit,
    ) -> Result<(), CreditError> {
        let entry = LedgerEntry {
            awarded_at: Utc::now(),
            credit,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| CreditError::Unavailable(format!("{}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
