use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::core::time::primitive_now_utc;
use crate::db::models::QuizQuestion;
use crate::repositories::regrades::PgRegradeStore;
use crate::repositories::{questions, quizzes};
use crate::schemas::question::{PayloadError, QuestionSave};
use crate::services::regrade_tracker::{RegradeError, RegradeRequest, RegradeTracker};

#[derive(Debug, Error)]
pub enum QuestionSaveError {
    #[error("quiz not found: {0}")]
    QuizNotFound(String),
    #[error("question not found: {0}")]
    QuestionNotFound(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Regrade(#[from] RegradeError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct SaveQuestion<'a> {
    pub quiz_id: &'a str,
    /// Stable question identity; new on first save, reused on edits.
    pub question_id: &'a str,
    /// Absent position means "append after the last active question".
    pub position: Option<i32>,
    /// Raw payload, possibly carrying `regrade_option` / `regrade_user`.
    pub data: serde_json::Value,
}

/// Persists question payloads and keeps regrade bookkeeping in lockstep:
/// when a save carries a regrade directive, the episode and entry are
/// recorded against the quiz's current version before the question row is
/// committed, and a bookkeeping failure fails the save.
pub struct QuestionWriter {
    pool: PgPool,
    tracker: RegradeTracker,
}

impl QuestionWriter {
    pub fn new(pool: PgPool) -> Self {
        let tracker = RegradeTracker::new(Arc::new(PgRegradeStore::new(pool.clone())));
        Self { pool, tracker }
    }

    pub async fn save_question(
        &self,
        save: SaveQuestion<'_>,
    ) -> Result<QuizQuestion, QuestionSaveError> {
        let quiz = quizzes::find_by_id(&self.pool, save.quiz_id)
            .await?
            .ok_or_else(|| QuestionSaveError::QuizNotFound(save.quiz_id.to_string()))?;

        let QuestionSave { mut payload, directive } = crate::schemas::question::decode_save(save.data)?;
        payload.filter_blank_answers();
        let display_name = payload.display_name().to_string();
        payload.name = Some(display_name);

        if let Some(directive) = directive {
            self.tracker
                .record_regrade(RegradeRequest {
                    quiz_id: &quiz.id,
                    quiz_version: quiz.version_number,
                    question_id: save.question_id,
                    strategy: &directive.strategy,
                    acting_user: directive.acting_user.as_deref().unwrap_or(""),
                })
                .await?;
        }

        let now = primitive_now_utc();
        let position = match save.position {
            Some(position) => position,
            None => questions::next_position(&self.pool, &quiz.id).await?,
        };

        let question_data = serde_json::to_value(&payload).map_err(PayloadError::Malformed)?;
        let row = questions::upsert(
            &self.pool,
            questions::UpsertQuestion {
                id: save.question_id,
                quiz_id: &quiz.id,
                position,
                question_data,
                now,
            },
        )
        .await?;

        quizzes::touch(&self.pool, &quiz.id, now).await?;

        tracing::debug!(
            quiz_id = %quiz.id,
            question_id = %row.id,
            position = row.position,
            "saved quiz question"
        );

        Ok(row)
    }

    /// Soft-deletes a question and marks its quiz edited. Regrade entries
    /// referencing the question stay in place.
    pub async fn delete_question(&self, question_id: &str) -> Result<(), QuestionSaveError> {
        let question = questions::find_by_id(&self.pool, question_id)
            .await?
            .ok_or_else(|| QuestionSaveError::QuestionNotFound(question_id.to_string()))?;

        let now = primitive_now_utc();
        questions::soft_delete(&self.pool, question_id, now).await?;
        quizzes::touch(&self.pool, &question.quiz_id, now).await?;

        Ok(())
    }
}
