use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::QuizQuestion;
use crate::db::types::QuestionState;

pub(crate) const COLUMNS: &str =
    "id, quiz_id, position, state, question_data, created_at, updated_at";

pub struct UpsertQuestion<'a> {
    pub id: &'a str,
    pub quiz_id: &'a str,
    pub position: i32,
    pub question_data: serde_json::Value,
    pub now: PrimitiveDateTime,
}

pub async fn upsert(pool: &PgPool, params: UpsertQuestion<'_>) -> Result<QuizQuestion, sqlx::Error> {
    sqlx::query_as::<_, QuizQuestion>(&format!(
        "INSERT INTO quiz_questions (id, quiz_id, position, state, question_data, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         ON CONFLICT (id) DO UPDATE
         SET position = EXCLUDED.position,
             question_data = EXCLUDED.question_data,
             updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.quiz_id)
    .bind(params.position)
    .bind(QuestionState::Active)
    .bind(sqlx::types::Json(params.question_data))
    .bind(params.now)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, question_id: &str) -> Result<Option<QuizQuestion>, sqlx::Error> {
    sqlx::query_as::<_, QuizQuestion>(&format!(
        "SELECT {COLUMNS}
         FROM quiz_questions
         WHERE id = $1"
    ))
    .bind(question_id)
    .fetch_optional(pool)
    .await
}

pub async fn list_active_by_quiz(
    pool: &PgPool,
    quiz_id: &str,
) -> Result<Vec<QuizQuestion>, sqlx::Error> {
    sqlx::query_as::<_, QuizQuestion>(&format!(
        "SELECT {COLUMNS}
         FROM quiz_questions
         WHERE quiz_id = $1 AND state = 'active'
         ORDER BY position"
    ))
    .bind(quiz_id)
    .fetch_all(pool)
    .await
}

/// Next free position at the end of the quiz, counting active questions only.
pub async fn next_position(pool: &PgPool, quiz_id: &str) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(position), 0) + 1
         FROM quiz_questions
         WHERE quiz_id = $1 AND state = 'active'",
    )
    .bind(quiz_id)
    .fetch_one(pool)
    .await
}

/// Questions are retired, never hard-deleted; regrade entries keep pointing
/// at them.
pub async fn soft_delete(
    pool: &PgPool,
    question_id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE quiz_questions
         SET state = 'deleted',
             updated_at = $2
         WHERE id = $1 AND state = 'active'",
    )
    .bind(question_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
