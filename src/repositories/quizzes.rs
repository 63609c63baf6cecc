use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Quiz;

pub(crate) const COLUMNS: &str =
    "id, title, version_number, created_by, created_at, updated_at";

pub struct CreateQuiz<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub created_by: &'a str,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

pub async fn create(pool: &PgPool, params: CreateQuiz<'_>) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (id, title, version_number, created_by, created_at, updated_at)
         VALUES ($1, $2, 1, $3, $4, $5)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.created_by)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, quiz_id: &str) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS}
         FROM quizzes
         WHERE id = $1"
    ))
    .bind(quiz_id)
    .fetch_optional(pool)
    .await
}

pub async fn current_version(pool: &PgPool, quiz_id: &str) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT version_number
         FROM quizzes
         WHERE id = $1",
    )
    .bind(quiz_id)
    .fetch_optional(pool)
    .await
}

/// Stamps a new quiz version when the question set is finalized. Returns the
/// new version number, or `None` for an unknown quiz.
pub async fn finalize(
    pool: &PgPool,
    quiz_id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "UPDATE quizzes
         SET version_number = version_number + 1,
             updated_at = $2
         WHERE id = $1
         RETURNING version_number",
    )
    .bind(quiz_id)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn touch(pool: &PgPool, quiz_id: &str, now: PrimitiveDateTime) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE quizzes
         SET updated_at = $2
         WHERE id = $1",
    )
    .bind(quiz_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}
