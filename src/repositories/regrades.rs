use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{RegradeEntry, RegradeEpisode};
use crate::db::types::RegradeStrategy;
use crate::store::{QuizRef, RegradeOutcome, RegradeStore, RegradeUpsert, StoreError};

pub(crate) const EPISODE_COLUMNS: &str = "id, quiz_id, quiz_version, created_by, created_at";
pub(crate) const ENTRY_COLUMNS: &str =
    "id, regrade_id, quiz_question_id, regrade_option, created_at, updated_at";

/// Postgres-backed `RegradeStore`. Each `record` call runs one transaction so
/// an episode is never committed without its entry.
#[derive(Clone)]
pub struct PgRegradeStore {
    pool: PgPool,
}

impl PgRegradeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RegradeStore for PgRegradeStore {
    async fn resolve_quiz(&self, quiz_id: &str) -> Result<Option<QuizRef>, StoreError> {
        let row = sqlx::query_as::<_, (String, i32)>(
            "SELECT id, version_number
             FROM quizzes
             WHERE id = $1",
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.map(|(id, current_version)| QuizRef { id, current_version }))
    }

    async fn record(&self, upsert: RegradeUpsert<'_>) -> Result<RegradeOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let (episode, episode_created) = find_or_create_episode(
            &mut tx,
            upsert.quiz_id,
            upsert.quiz_version,
            upsert.acting_user,
            upsert.now,
        )
        .await
        .map_err(map_sqlx)?;

        let (entry, entry_created) =
            upsert_entry(&mut tx, &episode.id, upsert.question_id, upsert.strategy, upsert.now)
                .await
                .map_err(map_sqlx)?;

        tx.commit().await.map_err(map_sqlx)?;

        Ok(RegradeOutcome { episode, entry, episode_created, entry_created })
    }

    async fn find_episode(
        &self,
        quiz_id: &str,
        quiz_version: i32,
    ) -> Result<Option<RegradeEpisode>, StoreError> {
        sqlx::query_as::<_, RegradeEpisode>(&format!(
            "SELECT {EPISODE_COLUMNS}
             FROM quiz_regrades
             WHERE quiz_id = $1 AND quiz_version = $2"
        ))
        .bind(quiz_id)
        .bind(quiz_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn list_entries(&self, regrade_id: &str) -> Result<Vec<RegradeEntry>, StoreError> {
        sqlx::query_as::<_, RegradeEntry>(&format!(
            "SELECT {ENTRY_COLUMNS}
             FROM quiz_question_regrades
             WHERE regrade_id = $1
             ORDER BY quiz_question_id"
        ))
        .bind(regrade_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)
    }
}

/// Insert-if-absent-else-return-existing on the (quiz_id, quiz_version)
/// natural key. A concurrent creator is merged, not surfaced as an error.
async fn find_or_create_episode(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    quiz_id: &str,
    quiz_version: i32,
    created_by: &str,
    now: PrimitiveDateTime,
) -> Result<(RegradeEpisode, bool), sqlx::Error> {
    let inserted = sqlx::query_as::<_, RegradeEpisode>(&format!(
        "INSERT INTO quiz_regrades (id, quiz_id, quiz_version, created_by, created_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (quiz_id, quiz_version) DO NOTHING
         RETURNING {EPISODE_COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(quiz_id)
    .bind(quiz_version)
    .bind(created_by)
    .bind(now)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(episode) = inserted {
        return Ok((episode, true));
    }

    let existing = sqlx::query_as::<_, RegradeEpisode>(&format!(
        "SELECT {EPISODE_COLUMNS}
         FROM quiz_regrades
         WHERE quiz_id = $1 AND quiz_version = $2"
    ))
    .bind(quiz_id)
    .bind(quiz_version)
    .fetch_one(&mut **tx)
    .await?;

    Ok((existing, false))
}

async fn upsert_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    regrade_id: &str,
    question_id: &str,
    strategy: RegradeStrategy,
    now: PrimitiveDateTime,
) -> Result<(RegradeEntry, bool), sqlx::Error> {
    let conn: &mut PgConnection = &mut *tx;

    let existing_id = sqlx::query_scalar::<_, String>(
        "SELECT id
         FROM quiz_question_regrades
         WHERE regrade_id = $1 AND quiz_question_id = $2
         FOR UPDATE",
    )
    .bind(regrade_id)
    .bind(question_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(id) = existing_id {
        let entry = sqlx::query_as::<_, RegradeEntry>(&format!(
            "UPDATE quiz_question_regrades
             SET regrade_option = $2,
                 updated_at = $3
             WHERE id = $1
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(&id)
        .bind(strategy)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;
        return Ok((entry, false));
    }

    let entry = sqlx::query_as::<_, RegradeEntry>(&format!(
        "INSERT INTO quiz_question_regrades (
            id, regrade_id, quiz_question_id, regrade_option, created_at, updated_at
         ) VALUES ($1, $2, $3, $4, $5, $5)
         RETURNING {ENTRY_COLUMNS}"
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(regrade_id)
    .bind(question_id)
    .bind(strategy)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok((entry, true))
}

fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(db_err.to_string());
        }
    }
    StoreError::Unavailable(err.to_string())
}
