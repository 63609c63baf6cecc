use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{QuestionState, RegradeStrategy};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    /// Bumped each time the question set is finalized, never by regrade
    /// bookkeeping.
    pub version_number: i32,
    pub created_by: String,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizQuestion {
    pub id: String,
    pub quiz_id: String,
    pub position: i32,
    pub state: QuestionState,
    pub question_data: Json<serde_json::Value>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

/// One regrade event scoped to a single quiz version. At most one row per
/// (quiz_id, quiz_version).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegradeEpisode {
    pub id: String,
    pub quiz_id: String,
    pub quiz_version: i32,
    pub created_by: String,
    pub created_at: PrimitiveDateTime,
}

/// One question's participation in a regrade episode. At most one row per
/// (quiz_question_id, regrade_id); the strategy is overwritten in place on
/// repeated saves.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegradeEntry {
    pub id: String,
    pub regrade_id: String,
    pub quiz_question_id: String,
    pub regrade_option: RegradeStrategy,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}
