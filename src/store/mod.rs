pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::{RegradeEntry, RegradeEpisode};
use crate::db::types::RegradeStrategy;

pub use memory::MemoryRegradeStore;

/// Quiz aggregate view as seen by regrade bookkeeping. The store resolves
/// identities and supplies the current version; this crate never computes
/// version numbers.
#[derive(Debug, Clone)]
pub struct QuizRef {
    pub id: String,
    pub current_version: i32,
}

#[derive(Debug, Clone)]
pub struct RegradeUpsert<'a> {
    pub quiz_id: &'a str,
    pub quiz_version: i32,
    pub question_id: &'a str,
    pub strategy: RegradeStrategy,
    /// Recorded as episode creator only when the episode does not yet exist.
    pub acting_user: &'a str,
    pub now: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub struct RegradeOutcome {
    pub episode: RegradeEpisode,
    pub entry: RegradeEntry,
    pub episode_created: bool,
    pub entry_created: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent writer won the natural-key race; the caller may re-check
    /// once and retry.
    #[error("natural-key conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable-store seam for regrade bookkeeping. Implementations must enforce
/// natural-key uniqueness for episodes (quiz_id, quiz_version) and entries
/// (regrade_id, quiz_question_id), and must commit the episode find-or-create
/// and the entry upsert of a single `record` call together.
#[async_trait]
pub trait RegradeStore: Send + Sync {
    async fn resolve_quiz(&self, quiz_id: &str) -> Result<Option<QuizRef>, StoreError>;

    async fn record(&self, upsert: RegradeUpsert<'_>) -> Result<RegradeOutcome, StoreError>;

    async fn find_episode(
        &self,
        quiz_id: &str,
        quiz_version: i32,
    ) -> Result<Option<RegradeEpisode>, StoreError>;

    async fn list_entries(&self, regrade_id: &str) -> Result<Vec<RegradeEntry>, StoreError>;
}
