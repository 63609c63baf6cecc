use std::sync::Arc;

use thiserror::Error;

use crate::core::time::primitive_now_utc;
use crate::db::types::RegradeStrategy;
use crate::store::{RegradeOutcome, RegradeStore, RegradeUpsert, StoreError};

#[derive(Debug, Error)]
pub enum RegradeError {
    #[error("unrecognized regrade strategy: {0}")]
    InvalidStrategy(String),
    #[error("acting user is required to create a regrade episode")]
    MissingActingUser,
    #[error("quiz not found: {0}")]
    QuizNotFound(String),
    #[error("regrade bookkeeping lost a concurrent write race")]
    Conflict,
    #[error("regrade store unavailable: {0}")]
    Store(String),
}

#[derive(Debug, Clone)]
pub struct RegradeRequest<'a> {
    pub quiz_id: &'a str,
    /// Supplied by the quiz aggregate; never computed here.
    pub quiz_version: i32,
    pub question_id: &'a str,
    /// Raw strategy value; empty means "no regrade requested" and the call
    /// is a successful no-op.
    pub strategy: &'a str,
    pub acting_user: &'a str,
}

/// Records regrade episodes and entries against the durable store. Stateless
/// between calls; holds only the store handle.
#[derive(Clone)]
pub struct RegradeTracker {
    store: Arc<dyn RegradeStore>,
}

impl RegradeTracker {
    pub fn new(store: Arc<dyn RegradeStore>) -> Self {
        Self { store }
    }

    /// Upserts the regrade episode for `(quiz_id, quiz_version)` and the
    /// entry for `(question_id, episode)`. Repeated calls with the same keys
    /// converge to one episode and one entry, last write winning on the
    /// entry's strategy.
    ///
    /// Returns `Ok(None)` when no strategy was supplied.
    pub async fn record_regrade(
        &self,
        request: RegradeRequest<'_>,
    ) -> Result<Option<RegradeOutcome>, RegradeError> {
        let raw_strategy = request.strategy.trim();
        if raw_strategy.is_empty() {
            return Ok(None);
        }

        let strategy = RegradeStrategy::parse(raw_strategy)
            .ok_or_else(|| RegradeError::InvalidStrategy(raw_strategy.to_string()))?;

        let quiz = self
            .store
            .resolve_quiz(request.quiz_id)
            .await
            .map_err(map_store)?
            .ok_or_else(|| RegradeError::QuizNotFound(request.quiz_id.to_string()))?;

        // A creator identity is only needed when this call would create the
        // episode; an existing episode keeps its original creator.
        if request.acting_user.trim().is_empty() {
            let existing = self
                .store
                .find_episode(request.quiz_id, request.quiz_version)
                .await
                .map_err(map_store)?;
            if existing.is_none() {
                return Err(RegradeError::MissingActingUser);
            }
        }

        let upsert = RegradeUpsert {
            quiz_id: &quiz.id,
            quiz_version: request.quiz_version,
            question_id: request.question_id,
            strategy,
            acting_user: request.acting_user,
            now: primitive_now_utc(),
        };

        let outcome = match self.store.record(upsert.clone()).await {
            Ok(outcome) => outcome,
            Err(StoreError::Conflict(detail)) => {
                // Lost a natural-key race; re-check exactly once, by which
                // point the winner's row exists and the upsert merges.
                tracing::debug!(
                    quiz_id = request.quiz_id,
                    quiz_version = request.quiz_version,
                    detail = %detail,
                    "regrade upsert conflicted, retrying once"
                );
                match self.store.record(upsert).await {
                    Ok(outcome) => outcome,
                    Err(StoreError::Conflict(_)) => return Err(RegradeError::Conflict),
                    Err(err) => return Err(map_store(err)),
                }
            }
            Err(err) => return Err(map_store(err)),
        };

        tracing::debug!(
            quiz_id = request.quiz_id,
            quiz_version = request.quiz_version,
            question_id = request.question_id,
            strategy = strategy.as_str(),
            episode_created = outcome.episode_created,
            entry_created = outcome.entry_created,
            "recorded question regrade"
        );

        Ok(Some(outcome))
    }
}

fn map_store(err: StoreError) -> RegradeError {
    match err {
        StoreError::Conflict(_) => RegradeError::Conflict,
        StoreError::Unavailable(detail) => RegradeError::Store(detail),
    }
}
