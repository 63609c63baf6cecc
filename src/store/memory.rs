use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::models::{RegradeEntry, RegradeEpisode};
use crate::store::{QuizRef, RegradeOutcome, RegradeStore, RegradeUpsert, StoreError};

/// In-memory `RegradeStore` with the same upsert semantics as the Postgres
/// implementation. Intended for tests and for embedding without a database.
#[derive(Default)]
pub struct MemoryRegradeStore {
    inner: Mutex<State>,
}

#[derive(Default)]
struct State {
    quiz_versions: HashMap<String, i32>,
    episodes: HashMap<(String, i32), RegradeEpisode>,
    // keyed by (regrade_id, quiz_question_id)
    entries: HashMap<(String, String), RegradeEntry>,
}

impl MemoryRegradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_quiz(&self, quiz_id: &str, current_version: i32) {
        if let Ok(mut state) = self.inner.lock() {
            state.quiz_versions.insert(quiz_id.to_string(), current_version);
        }
    }

    pub fn episode_count(&self) -> usize {
        self.inner.lock().map(|state| state.episodes.len()).unwrap_or(0)
    }

    pub fn entry_count(&self) -> usize {
        self.inner.lock().map(|state| state.entries.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Unavailable("state lock poisoned".into()))
    }
}

#[async_trait]
impl RegradeStore for MemoryRegradeStore {
    async fn resolve_quiz(&self, quiz_id: &str) -> Result<Option<QuizRef>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .quiz_versions
            .get(quiz_id)
            .map(|version| QuizRef { id: quiz_id.to_string(), current_version: *version }))
    }

    async fn record(&self, upsert: RegradeUpsert<'_>) -> Result<RegradeOutcome, StoreError> {
        let mut state = self.lock()?;

        let episode_key = (upsert.quiz_id.to_string(), upsert.quiz_version);
        let mut episode_created = false;
        let episode = state
            .episodes
            .entry(episode_key)
            .or_insert_with(|| {
                episode_created = true;
                RegradeEpisode {
                    id: Uuid::new_v4().to_string(),
                    quiz_id: upsert.quiz_id.to_string(),
                    quiz_version: upsert.quiz_version,
                    created_by: upsert.acting_user.to_string(),
                    created_at: upsert.now,
                }
            })
            .clone();

        let entry_key = (episode.id.clone(), upsert.question_id.to_string());
        let mut entry_created = false;
        let entry = match state.entries.get_mut(&entry_key) {
            Some(existing) => {
                existing.regrade_option = upsert.strategy;
                existing.updated_at = upsert.now;
                existing.clone()
            }
            None => {
                entry_created = true;
                let entry = RegradeEntry {
                    id: Uuid::new_v4().to_string(),
                    regrade_id: episode.id.clone(),
                    quiz_question_id: upsert.question_id.to_string(),
                    regrade_option: upsert.strategy,
                    created_at: upsert.now,
                    updated_at: upsert.now,
                };
                state.entries.insert(entry_key, entry.clone());
                entry
            }
        };

        Ok(RegradeOutcome { episode, entry, episode_created, entry_created })
    }

    async fn find_episode(
        &self,
        quiz_id: &str,
        quiz_version: i32,
    ) -> Result<Option<RegradeEpisode>, StoreError> {
        let state = self.lock()?;
        Ok(state.episodes.get(&(quiz_id.to_string(), quiz_version)).cloned())
    }

    async fn list_entries(&self, regrade_id: &str) -> Result<Vec<RegradeEntry>, StoreError> {
        let state = self.lock()?;
        let mut entries = state
            .entries
            .values()
            .filter(|entry| entry.regrade_id == regrade_id)
            .cloned()
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.quiz_question_id.cmp(&b.quiz_question_id));
        Ok(entries)
    }
}
