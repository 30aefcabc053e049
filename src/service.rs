//! Boundary operations over the tracker, extractor, and store.
//!
//! This is the surface a tool-invocation layer calls into:
//! start/log/end an episode, search, and list recent experiences. The
//! transport itself lives outside this crate.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::episode::{extract_error_summary, Attempt, Episode, EpisodeTracker};
use crate::error::{HindsightError, Result};
use crate::extraction::{ExperienceExtractor, ExperienceFields};
use crate::store::{ExperienceRecord, ExperienceStore};

/// What `end_episode` produced for a successful episode.
#[derive(Debug, Clone)]
pub struct SavedExperience {
    /// File name assigned by the store.
    pub file: String,
    pub fields: ExperienceFields,
}

#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    pub episode: Episode,
    /// `None` when the episode ended without success; extraction failures
    /// surface as errors instead, so a silent `None` never hides data loss.
    pub saved: Option<SavedExperience>,
}

pub struct ExperienceService {
    tracker: EpisodeTracker,
    store: ExperienceStore,
    extractor: Option<Arc<dyn ExperienceExtractor>>,
}

impl ExperienceService {
    /// `extractor: None` means successful episodes cannot be persisted as
    /// experiences; episode tracking itself still works.
    pub fn new(store: ExperienceStore, extractor: Option<Arc<dyn ExperienceExtractor>>) -> Self {
        Self {
            tracker: EpisodeTracker::new(),
            store,
            extractor,
        }
    }

    pub fn tracker(&self) -> &EpisodeTracker {
        &self.tracker
    }

    pub fn store(&self) -> &ExperienceStore {
        &self.store
    }

    pub fn start_episode(&self, task: impl Into<String>) -> Episode {
        let episode = self.tracker.start(task);
        info!(id = %episode.id, task = %episode.task, "Episode started");
        episode
    }

    /// Log an attempt, pre-processing any raw error output into an error
    /// kind and location.
    pub fn log_attempt(
        &self,
        episode_id: &str,
        short_desc: &str,
        error_output: Option<&str>,
        succeeded: bool,
    ) -> Result<Attempt> {
        if short_desc.trim().is_empty() {
            return Err(HindsightError::InvalidInput(
                "attempt description must not be empty".to_string(),
            ));
        }

        let (error_kind, error_location) = match error_output {
            Some(raw) => extract_error_summary(raw),
            None => (None, None),
        };

        let attempt = Attempt {
            short_desc: short_desc.to_string(),
            error_kind,
            error_location,
            succeeded,
        };

        self.tracker
            .log_attempt(episode_id, attempt.clone())
            .ok_or_else(|| HindsightError::EpisodeNotFound(episode_id.to_string()))?;

        debug!(
            id = %episode_id,
            succeeded,
            error_kind = ?attempt.error_kind,
            "Attempt logged"
        );
        Ok(attempt)
    }

    /// End an episode. On caller-asserted success the failure/success
    /// contrast is extracted and persisted; extraction and configuration
    /// failures surface to the caller because the episode data is gone from
    /// the tracker and was NOT saved. Failed episodes are discarded.
    pub async fn end_episode(
        &self,
        episode_id: &str,
        result: &str,
        success: bool,
        notes: Option<String>,
    ) -> Result<EpisodeOutcome> {
        let episode = self
            .tracker
            .end(episode_id, result, success, notes)
            .ok_or_else(|| HindsightError::EpisodeNotFound(episode_id.to_string()))?;

        if !success {
            info!(id = %episode.id, "Episode ended without success; nothing extracted");
            return Ok(EpisodeOutcome {
                episode,
                saved: None,
            });
        }

        let Some(extractor) = self.extractor.as_ref() else {
            return Err(HindsightError::Configuration(
                "no extractor configured; episode data was not saved".to_string(),
            ));
        };

        let summary = episode.to_summary();
        let fields = match extractor.extract(&summary).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(id = %episode.id, error = %e, "Extraction failed; episode data was not saved");
                return Err(e);
            }
        };

        let record = ExperienceRecord {
            id: episode.id.clone(),
            task: episode.task.clone(),
            pattern: fields.pattern.clone(),
            keywords: fields.keywords.clone(),
            insight: fields.insight.clone(),
            attempts_count: episode.attempts.len() as u32,
            result: result.to_string(),
            created_at: episode.created_at,
            embedding: None,
        };
        let file = self.store.save(record).await?;

        info!(id = %episode.id, file = %file, "Experience extracted and saved");
        Ok(EpisodeOutcome {
            episode,
            saved: Some(SavedExperience { file, fields }),
        })
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ExperienceRecord>> {
        self.store.search(query, limit, true).await
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<ExperienceRecord>> {
        self.store.get_recent(limit).await
    }
}
