use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use super::model::{Attempt, Episode};

/// Registry of episodes currently in progress, keyed by id.
///
/// Constructor-injected, no ambient state: create one at process start and
/// share it. All mutation goes through the registry lock, so concurrent
/// start/get/end from multiple logical callers is safe. Ended episodes leave
/// the registry; the tracker holds no history.
pub struct EpisodeTracker {
    episodes: Mutex<HashMap<String, Episode>>,
    /// Process-lifetime sequence appended to every id. Ended episodes leave
    /// the registry, so the live map alone cannot rule out reissuing an id
    /// within one clock tick; the sequence can.
    sequence: AtomicU64,
}

impl EpisodeTracker {
    pub fn new() -> Self {
        Self {
            episodes: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    /// Start a new episode and register it. Ids combine the UTC timestamp at
    /// microsecond resolution with a monotonic sequence, so same-tick starts
    /// stay unique even across episodes that have already ended.
    pub fn start(&self, task: impl Into<String>) -> Episode {
        let task = task.into();
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let id = format!("ep_{}_{seq}", Utc::now().format("%Y%m%d_%H%M%S_%6f"));

        let episode = Episode::new(id.clone(), task);
        let mut episodes = self.episodes.lock();
        episodes.insert(id.clone(), episode.clone());
        debug!(id = %id, active = episodes.len(), "Episode started");
        episode
    }

    /// Snapshot of an active episode. `None` if unknown or already ended.
    pub fn get(&self, id: &str) -> Option<Episode> {
        self.episodes.lock().get(id).cloned()
    }

    /// Append an attempt to an active episode. `None` if unknown.
    pub fn log_attempt(&self, id: &str, attempt: Attempt) -> Option<()> {
        let mut episodes = self.episodes.lock();
        let episode = episodes.get_mut(id)?;
        episode.push_attempt(attempt);
        debug!(id = %id, attempts = episode.attempts.len(), "Attempt logged");
        Some(())
    }

    /// End an episode: set final fields, remove it from the registry, and
    /// return the detached episode for downstream processing. `None` for an
    /// unknown id is a normal outcome (double-end, typo, process restart).
    pub fn end(
        &self,
        id: &str,
        result: impl Into<String>,
        success: bool,
        notes: Option<String>,
    ) -> Option<Episode> {
        let mut episodes = self.episodes.lock();
        let mut episode = episodes.remove(id)?;
        episode.final_result = Some(result.into());
        episode.final_success = Some(success);
        episode.notes = notes;
        debug!(id = %id, success, active = episodes.len(), "Episode ended");
        Some(episode)
    }

    pub fn active_count(&self) -> usize {
        self.episodes.lock().len()
    }
}

impl Default for EpisodeTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn attempt(desc: &str, succeeded: bool) -> Attempt {
        Attempt {
            short_desc: desc.to_string(),
            error_kind: None,
            error_location: None,
            succeeded,
        }
    }

    #[test]
    fn test_start_assigns_unique_ids_same_tick() {
        let tracker = EpisodeTracker::new();
        let ids: HashSet<String> = (0..50).map(|_| tracker.start("task").id).collect();
        assert_eq!(ids.len(), 50);
        assert_eq!(tracker.active_count(), 50);
    }

    #[test]
    fn test_ids_not_reused_after_end() {
        let tracker = EpisodeTracker::new();
        let mut ids = HashSet::new();
        // Rapid start/end cycles all land in the same clock tick on a fast
        // machine; ended episodes must not free their ids for reissue.
        for _ in 0..50 {
            let episode = tracker.start("task");
            assert!(ids.insert(episode.id.clone()));
            assert!(tracker.end(&episode.id, "done", false, None).is_some());
        }
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_get_returns_registered_episode() {
        let tracker = EpisodeTracker::new();
        let episode = tracker.start("fix timeout");
        let found = tracker.get(&episode.id).unwrap();
        assert_eq!(found.task, "fix timeout");
        assert!(found.final_success.is_none());
    }

    #[test]
    fn test_log_attempt_unknown_id() {
        let tracker = EpisodeTracker::new();
        assert!(tracker.log_attempt("ep_missing", attempt("x", false)).is_none());
    }

    #[test]
    fn test_end_sets_final_fields_and_unregisters() {
        let tracker = EpisodeTracker::new();
        let episode = tracker.start("task");
        tracker.log_attempt(&episode.id, attempt("won", true)).unwrap();

        let ended = tracker
            .end(&episode.id, "solved", true, Some("notes".into()))
            .unwrap();
        assert_eq!(ended.final_result.as_deref(), Some("solved"));
        assert_eq!(ended.final_success, Some(true));
        assert_eq!(ended.notes.as_deref(), Some("notes"));
        assert_eq!(ended.attempts.len(), 1);

        assert!(tracker.get(&episode.id).is_none());
        assert_eq!(tracker.active_count(), 0);
    }

    #[test]
    fn test_double_end_returns_none() {
        let tracker = EpisodeTracker::new();
        let episode = tracker.start("task");
        assert!(tracker.end(&episode.id, "done", true, None).is_some());
        assert!(tracker.end(&episode.id, "done", true, None).is_none());
    }

    #[test]
    fn test_concurrent_start_and_end() {
        use std::sync::Arc;

        let tracker = Arc::new(EpisodeTracker::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let episode = tracker.start("task");
                        assert!(tracker.log_attempt(&episode.id, attempt("try", false)).is_some());
                        assert!(tracker.end(&episode.id, "done", false, None).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.active_count(), 0);
    }
}
