//! End-to-end flow through the service boundary: start → log attempts →
//! end → extract → persist → retrieve.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use hindsight::episode::EpisodeSummary;
use hindsight::error::{HindsightError, Result};
use hindsight::extraction::{ExperienceExtractor, ExperienceFields};
use hindsight::service::ExperienceService;
use hindsight::store::ExperienceStore;

/// Returns fixed fields and captures the summary it was handed.
struct CapturingExtractor {
    seen: Mutex<Option<EpisodeSummary>>,
}

impl CapturingExtractor {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(None),
        })
    }
}

#[async_trait]
impl ExperienceExtractor for CapturingExtractor {
    async fn extract(&self, summary: &EpisodeSummary) -> Result<ExperienceFields> {
        *self.seen.lock() = Some(summary.clone());
        Ok(ExperienceFields {
            pattern: "added explicit timeout".into(),
            keywords: vec!["timeout".into(), "async".into()],
            insight: "set deadline before await".into(),
        })
    }
}

struct FailingExtractor;

#[async_trait]
impl ExperienceExtractor for FailingExtractor {
    async fn extract(&self, _summary: &EpisodeSummary) -> Result<ExperienceFields> {
        Err(HindsightError::Extraction("model unavailable".into()))
    }
}

fn service_with(
    dir: &TempDir,
    extractor: Option<Arc<dyn ExperienceExtractor>>,
) -> ExperienceService {
    ExperienceService::new(ExperienceStore::new(dir.path(), None), extractor)
}

const TRACEBACK: &str = "Traceback (most recent call last):\n  File \"main.py\", line 42, in <module>\nTimeoutError: deadline exceeded";

#[tokio::test]
async fn successful_episode_is_extracted_and_persisted() {
    let dir = TempDir::new().unwrap();
    let extractor = CapturingExtractor::new();
    let service = service_with(&dir, Some(extractor.clone()));

    let episode = service.start_episode("fix timeout bug");
    service
        .log_attempt(&episode.id, "raised retry count", Some(TRACEBACK), false)
        .unwrap();
    service
        .log_attempt(&episode.id, "added explicit timeout", None, true)
        .unwrap();

    let outcome = service
        .end_episode(&episode.id, "tests pass", true, None)
        .await
        .unwrap();

    let saved = outcome.saved.expect("experience should have been saved");
    assert!(saved.file.starts_with("exp_"));
    assert_eq!(outcome.episode.final_success, Some(true));

    // The extractor saw the contrast summary, with the pre-processed error.
    let summary = extractor.seen.lock().clone().unwrap();
    assert_eq!(summary.task, "fix timeout bug");
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].error, "TimeoutError");
    assert_eq!(summary.success.as_ref().unwrap().desc, "added explicit timeout");

    // Round trip through the store.
    let recent = service.recent(1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].id, episode.id);
    assert_eq!(recent[0].attempts_count, 2);
    assert_eq!(recent[0].result, "tests pass");
    assert!(recent[0].embedding.is_none());

    // And it is findable by keyword search.
    let results = service.search("timeout errors", 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, episode.id);
}

#[tokio::test]
async fn error_output_is_preprocessed_into_the_attempt() {
    let dir = TempDir::new().unwrap();
    let service = service_with(&dir, None);

    let episode = service.start_episode("task");
    let attempt = service
        .log_attempt(&episode.id, "ran the script", Some(TRACEBACK), false)
        .unwrap();

    assert_eq!(attempt.error_kind.as_deref(), Some("TimeoutError"));
    assert_eq!(attempt.error_location.as_deref(), Some("main.py:42"));
}

#[tokio::test]
async fn failed_episode_is_discarded_without_extraction() {
    let dir = TempDir::new().unwrap();
    let service = service_with(&dir, Some(Arc::new(FailingExtractor)));

    let episode = service.start_episode("task");
    service
        .log_attempt(&episode.id, "tried something", None, false)
        .unwrap();

    let outcome = service
        .end_episode(&episode.id, "gave up", false, Some("out of time".into()))
        .await
        .unwrap();

    assert!(outcome.saved.is_none());
    assert_eq!(outcome.episode.notes.as_deref(), Some("out of time"));
    assert!(service.recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn extraction_failure_surfaces_and_nothing_is_saved() {
    let dir = TempDir::new().unwrap();
    let service = service_with(&dir, Some(Arc::new(FailingExtractor)));

    let episode = service.start_episode("task");
    service
        .log_attempt(&episode.id, "won", None, true)
        .unwrap();

    let err = service
        .end_episode(&episode.id, "solved", true, None)
        .await
        .unwrap_err();

    assert!(matches!(err, HindsightError::Extraction(_)));
    assert!(service.recent(10).await.unwrap().is_empty());
    // The episode left the registry regardless.
    assert!(service.tracker().get(&episode.id).is_none());
}

#[tokio::test]
async fn missing_extractor_surfaces_configuration_error() {
    let dir = TempDir::new().unwrap();
    let service = service_with(&dir, None);

    let episode = service.start_episode("task");
    let err = service
        .end_episode(&episode.id, "solved", true, None)
        .await
        .unwrap_err();

    assert!(matches!(err, HindsightError::Configuration(_)));
    assert!(service.recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_and_double_end_report_not_found() {
    let dir = TempDir::new().unwrap();
    let service = service_with(&dir, None);

    let err = service
        .end_episode("ep_missing", "x", false, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let episode = service.start_episode("task");
    service
        .end_episode(&episode.id, "done", false, None)
        .await
        .unwrap();
    let err = service
        .end_episode(&episode.id, "done", false, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn log_attempt_validates_input() {
    let dir = TempDir::new().unwrap();
    let service = service_with(&dir, None);
    let episode = service.start_episode("task");

    let err = service
        .log_attempt(&episode.id, "   ", None, false)
        .unwrap_err();
    assert!(matches!(err, HindsightError::InvalidInput(_)));

    let err = service
        .log_attempt("ep_missing", "desc", None, false)
        .unwrap_err();
    assert!(err.is_not_found());
}
