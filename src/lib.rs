//! Hindsight records short-lived problem-solving sessions ("episodes"), each
//! a sequence of attempts, and distills the contrast between failures and
//! the successful attempt into compact, searchable experience records.
//! Retrieval blends embedding similarity with keyword scoring and degrades
//! gracefully when no embedding provider is configured.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod episode;
pub mod error;
pub mod extraction;
pub mod service;
pub mod store;

pub use config::HindsightConfig;
pub use episode::{Attempt, Episode, EpisodeSummary, EpisodeTracker};
pub use error::{HindsightError, Result};
pub use service::{EpisodeOutcome, ExperienceService, SavedExperience};
pub use store::{ExperienceRecord, ExperienceStore};
