//! Episode lifecycle: attempts, tracking, and error-output pre-processing.
//!
//! - `Episode`/`Attempt`: one problem-solving session and its tries
//! - `EpisodeTracker`: registry of episodes currently in progress
//! - `extract_error_summary`: best-effort error kind/location from raw output

mod model;
mod stderr;
mod tracker;

pub use model::{Attempt, Episode, EpisodeSummary, FailureSummary, SuccessSummary};
pub use stderr::extract_error_summary;
pub use tracker::EpisodeTracker;
