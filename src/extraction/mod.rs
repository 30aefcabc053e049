//! Experience extraction: distills the failure/success contrast of a
//! finished episode into a pattern, keywords, and an insight.
//!
//! - `ExperienceExtractor`: seam for the extraction collaborator
//! - `OpenRouterExtractor`: chat-completions implementation

mod openrouter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::episode::EpisodeSummary;
use crate::error::Result;

pub use openrouter::OpenRouterExtractor;

/// The distilled triple produced by extraction. Missing keys in the model's
/// reply are tolerated as empty values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceFields {
    /// What distinguished success from the failures.
    pub pattern: String,
    pub keywords: Vec<String>,
    /// Brief actionable takeaway.
    pub insight: String,
}

/// Turns an episode summary into [`ExperienceFields`]. Failures surface to
/// the caller: there is no valid fallback pattern, so the episode's data is
/// reported as not saved.
#[async_trait]
pub trait ExperienceExtractor: Send + Sync {
    async fn extract(&self, summary: &EpisodeSummary) -> Result<ExperienceFields>;
}
