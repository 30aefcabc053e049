use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many recent failures go into an extraction summary. Bounds the text
/// handed to the extraction model.
const FAILURE_WINDOW: usize = 5;

/// One try within an episode, already compressed to a short description and
/// an optional error signature. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub short_desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    /// `file:line` of the first reported frame, when one was recognized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_location: Option<String>,
    #[serde(default)]
    pub succeeded: bool,
}

/// One problem-solving session.
///
/// `final_success` stays unset while the episode is active and is set exactly
/// once, by [`EpisodeTracker::end`](super::EpisodeTracker::end).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub task: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: Vec<Attempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Episode {
    pub(crate) fn new(id: String, task: String) -> Self {
        Self {
            id,
            task,
            created_at: Utc::now(),
            attempts: Vec::new(),
            final_result: None,
            final_success: None,
            notes: None,
        }
    }

    pub(crate) fn push_attempt(&mut self, attempt: Attempt) {
        self.attempts.push(attempt);
    }

    /// The last `limit` failed attempts, in original chronological order.
    pub fn recent_failures(&self, limit: usize) -> Vec<&Attempt> {
        let failed: Vec<&Attempt> = self.attempts.iter().filter(|a| !a.succeeded).collect();
        let skip = failed.len().saturating_sub(limit);
        failed.into_iter().skip(skip).collect()
    }

    /// The most recently added successful attempt, if any.
    pub fn last_success(&self) -> Option<&Attempt> {
        self.attempts.iter().rev().find(|a| a.succeeded)
    }

    /// Minimal structured payload handed to the extraction collaborator.
    ///
    /// `success` reflects attempt-level success only. An episode ended as
    /// successful with no succeeded attempt yields `success: None`; callers
    /// must tolerate the divergence.
    pub fn to_summary(&self) -> EpisodeSummary {
        let failures = self
            .recent_failures(FAILURE_WINDOW)
            .into_iter()
            .map(|a| FailureSummary {
                desc: a.short_desc.clone(),
                error: a.error_kind.clone().unwrap_or_else(|| "unknown".to_string()),
            })
            .collect();

        let success = self.last_success().map(|a| SuccessSummary {
            desc: a.short_desc.clone(),
            result: self
                .final_result
                .clone()
                .unwrap_or_else(|| "completed".to_string()),
        });

        EpisodeSummary {
            task: self.task.clone(),
            failures,
            success,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub task: String,
    pub failures: Vec<FailureSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<SuccessSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureSummary {
    pub desc: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessSummary {
    pub desc: String,
    pub result: String,
}
