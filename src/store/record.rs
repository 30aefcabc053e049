use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The durable, searchable unit: one file per record, immutable after
/// creation. Files that fail this schema on read are treated as corrupt and
/// skipped, never as a crash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceRecord {
    /// Matches the source episode id.
    pub id: String,
    pub task: String,
    /// What distinguished success from the failures.
    pub pattern: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub insight: String,
    #[serde(default)]
    pub attempts_count: u32,
    pub result: String,
    pub created_at: DateTime<Utc>,
    /// Absent when no embedding provider was available at save time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl ExperienceRecord {
    /// The haystack scored at query time and embedded at save time.
    pub fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.task,
            self.pattern,
            self.insight,
            self.keywords.join(" ")
        )
    }
}
