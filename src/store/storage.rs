use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::record::ExperienceRecord;
use crate::embedding::CachedEmbedder;
use crate::error::{HindsightError, Result};

const FILE_PREFIX: &str = "exp_";
const FILE_SUFFIX: &str = ".json";

/// Guards the cosine denominator against all-zero vectors.
const NORM_EPSILON: f32 = 1e-8;

/// Flat-file experience store with hybrid semantic + keyword search.
///
/// The corpus is scanned linearly per query; the design assumes a
/// small-to-moderate number of records. Saves are whole-file creations under
/// unique time-derived names, so concurrent saves need no cross-file locking
/// and a search racing a save may simply not see the new file yet.
pub struct ExperienceStore {
    dir: PathBuf,
    embedder: Option<CachedEmbedder>,
}

impl ExperienceStore {
    /// `embedder: None` models "semantic search unavailable" as a first-class
    /// state; every operation still works, ranked by keywords alone.
    pub fn new(dir: impl Into<PathBuf>, embedder: Option<CachedEmbedder>) -> Self {
        Self {
            dir: dir.into(),
            embedder,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn has_embedder(&self) -> bool {
        self.embedder.is_some()
    }

    /// Persist a record, attaching an embedding of its search text when a
    /// provider is available. Embedding failure is not a save failure: the
    /// textual record's durability takes priority over searchability.
    pub async fn save(&self, mut record: ExperienceRecord) -> Result<String> {
        fs::create_dir_all(&self.dir).await?;

        if record.embedding.is_none() {
            record.embedding = self.embed_for_save(&record).await;
        }

        let json = serde_json::to_string_pretty(&record)?;
        let name = self.write_new(&json).await?;
        debug!(
            file = %name,
            id = %record.id,
            has_embedding = record.embedding.is_some(),
            "Saved experience"
        );
        Ok(name)
    }

    async fn embed_for_save(&self, record: &ExperienceRecord) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed_cached(&record.search_text()).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(id = %record.id, error = %e, "Embedding failed; saving record without one");
                None
            }
        }
    }

    /// Whole-file create under a time-derived name; a counter suffix
    /// disambiguates same-microsecond saves.
    async fn write_new(&self, json: &str) -> Result<String> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S_%6f").to_string();
        let mut n = 0u32;
        loop {
            let name = if n == 0 {
                format!("{FILE_PREFIX}{stamp}{FILE_SUFFIX}")
            } else {
                format!("{FILE_PREFIX}{stamp}_{n}{FILE_SUFFIX}")
            };
            let path = self.dir.join(&name);

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(json.as_bytes()).await?;
                    file.flush().await?;
                    return Ok(name);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Rank all stored records against a free-text query and return the top
    /// `limit`.
    ///
    /// With semantic scoring active, a record scores
    /// `max(0, cosine * 10)` plus half-weight keyword boosts; without it,
    /// keyword boosts carry full weight. Zero-score records are excluded and
    /// ties keep scan order.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        use_semantic: bool,
    ) -> Result<Vec<ExperienceRecord>> {
        let query_vec = if use_semantic {
            self.embed_query(query).await
        } else {
            None
        };

        let mut query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        query_words.sort();
        query_words.dedup();

        let mut scored: Vec<(f32, ExperienceRecord)> = Vec::new();
        for path in self.record_files().await? {
            let record = match self.load_record(&path).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                    continue;
                }
            };
            let score = score_record(&record, &query_words, query_vec.as_deref());
            if score > 0.0 {
                scored.push((score, record));
            }
        }

        // Stable sort: equal scores keep corpus scan order.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        scored.truncate(limit);

        debug!(
            query = %query,
            results = scored.len(),
            semantic = query_vec.is_some(),
            "Search complete"
        );
        Ok(scored.into_iter().map(|(_, record)| record).collect())
    }

    /// A failed query embedding degrades this call to keyword-only scoring.
    async fn embed_query(&self, query: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed_uncached(query).await {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "Query embedding failed; falling back to keyword scoring");
                None
            }
        }
    }

    /// All records ordered by file modification time, newest first,
    /// independent of relevance.
    pub async fn get_recent(&self, limit: usize) -> Result<Vec<ExperienceRecord>> {
        let mut stamped: Vec<(SystemTime, PathBuf)> = Vec::new();
        for path in self.record_files().await? {
            let modified = fs::metadata(&path)
                .await
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            stamped.push((modified, path));
        }
        stamped.sort_by(|a, b| b.0.cmp(&a.0));
        stamped.truncate(limit);

        let mut records = Vec::new();
        for (_, path) in stamped {
            match self.load_record(&path).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable record");
                }
            }
        }
        Ok(records)
    }

    async fn record_files(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                paths.push(entry.path());
            }
        }
        // Directory order is platform-dependent; name order makes the scan
        // (and therefore tie-breaking) deterministic.
        paths.sort();
        Ok(paths)
    }

    async fn load_record(&self, path: &Path) -> Result<ExperienceRecord> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| HindsightError::CorruptRecord {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        serde_json::from_str(&content).map_err(|e| HindsightError::CorruptRecord {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

fn score_record(
    record: &ExperienceRecord,
    query_words: &[String],
    query_vec: Option<&[f32]>,
) -> f32 {
    let mut score = 0.0f32;

    if let (Some(query_vec), Some(record_vec)) = (query_vec, record.embedding.as_deref()) {
        score = (cosine_similarity(query_vec, record_vec) * 10.0).max(0.0);
    }

    let haystack = record.search_text().to_lowercase();
    let padded = format!(" {haystack} ");
    // Keyword evidence is weighted down when semantic evidence is in play,
    // and carries relevance alone when it is not.
    let boost = if query_vec.is_some() { 0.5 } else { 1.0 };

    for word in query_words {
        if haystack.contains(word.as_str()) {
            score += boost;
            if padded.contains(&format!(" {word} ")) {
                score += boost;
            }
        }
    }

    score
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt() + NORM_EPSILON)
}
