//! Persistence and retrieval of experience records.
//!
//! One JSON file per record, append-only. Retrieval blends embedding
//! similarity with keyword scoring and degrades to keyword-only when no
//! embedding is available.

mod record;
mod storage;

pub use record::ExperienceRecord;
pub use storage::ExperienceStore;
