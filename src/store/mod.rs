//! Durable storage for fetched suggestions and run records
//!
//! The store is an append-only log: suggestion rows are added in checkpoint
//! batches and run records are updated by appending a newer version.

mod jsonl;
mod memory;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{RunStatus, VariantType};

/// One fetched suggestion with its 1-based source rank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionRow {
    pub session_id: String,
    pub original_keyword: String,
    pub variant_keyword: String,
    pub suggestion: String,
    pub rank: u32,
    pub variant_type: VariantType,
    pub created_at: DateTime<Utc>,
}

impl SuggestionRow {
    /// Rows for one query's suggestions, ranked in source order
    pub fn ranked(
        session_id: &str,
        original_keyword: &str,
        variant_type: VariantType,
        variant_keyword: &str,
        suggestions: &[String],
    ) -> Vec<SuggestionRow> {
        let now = Utc::now();
        suggestions
            .iter()
            .enumerate()
            .map(|(i, suggestion)| SuggestionRow {
                session_id: session_id.to_string(),
                original_keyword: original_keyword.to_string(),
                variant_keyword: variant_keyword.to_string(),
                suggestion: suggestion.clone(),
                rank: i as u32 + 1,
                variant_type,
                created_at: now,
            })
            .collect()
    }
}

/// Persistent summary of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub session_id: String,
    pub original_keyword: String,
    pub variant_types: Vec<VariantType>,
    pub total_suggestions: usize,
    pub status: RunStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage operations used by the analysis pipeline
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    /// Insert or replace a run record
    async fn save_run(&self, record: &RunRecord) -> Result<()>;

    /// Append a batch of suggestion rows. The batch is durable once this returns.
    async fn append_suggestions(&self, rows: &[SuggestionRow]) -> Result<()>;

    /// Latest version of a run record
    async fn load_run(&self, session_id: &str) -> Result<Option<RunRecord>>;

    /// All rows of a session in insertion order
    async fn load_suggestions(&self, session_id: &str) -> Result<Vec<SuggestionRow>>;

    /// Most recent runs first
    async fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>>;

    /// Get the store name
    fn name(&self) -> &'static str;
}
